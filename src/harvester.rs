use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::api::PostsApi;
use crate::collect::collect_post_ids;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::fetch::{BatchFetcher, FailedBatch};
use crate::media::{HttpMediaFetcher, MediaFetcher};
use crate::schedule::{Pause, PlanMode, TokioPause};
use crate::storage::{read_batches, OutputTree, PersistStats};

/// What a fetch or reprocess run did, for the closing report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub items_fetched: usize,
    pub items_saved: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    pub media_saved: usize,
    pub failures: Vec<FailedBatch>,
    /// Why the aggregate batch document could not be written, if it could not.
    pub document_error: Option<String>,
}

impl RunSummary {
    /// Every batch was fetched.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, stats: PersistStats) {
        self.items_saved = stats.items;
        self.items_skipped = stats.skipped;
        self.items_failed = stats.failed;
        self.media_saved = stats.media;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "batches: {}/{} succeeded", self.batches_succeeded, self.batches_total)?;
        writeln!(f, "posts fetched: {}", self.items_fetched)?;
        write!(f, "posts saved: {} ({} skipped), media files: {}", self.items_saved, self.items_skipped, self.media_saved)?;
        if self.items_failed > 0 {
            write!(f, "\n{} post(s) could not be written", self.items_failed)?;
        }
        if let Some(err) = &self.document_error {
            write!(f, "\nbatch document not written: {err}")?;
        }
        if !self.failures.is_empty() {
            write!(f, "\n{} batch(es) failed:", self.failures.len())?;
            for fb in &self.failures {
                write!(f, "\n  batch {}: {} ids ({})\n    {}", fb.number, fb.ids.len(), fb.reason, fb.ids.join(","))?;
            }
        }
        Ok(())
    }
}

/// Owns the output tree and the media/pause collaborators, and runs the
/// extract, fetch and reprocess flows on top of them.
pub struct Harvester {
    config: HarvestConfig,
    output: OutputTree,
    media: Box<dyn MediaFetcher>,
    pause: Box<dyn Pause>,
    save_individual: bool,
}

impl Harvester {
    pub fn new(config: HarvestConfig) -> Result<Self> {
        config.validate()?;
        let media = HttpMediaFetcher::new(&config.user_agent, config.media_timeout())?;
        let output = OutputTree::new(config.output_dir.clone());
        Ok(Self { config, output, media: Box::new(media), pause: Box::new(TokioPause), save_individual: true })
    }

    pub fn with_media_fetcher(mut self, media: impl MediaFetcher + 'static) -> Self {
        self.media = Box::new(media);
        self
    }

    pub fn with_pause(mut self, pause: impl Pause + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn save_individual(mut self, enabled: bool) -> Self {
        self.save_individual = enabled;
        self
    }

    pub fn config(&self) -> &HarvestConfig { &self.config }
    pub fn output(&self) -> &OutputTree { &self.output }

    /// Collect ids from the input table and write the id list. Nothing is
    /// written when the table holds no status URLs.
    pub async fn extract(&self, input: &Path) -> Result<BTreeSet<String>> {
        let ids = collect_post_ids(input, &self.config.column)?;
        if ids.is_empty() {
            tracing::warn!(input = %input.display(), "no post ids found");
            return Ok(ids);
        }
        self.output.write_ids(&ids).await?;
        Ok(ids)
    }

    /// Look up all ids, then persist the aggregate document and per-post tree.
    ///
    /// Write failures after the lookups are recorded in the summary rather
    /// than returned, so the failed-batch report is never lost.
    pub async fn fetch(&self, api: &dyn PostsApi, ids: &BTreeSet<String>, plan: PlanMode) -> Result<RunSummary> {
        let ids: Vec<String> = ids.iter().cloned().collect();
        let outcome = BatchFetcher::new(api, self.pause.as_ref())
            .plan(plan)
            .limits(self.config.pause_limits())
            .batch_size(self.config.batch_size)
            .run(&ids)
            .await;

        let mut summary = RunSummary {
            batches_total: outcome.total_batches,
            batches_succeeded: outcome.succeeded(),
            items_fetched: outcome.item_count(),
            ..RunSummary::default()
        };
        let (responses, failures) = outcome.into_parts();
        summary.failures = failures;

        if responses.is_empty() {
            return Ok(summary);
        }
        tracing::info!(root = %self.output.root().display(), "persisting responses");
        if let Err(e) = self.output.write_batches(&responses).await {
            tracing::error!(error = %e, "failed to write batch document");
            summary.document_error = Some(e.to_string());
        }
        if self.save_individual {
            summary.record(self.output.persist_batches(&responses, self.media.as_ref()).await);
        }
        Ok(summary)
    }

    /// Rebuild the per-post tree from an existing aggregate document.
    pub async fn reprocess(&self, document: &Path) -> Result<RunSummary> {
        let batches = read_batches(document).await?;
        tracing::info!(path = %document.display(), batches = batches.len(), "loaded batch document");
        let mut summary = RunSummary {
            batches_total: batches.len(),
            batches_succeeded: batches.len(),
            items_fetched: batches.iter().map(|b| b.items().len()).sum(),
            ..RunSummary::default()
        };
        if !self.save_individual {
            tracing::info!("per-post saving disabled; nothing to do");
            return Ok(summary);
        }
        summary.record(self.output.persist_batches(&batches, self.media.as_ref()).await);
        Ok(summary)
    }
}
