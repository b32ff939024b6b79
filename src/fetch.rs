use std::fmt;

use crate::api::PostsApi;
use crate::batch::chunk_ids;
use crate::schedule::{pause_after, Pause, PauseLimits, PlanMode};
use crate::types::BatchResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    InFlight,
    Succeeded { items: usize },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport error or non-2xx status.
    Transport(String),
    /// A 2xx response that carried no `data` at all.
    EmptyPayload { api_errors: usize },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "{msg}"),
            FailureReason::EmptyPayload { api_errors } => {
                write!(f, "response carried no data ({api_errors} API errors)")
            }
        }
    }
}

/// A batch that produced nothing, kept for operator follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    /// 1-based position of the batch in the run.
    pub number: usize,
    pub ids: Vec<String>,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub number: usize,
    pub response: BatchResponse,
}

/// Terminal state of a fetch run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub total_batches: usize,
    pub states: Vec<BatchState>,
    pub results: Vec<FetchResult>,
    pub failures: Vec<FailedBatch>,
}

impl FetchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn item_count(&self) -> usize {
        self.results.iter().map(|r| r.response.items().len()).sum()
    }

    pub fn into_parts(self) -> (Vec<BatchResponse>, Vec<FailedBatch>) {
        (self.results.into_iter().map(|r| r.response).collect(), self.failures)
    }
}

/// Looks up ids batch by batch, pausing between calls according to the plan.
///
/// A failing batch is recorded and the run moves on; nothing is retried.
pub struct BatchFetcher<'a> {
    api: &'a dyn PostsApi,
    pause: &'a dyn Pause,
    plan: PlanMode,
    limits: PauseLimits,
    batch_size: usize,
}

impl<'a> BatchFetcher<'a> {
    pub fn new(api: &'a dyn PostsApi, pause: &'a dyn Pause) -> Self {
        Self { api, pause, plan: PlanMode::default(), limits: PauseLimits::default(), batch_size: 100 }
    }

    pub fn plan(mut self, plan: PlanMode) -> Self {
        self.plan = plan;
        self
    }

    pub fn limits(mut self, limits: PauseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Ids per lookup call; zero is treated as one.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub async fn run(&self, ids: &[String]) -> FetchOutcome {
        let batches = chunk_ids(ids, self.batch_size);
        let total = batches.len();
        let mut outcome = FetchOutcome {
            total_batches: total,
            states: vec![BatchState::Pending; total],
            ..FetchOutcome::default()
        };
        tracing::info!(ids = ids.len(), batches = total, plan = %self.plan, "starting lookup");

        for (i, batch) in batches.into_iter().enumerate() {
            let number = i + 1;
            outcome.states[i] = BatchState::InFlight;
            tracing::info!(batch = number, total, size = batch.len(), "fetching batch");

            match self.api.lookup(&batch).await {
                Ok(response) if response.data.is_some() => {
                    let items = response.items().len();
                    if response.error_count() > 0 {
                        tracing::warn!(batch = number, errors = response.error_count(), "API reported per-post errors");
                    }
                    tracing::info!(batch = number, items, "batch succeeded");
                    outcome.states[i] = BatchState::Succeeded { items };
                    outcome.results.push(FetchResult { number, response });
                }
                Ok(response) => {
                    tracing::warn!(batch = number, "batch returned no data");
                    outcome.states[i] = BatchState::Failed;
                    let reason = FailureReason::EmptyPayload { api_errors: response.error_count() };
                    outcome.failures.push(FailedBatch { number, ids: batch, reason });
                }
                Err(e) => {
                    tracing::warn!(batch = number, error = %e, "batch failed");
                    outcome.states[i] = BatchState::Failed;
                    outcome.failures.push(FailedBatch { number, ids: batch, reason: FailureReason::Transport(e.to_string()) });
                }
            }

            let wait = pause_after(number, total, self.plan, &self.limits);
            if !wait.is_zero() {
                tracing::info!(secs = wait.as_secs(), "waiting for rate limit window");
                self.pause.pause(wait).await;
            }
        }

        tracing::info!(
            batches = total,
            succeeded = outcome.succeeded(),
            failed = outcome.failures.len(),
            items = outcome.item_count(),
            "lookup finished"
        );
        outcome
    }
}
