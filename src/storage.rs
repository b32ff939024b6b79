use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, Result};
use crate::extract::is_post_id;
use crate::media::{download_all, resolve_media, MediaFetcher};
use crate::types::{BatchResponse, Includes, ItemRecord};

pub const IDS_FILE: &str = "tweet_ids.csv";
pub const IDS_COLUMN: &str = "tweet_id";
pub const BATCHES_FILE: &str = "tweets_data.json";
pub const ITEMS_DIR: &str = "individual_tweets";
pub const ITEM_FILE: &str = "tweet.json";

/// Totals of a per-item persistence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub items: usize,
    pub skipped: usize,
    pub failed: usize,
    pub media: usize,
}

/// The output directory and its fixed layout.
///
/// Every write replaces what is already there, so repeating a run leaves the
/// same tree behind.
#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
}

impl OutputTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }
    pub fn ids_path(&self) -> PathBuf { self.root.join(IDS_FILE) }
    pub fn batches_path(&self) -> PathBuf { self.root.join(BATCHES_FILE) }
    pub fn item_dir(&self, id: &str) -> PathBuf { self.root.join(ITEMS_DIR).join(id) }

    /// Write the ids as a sorted single-column CSV.
    pub async fn write_ids<'a, I>(&self, ids: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let sorted: BTreeSet<&String> = ids.into_iter().collect();
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([IDS_COLUMN])?;
        for id in &sorted {
            wtr.write_record([id.as_str()])?;
        }
        let bytes = wtr.into_inner().map_err(|e| HarvestError::Io(e.into_error()))?;
        let path = self.ids_path();
        write_file(&path, &bytes).await?;
        tracing::info!(path = %path.display(), count = sorted.len(), "wrote id list");
        Ok(path)
    }

    /// Write every batch response, in order, as one JSON array.
    pub async fn write_batches(&self, batches: &[BatchResponse]) -> Result<PathBuf> {
        let path = self.batches_path();
        write_file(&path, &serde_json::to_vec_pretty(batches)?).await?;
        tracing::info!(path = %path.display(), batches = batches.len(), "wrote batch responses");
        Ok(path)
    }

    /// Persist one post into its own directory and download its media.
    ///
    /// Returns `None` when the record has no usable id, otherwise the number of
    /// media files downloaded. A record whose optional fields have an unexpected
    /// shape is still written as received, without media.
    pub async fn persist_item(&self, record: &ItemRecord, includes: &Includes, fetcher: &dyn MediaFetcher) -> Result<Option<usize>> {
        let Some(id) = record.id().filter(|id| is_post_id(id)) else {
            tracing::warn!(id = ?record.raw().get("id"), "skipping post record without a usable id");
            return Ok(None);
        };

        let dir = self.item_dir(id);
        write_file(&dir.join(ITEM_FILE), &serde_json::to_vec_pretty(record)?).await?;

        let Some(item) = record.as_item() else {
            tracing::warn!(id, "post record has unexpected fields; saved without media");
            return Ok(Some(0));
        };
        let plans = resolve_media(item, includes);
        let saved = download_all(&plans, &dir, fetcher).await;
        tracing::info!(id, media = saved, planned = plans.len(), "saved post");
        Ok(Some(saved))
    }

    /// Persist every post of every batch, each resolved against its own batch's includes.
    ///
    /// A post that cannot be written is logged and counted as failed; the rest
    /// are still persisted.
    pub async fn persist_batches(&self, batches: &[BatchResponse], fetcher: &dyn MediaFetcher) -> PersistStats {
        let mut stats = PersistStats::default();
        for batch in batches {
            for record in batch.items() {
                match self.persist_item(record, &batch.includes, fetcher).await {
                    Ok(Some(media)) => {
                        stats.items += 1;
                        stats.media += media;
                    }
                    Ok(None) => stats.skipped += 1,
                    Err(e) => {
                        tracing::error!(id = ?record.id(), error = %e, "failed to save post");
                        stats.failed += 1;
                    }
                }
            }
        }
        stats
    }
}

/// Load a previously written batch document.
pub async fn read_batches(path: &Path) -> Result<Vec<BatchResponse>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => HarvestError::MissingInput(path.to_path_buf()),
        _ => HarvestError::File { path: path.to_path_buf(), source },
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|source| HarvestError::MalformedResponse { path: path.to_path_buf(), source })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoFetcher;

    #[async_trait]
    impl MediaFetcher for EchoFetcher {
        async fn download(&self, url: &str, dest: &Path) -> std::result::Result<u64, FetchError> {
            tokio::fs::write(dest, url.as_bytes()).await?;
            Ok(url.len() as u64)
        }
    }

    fn batch() -> BatchResponse {
        serde_json::from_value(json!({
            "data": [
                { "id": "10", "text": "猫", "attachments": { "media_keys": ["3_1", "3_2"] } },
                { "id": "../escape", "text": "bad id" },
                { "text": "no id" },
                { "id": "11", "text": "plain" }
            ],
            "includes": { "media": [
                { "media_key": "3_1", "type": "photo", "url": "https://p/1.png" },
                { "media_key": "3_2", "type": "photo", "url": "https://p/2.jpg" }
            ]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn id_list_is_sorted_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path().join("out"));
        let ids = vec!["30".to_string(), "100".to_string(), "20".to_string(), "30".to_string()];
        let path = tree.write_ids(&ids).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "tweet_id\n100\n20\n30\n");
    }

    #[tokio::test]
    async fn persists_items_and_media() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path());
        let stats = tree.persist_batches(&[batch()], &EchoFetcher).await;
        assert_eq!(stats, PersistStats { items: 2, skipped: 2, failed: 0, media: 2 });

        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tree.item_dir("10").join(ITEM_FILE)).unwrap()).unwrap();
        assert_eq!(saved["text"], "猫");
        assert_eq!(std::fs::read_to_string(tree.item_dir("10").join("photo_1.png")).unwrap(), "https://p/1.png");
        assert!(tree.item_dir("10").join("photo_2.jpg").exists());
        assert!(tree.item_dir("11").join(ITEM_FILE).exists());
        assert!(!dir.path().join(ITEMS_DIR).join("escape").exists());
    }

    #[tokio::test]
    async fn rerun_produces_identical_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path());
        let batches = vec![batch()];

        tree.write_batches(&batches).await.unwrap();
        tree.persist_batches(&batches, &EchoFetcher).await;
        let first = std::fs::read(tree.batches_path()).unwrap();
        let first_item = std::fs::read(tree.item_dir("10").join(ITEM_FILE)).unwrap();

        tree.write_batches(&batches).await.unwrap();
        tree.persist_batches(&batches, &EchoFetcher).await;
        assert_eq!(std::fs::read(tree.batches_path()).unwrap(), first);
        assert_eq!(std::fs::read(tree.item_dir("10").join(ITEM_FILE)).unwrap(), first_item);
        assert_eq!(std::fs::read_dir(tree.item_dir("10")).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn record_with_odd_fields_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path());
        let raw = json!({ "id": "42", "text": "x", "attachments": { "media_keys": "3_1" } });
        let batch: BatchResponse = serde_json::from_value(json!({ "data": [raw.clone()] })).unwrap();

        let stats = tree.persist_batches(&[batch], &EchoFetcher).await;
        assert_eq!(stats, PersistStats { items: 1, skipped: 0, failed: 0, media: 0 });
        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tree.item_dir("42").join(ITEM_FILE)).unwrap()).unwrap();
        assert_eq!(saved, raw);
    }

    #[tokio::test]
    async fn unwritable_post_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path());
        // a plain file where post 10's directory should go
        std::fs::create_dir_all(dir.path().join(ITEMS_DIR)).unwrap();
        std::fs::write(tree.item_dir("10"), b"").unwrap();

        let stats = tree.persist_batches(&[batch()], &EchoFetcher).await;
        assert_eq!(stats, PersistStats { items: 1, skipped: 2, failed: 1, media: 0 });
        assert!(tree.item_dir("11").join(ITEM_FILE).exists());
    }

    #[tokio::test]
    async fn batches_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tree = OutputTree::new(dir.path());
        let batches = vec![batch()];
        tree.write_batches(&batches).await.unwrap();
        assert_eq!(read_batches(&tree.batches_path()).await.unwrap(), batches);
    }

    #[tokio::test]
    async fn unreadable_documents() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_batches(&dir.path().join("none.json")).await.unwrap_err();
        assert!(matches!(missing, HarvestError::MissingInput(_)));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, b"{ not json").unwrap();
        assert!(matches!(read_batches(&bad).await.unwrap_err(), HarvestError::MalformedResponse { .. }));
    }
}
