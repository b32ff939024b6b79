pub mod api;
pub mod batch;
pub mod collect;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod harvester;
pub mod media;
pub mod schedule;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{PostsApi, XApiClient};
    pub use crate::config::HarvestConfig;
    pub use crate::error::{FetchError, HarvestError};
    pub use crate::fetch::{BatchFetcher, FailedBatch, FetchOutcome};
    pub use crate::harvester::{Harvester, RunSummary};
    pub use crate::media::{MediaFetcher, MediaPlan};
    pub use crate::schedule::{Pause, PauseLimits, PlanMode};
    pub use crate::storage::OutputTree;
    pub use crate::types::{BatchResponse, Includes, Item, ItemRecord, MediaDescriptor, MediaType};
}

pub use error::{HarvestError, Result};
pub use harvester::{Harvester, RunSummary};
