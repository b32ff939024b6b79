use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Rate-limit tier of the API account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanMode {
    /// One lookup per window: a long pause after every batch.
    #[default]
    Constrained,
    /// Several lookups per window: a short pause, only for long runs.
    Elevated,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanMode::Constrained => f.write_str("constrained"),
            PlanMode::Elevated => f.write_str("elevated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseLimits {
    pub constrained: Duration,
    pub elevated: Duration,
    /// Elevated mode pauses only when the run has more batches than this.
    pub elevated_threshold: usize,
}

impl Default for PauseLimits {
    fn default() -> Self {
        Self {
            constrained: Duration::from_secs(900),
            elevated: Duration::from_secs(60),
            elevated_threshold: 15,
        }
    }
}

/// How long to wait after batch `batch_number` (1-based) of `total`.
///
/// Nothing follows the last batch, so it never waits.
pub fn pause_after(batch_number: usize, total: usize, plan: PlanMode, limits: &PauseLimits) -> Duration {
    if batch_number >= total {
        return Duration::ZERO;
    }
    match plan {
        PlanMode::Constrained => limits.constrained,
        PlanMode::Elevated if total > limits.elevated_threshold => limits.elevated,
        PlanMode::Elevated => Duration::ZERO,
    }
}

/// Blocks the run for a while. Swapped out in tests so no real time passes.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(total: usize, plan: PlanMode) -> Vec<u64> {
        let limits = PauseLimits::default();
        (1..=total).map(|n| pause_after(n, total, plan, &limits).as_secs()).collect()
    }

    #[test]
    fn constrained_waits_between_every_batch() {
        assert_eq!(schedule(3, PlanMode::Constrained), [900, 900, 0]);
        assert_eq!(schedule(1, PlanMode::Constrained), [0]);
    }

    #[test]
    fn elevated_waits_only_past_threshold() {
        assert!(schedule(15, PlanMode::Elevated).iter().all(|&s| s == 0));
        let long = schedule(16, PlanMode::Elevated);
        assert!(long[..15].iter().all(|&s| s == 60));
        assert_eq!(long[15], 0);
    }

    #[test]
    fn custom_limits_are_honoured() {
        let limits = PauseLimits {
            constrained: Duration::from_millis(5),
            elevated: Duration::from_millis(1),
            elevated_threshold: 1,
        };
        assert_eq!(pause_after(1, 2, PlanMode::Elevated, &limits), Duration::from_millis(1));
        assert_eq!(pause_after(1, 2, PlanMode::Constrained, &limits), Duration::from_millis(5));
        assert_eq!(pause_after(2, 2, PlanMode::Constrained, &limits), Duration::ZERO);
    }
}
