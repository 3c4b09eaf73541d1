//! Cache warming
//!
//! Runs producers ahead of the first real request, typically after a bulk data
//! load. The producer passed to [`CacheManager::warm`] is expected to go
//! through a memoized call so its result lands in the cache; a failure for one
//! input is logged and counted, never returned.

use crate::cache::manager::CacheManager;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info, warn};

/// Outcome of one warming run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmingReport {
    pub label: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,

    /// Warming is disabled in the configuration; nothing ran
    pub skipped: bool,
}

impl WarmingReport {
    fn skipped(label: &str) -> Self {
        Self {
            label: label.to_string(),
            skipped: true,
            ..Default::default()
        }
    }
}

impl CacheManager {
    /// Invoke `producer` once per input, sequentially
    ///
    /// Does nothing when `enable_warming` is off.
    pub async fn warm<I, T, E, F, Fut>(
        &self,
        label: &str,
        inputs: impl IntoIterator<Item = I>,
        mut producer: F,
    ) -> WarmingReport
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if !self.config().enable_warming {
            debug!("Cache warming disabled, skipping {}", label);
            return WarmingReport::skipped(label);
        }

        info!("Warming cache: {}", label);

        let mut report = WarmingReport {
            label: label.to_string(),
            ..Default::default()
        };

        for input in inputs {
            report.attempted += 1;
            match producer(input).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Cache warming step {} for {} failed: {}", report.attempted, label, e);
                }
            }
        }

        info!(
            "Cache warming for {} completed: {}/{} succeeded",
            label, report.succeeded, report.attempted
        );
        report
    }
}
