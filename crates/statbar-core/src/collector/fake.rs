//! Canned collector for previews and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::collector::StatsCollector;
use crate::collector::error::CollectError;
use crate::model::StatsSnapshot;

#[derive(Debug, Clone)]
enum Output {
    Snapshot(StatsSnapshot),
    Unavailable(String),
}

/// Returns the injected snapshot, or fails with the injected message, on
/// every call.
#[derive(Debug)]
pub struct FakeStatsCollector {
    output: Mutex<Output>,
    calls: AtomicUsize,
}

impl FakeStatsCollector {
    pub fn with_snapshot(snapshot: StatsSnapshot) -> Self {
        Self {
            output: Mutex::new(Output::Snapshot(snapshot)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with `CollectError::Unavailable(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            output: Mutex::new(Output::Unavailable(message.into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, snapshot: StatsSnapshot) {
        *self.output.lock().unwrap_or_else(PoisonError::into_inner) = Output::Snapshot(snapshot);
    }

    pub fn set_failing(&self, message: impl Into<String>) {
        *self.output.lock().unwrap_or_else(PoisonError::into_inner) =
            Output::Unavailable(message.into());
    }

    /// Number of `collect` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatsCollector for FakeStatsCollector {
    async fn collect(&self) -> Result<StatsSnapshot, CollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = self
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match output {
            Output::Snapshot(snapshot) => Ok(snapshot),
            Output::Unavailable(message) => Err(CollectError::Unavailable(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetricKind, MetricValue};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot(cpu: f64) -> StatsSnapshot {
        let mut metrics = BTreeMap::new();
        metrics.insert(MetricKind::CpuUsage, MetricValue::percent(cpu));
        StatsSnapshot::new(Utc::now(), metrics)
    }

    #[tokio::test]
    async fn test_returns_injected_snapshot() {
        let expected = snapshot(42.0);
        let collector = FakeStatsCollector::with_snapshot(expected.clone());
        assert_eq!(collector.collect().await.unwrap(), expected);
        assert_eq!(collector.calls(), 1);
    }

    #[tokio::test]
    async fn test_returns_injected_error() {
        let collector = FakeStatsCollector::failing("no sensors");
        let err = collector.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "collector unavailable: no sensors");
    }

    #[tokio::test]
    async fn test_output_can_be_switched() {
        let collector = FakeStatsCollector::failing("warming up");
        assert!(collector.collect().await.is_err());

        collector.set_snapshot(snapshot(7.0));
        assert!(collector.collect().await.is_ok());

        collector.set_failing("gone");
        assert!(collector.collect().await.is_err());
        assert_eq!(collector.calls(), 3);
    }
}
