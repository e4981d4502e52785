//! Bounded per-metric sample history for trend charts.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::model::{MetricKind, StatsSnapshot};

/// Default number of samples kept per metric kind.
pub const DEFAULT_MAX_SAMPLES: usize = 60;

/// One history point. Non-finite readings are stored as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricHistorySample {
    pub primary: Option<f64>,
    pub secondary: Option<f64>,
}

impl MetricHistorySample {
    pub fn new(primary: Option<f64>, secondary: Option<f64>) -> Self {
        Self {
            primary: normalized(primary),
            secondary: normalized(secondary),
        }
    }
}

fn normalized(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Fixed-capacity rolling history, oldest sample first.
#[derive(Debug, Clone)]
pub struct MetricHistoryStore {
    history: BTreeMap<MetricKind, VecDeque<MetricHistorySample>>,
    max_samples: usize,
}

impl Default for MetricHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

impl MetricHistoryStore {
    /// Creates an empty store. `max_samples` is clamped to at least 1.
    pub fn new(max_samples: usize) -> Self {
        Self {
            history: BTreeMap::new(),
            max_samples: max_samples.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_samples
    }

    /// Appends one sample for every metric kind present in `snapshot`.
    pub fn append(&mut self, snapshot: &StatsSnapshot) {
        for (kind, metric) in &snapshot.metrics {
            self.append_sample(*kind, Some(metric.primary_value), metric.secondary_value);
        }
    }

    /// Appends one sample for `kind`, evicting the oldest beyond capacity.
    pub fn append_sample(&mut self, kind: MetricKind, primary: Option<f64>, secondary: Option<f64>) {
        let samples = self.history.entry(kind).or_default();
        samples.push_back(MetricHistorySample::new(primary, secondary));
        let overflow = samples.len().saturating_sub(self.max_samples);
        samples.drain(..overflow);
    }

    /// Ordered samples for `kind`; empty for kinds never observed.
    pub fn samples(&self, kind: MetricKind) -> impl Iterator<Item = &MetricHistorySample> + '_ {
        self.history.get(&kind).into_iter().flatten()
    }

    /// Owned copy of the samples for `kind`.
    pub fn to_vec(&self, kind: MetricKind) -> Vec<MetricHistorySample> {
        self.history
            .get(&kind)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, kind: MetricKind) -> usize {
        self.history.get(&kind).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.history.values().all(VecDeque::is_empty)
    }

    /// Owned copy of the whole history keyed by kind.
    pub fn snapshot(&self) -> BTreeMap<MetricKind, Vec<MetricHistorySample>> {
        self.history
            .iter()
            .map(|(kind, samples)| (*kind, samples.iter().copied().collect()))
            .collect()
    }
}
