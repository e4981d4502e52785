//! Network throughput derivation from cumulative interface counters.
//!
//! Collectors report the network metric as cumulative MiB counters. Before a
//! snapshot is published, [`NetworkRateDeriver::derive`] rewrites that entry
//! into an instantaneous MiB/s rate using the previously accepted counters as
//! baseline. Every anomaly (first sample, clock step, counter reset,
//! overflow) resolves to a zero rate instead of an error.

use tracing::debug;

use crate::model::{MetricKind, MetricValue, StatsSnapshot, Unit};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute f64 delta, returning `None` on counter regression or non-finite input.
pub fn df64(curr: f64, prev: f64) -> Option<f64> {
    let delta = curr - prev;
    (delta.is_finite() && delta >= 0.0).then_some(delta)
}

/// Divide a counter delta by elapsed seconds, returning `None` for non-finite results.
fn rate(delta: f64, elapsed_secs: f64) -> Option<f64> {
    let r = delta / elapsed_secs;
    r.is_finite().then_some(r)
}

// ---------------------------------------------------------------------------
// Raw counter sample
// ---------------------------------------------------------------------------

/// Cumulative counters extracted from a snapshot's network metric.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawNetworkSample {
    timestamp: chrono::DateTime<chrono::Utc>,
    download_counter: f64,
    upload_counter: f64,
    unit: Unit,
}

impl RawNetworkSample {
    /// Requires both counters present, finite and non-negative.
    fn extract(snapshot: &StatsSnapshot) -> Option<Self> {
        let metric = snapshot.metric(MetricKind::NetworkThroughput)?;
        let download = metric.primary_value;
        let upload = metric.secondary_value?;
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(download) || !valid(upload) {
            return None;
        }
        Some(Self {
            timestamp: snapshot.timestamp,
            download_counter: download,
            upload_counter: upload,
            unit: metric.unit,
        })
    }

    /// Seconds elapsed since `earlier`, `None` unless strictly positive.
    fn elapsed_since(&self, earlier: &RawNetworkSample) -> Option<f64> {
        let micros = (self.timestamp - earlier.timestamp).num_microseconds()?;
        let secs = micros as f64 / 1_000_000.0;
        (secs.is_finite() && secs > 0.0).then_some(secs)
    }

    /// `(download, upload)` rate relative to `baseline`, or `None` on any anomaly.
    fn rate_since(&self, baseline: &RawNetworkSample) -> Option<(f64, f64)> {
        let elapsed = self.elapsed_since(baseline)?;
        let download_delta = df64(self.download_counter, baseline.download_counter)?;
        let upload_delta = df64(self.upload_counter, baseline.upload_counter)?;
        Some((rate(download_delta, elapsed)?, rate(upload_delta, elapsed)?))
    }
}

// ---------------------------------------------------------------------------
// Deriver
// ---------------------------------------------------------------------------

/// Stateful counter-to-rate transform for the network metric.
#[derive(Debug, Default)]
pub struct NetworkRateDeriver {
    baseline: Option<RawNetworkSample>,
}

impl NetworkRateDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the baseline so the next sample reports a zero rate.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Rewrites the network metric of `snapshot` into a MiB/s rate.
    ///
    /// When the counters cannot be extracted the baseline is cleared and the
    /// snapshot is returned untouched. Otherwise the baseline always advances
    /// to the incoming counters, whether or not a rate could be computed.
    pub fn derive(&mut self, mut snapshot: StatsSnapshot) -> StatsSnapshot {
        let Some(sample) = RawNetworkSample::extract(&snapshot) else {
            if self.baseline.take().is_some() {
                debug!("network counters unavailable, baseline cleared");
            }
            return snapshot;
        };

        let (download, upload) = match self.baseline.replace(sample) {
            None => (0.0, 0.0),
            Some(baseline) if baseline.unit != sample.unit => {
                debug!(
                    from = ?baseline.unit,
                    to = ?sample.unit,
                    "network counter unit changed, rate reset"
                );
                (0.0, 0.0)
            }
            Some(baseline) => sample.rate_since(&baseline).unwrap_or_else(|| {
                debug!("network counter anomaly, reporting zero rate");
                (0.0, 0.0)
            }),
        };

        snapshot.metrics.insert(
            MetricKind::NetworkThroughput,
            MetricValue::megabytes_per_second(download, upload),
        );
        snapshot
    }
}
