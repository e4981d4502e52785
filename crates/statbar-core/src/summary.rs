//! Status bar metric selection, summary line and user preferences.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::DEFAULT_INTERVAL;
use crate::fmt::{FmtStyle, PLACEHOLDER, format_metric};
use crate::model::{MetricKind, StatsSnapshot};

/// The status bar never shows more than this many metrics.
pub const MENU_BAR_MAX_VISIBLE: usize = 2;

pub const DEFAULT_MAX_VISIBLE: usize = 2;

const SEPARATOR: &str = " | ";

/// First `max_visible` kinds of `order`, in order.
pub fn visible_metrics(order: &[MetricKind], max_visible: usize) -> Vec<MetricKind> {
    order.iter().copied().take(max_visible).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub summary_metric_order: Vec<MetricKind>,
    pub max_visible_summary_items: usize,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            summary_metric_order: MetricKind::ALL.to_vec(),
            max_visible_summary_items: DEFAULT_MAX_VISIBLE,
        }
    }
}

impl UserPreferences {
    /// Kinds shown in the status bar, capped at [`MENU_BAR_MAX_VISIBLE`].
    pub fn visible(&self) -> Vec<MetricKind> {
        visible_metrics(
            &self.summary_metric_order,
            self.max_visible_summary_items.min(MENU_BAR_MAX_VISIBLE),
        )
    }
}

/// Renders the status bar line, e.g. `"CPU 24% | MEM 8/16 GB"`.
///
/// Metrics missing from `snapshot` (or no snapshot yet) render their
/// placeholders; an empty selection renders `--`.
pub fn summary_text(snapshot: Option<&StatsSnapshot>, prefs: &UserPreferences) -> String {
    let visible = prefs.visible();
    if visible.is_empty() {
        return PLACEHOLDER.to_string();
    }
    visible
        .into_iter()
        .map(|kind| format_metric(kind, snapshot.and_then(|s| s.metric(kind)), FmtStyle::Compact))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Editable settings backing the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub summary_metric_order: Vec<MetricKind>,
    pub refresh_interval: Duration,
    /// `None` hides the second status bar slot.
    pub secondary_status_metric: Option<MetricKind>,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            summary_metric_order: MetricKind::ALL.to_vec(),
            refresh_interval: DEFAULT_INTERVAL,
            secondary_status_metric: Some(MetricKind::MemoryUsage),
        }
    }
}

impl SettingsState {
    /// Puts `kind` at `index`. If `kind` already sits elsewhere in the order
    /// the two positions are swapped so every kind appears once.
    /// Out-of-range indices are ignored.
    pub fn update_summary_metric(&mut self, index: usize, kind: MetricKind) {
        if index >= self.summary_metric_order.len() || self.summary_metric_order[index] == kind {
            return;
        }
        match self.summary_metric_order.iter().position(|&k| k == kind) {
            Some(duplicate) => self.summary_metric_order.swap(index, duplicate),
            None => self.summary_metric_order[index] = kind,
        }
    }

    pub fn show_secondary_metric(&self) -> bool {
        self.secondary_status_metric.is_some()
    }

    /// Preferences for the status bar: the primary slot plus the secondary
    /// metric when one is enabled.
    pub fn preferences(&self) -> UserPreferences {
        let mut order = self.summary_metric_order.clone();
        if let Some(secondary) = self.secondary_status_metric
            && let Some(pos) = order.iter().position(|&k| k == secondary)
            && pos > 0
        {
            let kind = order.remove(pos);
            order.insert(1, kind);
        }
        UserPreferences {
            summary_metric_order: order,
            max_visible_summary_items: if self.show_secondary_metric() { 2 } else { 1 },
        }
    }
}
