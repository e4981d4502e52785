//! Shared formatting helpers for the status bar and the popover.
//!
//! All pure formatting functions (no layout, no colors) live here.
//! Functions that differ between the compact status bar and the popover
//! detail cards are parameterized via [`FmtStyle`].
//!
//! Any value that is absent, non-finite or too large to round into an `i64`
//! renders as the `--` placeholder.

use crate::model::{MetricKind, MetricValue};

pub const PLACEHOLDER: &str = "--";

/// Controls compact (status bar) vs detail (popover card) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtStyle {
    /// Compact: prefixed with a short metric tag ("CPU 24%", "MEM 8/16 GB")
    Compact,
    /// Detail: value only, the card title names the metric ("24%", "8/16 GB")
    Detail,
}

// ---------------------------------------------------------------------------
// Number helpers
// ---------------------------------------------------------------------------

/// Returns `value` rounded half away from zero if it fits in an `i64`.
fn rounded_integer(value: f64) -> Option<i64> {
    let rounded = value.round();
    // i64::MAX as f64 is 2^63, one past the largest representable value.
    (rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64)
        .then_some(rounded as i64)
}

/// Whole number, or the placeholder.
pub fn whole_number(value: Option<f64>) -> String {
    value
        .and_then(rounded_integer)
        .map_or_else(|| PLACEHOLDER.to_string(), |n| n.to_string())
}

/// Rounds to tenths; integral results drop the decimal.
///
/// `14.24` → `"14.2"`, `31.96` → `"32"`, `0.05` → `"0.1"`.
pub fn compact_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_string();
    };
    let Some(tenths) = rounded_integer(value * 10.0) else {
        return PLACEHOLDER.to_string();
    };
    if tenths % 10 == 0 {
        (tenths / 10).to_string()
    } else {
        format!("{:.1}", tenths as f64 / 10.0)
    }
}

/// Rates of 10 and above lose their decimal in detail cards.
fn detail_rate(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v.abs() >= 10.0 => whole_number(Some(v)),
        _ => compact_number(value),
    }
}

// ---------------------------------------------------------------------------
// Per-metric formatters
// ---------------------------------------------------------------------------

/// Compact: `"CPU 24%"`, `"CPU --"`. Detail: `"24%"`, `"--"`.
pub fn format_cpu(percent: Option<f64>, style: FmtStyle) -> String {
    format_percent("CPU", percent, style)
}

/// Compact: `"BAT 87%"`. Detail: `"87%"`.
pub fn format_battery(percent: Option<f64>, style: FmtStyle) -> String {
    format_percent("BAT", percent, style)
}

fn format_percent(tag: &str, percent: Option<f64>, style: FmtStyle) -> String {
    let value = match percent.and_then(rounded_integer) {
        Some(n) => format!("{n}%"),
        None => PLACEHOLDER.to_string(),
    };
    match style {
        FmtStyle::Compact => format!("{tag} {value}"),
        FmtStyle::Detail => value,
    }
}

/// Compact: `"MEM 14.2/32 GB"`. Detail: `"14.2/32 GB"`.
pub fn format_memory(used_gb: Option<f64>, total_gb: Option<f64>, style: FmtStyle) -> String {
    format_capacity("MEM", used_gb, total_gb, style)
}

/// Compact: `"DSK 256.1/512 GB"`. Detail: `"256.1/512 GB"`.
pub fn format_disk(used_gb: Option<f64>, total_gb: Option<f64>, style: FmtStyle) -> String {
    format_capacity("DSK", used_gb, total_gb, style)
}

fn format_capacity(tag: &str, used: Option<f64>, total: Option<f64>, style: FmtStyle) -> String {
    let body = format!("{}/{} GB", compact_number(used), compact_number(total));
    match style {
        FmtStyle::Compact => format!("{tag} {body}"),
        FmtStyle::Detail => body,
    }
}

/// Compact: `"NET 12.3↓ 0.1↑ MB/s"`. Detail: `"12↓ 0.1↑ MB/s"`.
pub fn format_network(down_mbps: Option<f64>, up_mbps: Option<f64>, style: FmtStyle) -> String {
    match style {
        FmtStyle::Compact => format!(
            "NET {}↓ {}↑ MB/s",
            compact_number(down_mbps),
            compact_number(up_mbps)
        ),
        FmtStyle::Detail => format!("{}↓ {}↑ MB/s", detail_rate(down_mbps), detail_rate(up_mbps)),
    }
}

/// Formats the reading for `kind`; a missing reading renders placeholders.
pub fn format_metric(kind: MetricKind, metric: Option<&MetricValue>, style: FmtStyle) -> String {
    let primary = metric.map(|m| m.primary_value);
    let secondary = metric.and_then(|m| m.secondary_value);
    match kind {
        MetricKind::CpuUsage => format_cpu(primary, style),
        MetricKind::MemoryUsage => format_memory(primary, secondary, style),
        MetricKind::NetworkThroughput => format_network(primary, secondary, style),
        MetricKind::BatteryStatus => format_battery(primary, style),
        MetricKind::DiskUsage => format_disk(primary, secondary, style),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FmtStyle::{Compact, Detail};

    #[test]
    fn test_cpu_rounds_to_nearest_whole_percent() {
        assert_eq!(format_cpu(Some(23.2), Compact), "CPU 23%");
        assert_eq!(format_cpu(Some(23.5), Compact), "CPU 24%");
        assert_eq!(format_cpu(Some(23.5), Detail), "24%");
    }

    #[test]
    fn test_cpu_placeholder() {
        assert_eq!(format_cpu(None, Compact), "CPU --");
        assert_eq!(format_cpu(None, Detail), "--");
    }

    #[test]
    fn test_memory_compact() {
        assert_eq!(format_memory(Some(14.24), Some(31.96), Compact), "MEM 14.2/32 GB");
        assert_eq!(format_memory(Some(8.0), Some(16.0), Compact), "MEM 8/16 GB");
        assert_eq!(format_memory(Some(14.24), Some(31.96), Detail), "14.2/32 GB");
    }

    #[test]
    fn test_memory_placeholders() {
        assert_eq!(format_memory(None, Some(32.0), Compact), "MEM --/32 GB");
        assert_eq!(format_memory(None, None, Compact), "MEM --/-- GB");
        assert_eq!(format_memory(None, None, Detail), "--/-- GB");
    }

    #[test]
    fn test_network_arrows_and_unit() {
        assert_eq!(format_network(Some(12.34), Some(0.05), Compact), "NET 12.3↓ 0.1↑ MB/s");
        assert_eq!(format_network(Some(5.0), Some(2.0), Compact), "NET 5↓ 2↑ MB/s");
        assert_eq!(format_network(None, None, Compact), "NET --↓ --↑ MB/s");
    }

    #[test]
    fn test_network_detail_drops_decimal_from_ten() {
        assert_eq!(format_network(Some(12.34), Some(0.05), Detail), "12↓ 0.1↑ MB/s");
        assert_eq!(format_network(Some(9.94), Some(10.5), Detail), "9.9↓ 11↑ MB/s");
        assert_eq!(format_network(None, None, Detail), "--↓ --↑ MB/s");
    }

    #[test]
    fn test_battery_and_disk() {
        assert_eq!(format_battery(Some(87.2), Compact), "BAT 87%");
        assert_eq!(format_battery(Some(87.2), Detail), "87%");
        assert_eq!(format_battery(None, Detail), "--");
        assert_eq!(format_disk(Some(256.1), Some(512.0), Compact), "DSK 256.1/512 GB");
        assert_eq!(format_disk(Some(256.1), Some(512.0), Detail), "256.1/512 GB");
    }

    #[test]
    fn test_decimal_separator_is_dot() {
        assert_eq!(format_memory(Some(1.2), Some(3.4), Compact), "MEM 1.2/3.4 GB");
        assert_eq!(format_network(Some(12.34), Some(0.56), Compact), "NET 12.3↓ 0.6↑ MB/s");
    }

    #[test]
    fn test_out_of_range_values_are_placeholders() {
        let huge = i64::MAX as f64 * 2.0;
        assert_eq!(format_cpu(Some(huge), Compact), "CPU --");
        assert_eq!(format_memory(Some(huge), Some(16.0), Compact), "MEM --/16 GB");
        assert_eq!(format_network(Some(huge), Some(1.0), Compact), "NET --↓ 1↑ MB/s");
        assert_eq!(format_network(Some(huge), Some(1.0), Detail), "--↓ 1↑ MB/s");
    }

    #[test]
    fn test_non_finite_values_are_placeholders() {
        assert_eq!(format_cpu(Some(f64::NAN), Compact), "CPU --");
        assert_eq!(format_memory(Some(f64::INFINITY), Some(16.0), Compact), "MEM --/16 GB");
        assert_eq!(
            format_network(Some(4.0), Some(f64::NEG_INFINITY), Compact),
            "NET 4↓ --↑ MB/s"
        );
    }

    #[test]
    fn test_compact_number_edges() {
        assert_eq!(compact_number(Some(0.0)), "0");
        assert_eq!(compact_number(Some(-0.04)), "0");
        assert_eq!(compact_number(Some(-1.25)), "-1.3");
        assert_eq!(compact_number(Some(99.96)), "100");
    }

    #[test]
    fn test_format_metric_dispatch() {
        let memory = MetricValue::gigabytes(8.0, 16.0);
        assert_eq!(
            format_metric(MetricKind::MemoryUsage, Some(&memory), Compact),
            "MEM 8/16 GB"
        );
        assert_eq!(format_metric(MetricKind::DiskUsage, None, Detail), "--/-- GB");
        assert_eq!(
            format_metric(MetricKind::CpuUsage, Some(&MetricValue::percent(7.0)), Detail),
            "7%"
        );
    }
}
