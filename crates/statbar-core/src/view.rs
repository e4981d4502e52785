//! Popover view model.
//!
//! Presentation data for the popover without any dependency on a rendering
//! framework: one card per metric kind with its detail text and trend
//! series, plus the busiest processes for the CPU card.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fmt::{FmtStyle, format_metric};
use crate::history::MetricHistorySample;
use crate::model::{MetricKind, StatsSnapshot};

/// Processes below this share are hidden from the CPU card.
pub const TOP_PROCESS_MIN_PERCENT: f64 = 1.0;
pub const TOP_PROCESS_LIMIT: usize = 10;

/// One line of a card's trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopoverTrendSeries {
    pub label: &'static str,
    pub points: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopoverMetricCard {
    pub kind: MetricKind,
    pub title: &'static str,
    pub text: String,
    pub trend_series: Vec<PopoverTrendSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProcess {
    /// Rank in the list; unique even when names repeat.
    pub id: usize,
    pub name: String,
    pub cpu_usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopoverViewModel {
    pub cards: Vec<PopoverMetricCard>,
    #[serde(rename = "topCPUProcesses")]
    pub top_cpu_processes: Vec<TopProcess>,
}

impl PopoverViewModel {
    pub fn new(
        snapshot: Option<&StatsSnapshot>,
        history: &BTreeMap<MetricKind, Vec<MetricHistorySample>>,
    ) -> Self {
        let cards = MetricKind::ALL
            .iter()
            .map(|&kind| {
                let samples = history.get(&kind).map_or(&[][..], Vec::as_slice);
                PopoverMetricCard {
                    kind,
                    title: kind.label(),
                    text: format_metric(
                        kind,
                        snapshot.and_then(|s| s.metric(kind)),
                        FmtStyle::Detail,
                    ),
                    trend_series: trend_series(kind, samples),
                }
            })
            .collect();

        Self {
            cards,
            top_cpu_processes: snapshot.map(top_processes).unwrap_or_default(),
        }
    }

    /// Card for `kind`. Every kind has one.
    pub fn card(&self, kind: MetricKind) -> Option<&PopoverMetricCard> {
        self.cards.iter().find(|c| c.kind == kind)
    }
}

fn series_labels(kind: MetricKind) -> (&'static str, Option<&'static str>) {
    match kind {
        MetricKind::CpuUsage => ("Usage", None),
        MetricKind::MemoryUsage => ("Used", None),
        MetricKind::NetworkThroughput => ("Down", Some("Up")),
        MetricKind::BatteryStatus => ("Charge", None),
        MetricKind::DiskUsage => ("Used", None),
    }
}

fn trend_series(kind: MetricKind, samples: &[MetricHistorySample]) -> Vec<PopoverTrendSeries> {
    let (primary, secondary) = series_labels(kind);
    let mut series = vec![PopoverTrendSeries {
        label: primary,
        points: samples.iter().filter_map(|s| s.primary).collect(),
    }];
    if let Some(label) = secondary {
        series.push(PopoverTrendSeries {
            label,
            points: samples.iter().filter_map(|s| s.secondary).collect(),
        });
    }
    series
}

fn top_processes(snapshot: &StatsSnapshot) -> Vec<TopProcess> {
    let mut usages: Vec<_> = snapshot
        .process_cpu_usages
        .iter()
        .filter(|p| p.cpu_usage_percent.is_finite() && p.cpu_usage_percent >= TOP_PROCESS_MIN_PERCENT)
        .collect();
    // Stable: equal shares keep their collection order.
    usages.sort_by(|a, b| b.cpu_usage_percent.total_cmp(&a.cpu_usage_percent));

    usages
        .into_iter()
        .take(TOP_PROCESS_LIMIT)
        .enumerate()
        .map(|(id, p)| TopProcess {
            id,
            name: p.process_name.clone(),
            cpu_usage_percent: p.cpu_usage_percent,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sparkline data
// ---------------------------------------------------------------------------

/// One plotted point, tagged with its series for multi-line charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparklinePoint {
    pub series_label: &'static str,
    pub sample_index: usize,
    pub value: f64,
}

/// Flattens `series` into chart points, series by series.
pub fn build_sparkline_points(series: &[PopoverTrendSeries]) -> Vec<SparklinePoint> {
    series
        .iter()
        .flat_map(|s| {
            s.points
                .iter()
                .enumerate()
                .map(move |(sample_index, &value)| SparklinePoint {
                    series_label: s.label,
                    sample_index,
                    value,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetricValue, ProcessCpuUsage};
    use chrono::{TimeZone, Utc};

    fn at(metrics: Vec<(MetricKind, MetricValue)>) -> StatsSnapshot {
        StatsSnapshot::new(
            Utc.timestamp_opt(1_706_000_000, 0).unwrap(),
            metrics.into_iter().collect(),
        )
    }

    fn full_snapshot() -> StatsSnapshot {
        at(vec![
            (MetricKind::CpuUsage, MetricValue::percent(23.5)),
            (MetricKind::MemoryUsage, MetricValue::gigabytes(14.24, 31.96)),
            (
                MetricKind::NetworkThroughput,
                MetricValue::megabytes_per_second(12.34, 0.05),
            ),
            (MetricKind::BatteryStatus, MetricValue::percent(87.2)),
            (MetricKind::DiskUsage, MetricValue::gigabytes(256.1, 512.0)),
        ])
    }

    fn texts(vm: &PopoverViewModel) -> Vec<&str> {
        vm.cards.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_cards_in_stable_order_with_detail_text() {
        let vm = PopoverViewModel::new(Some(&full_snapshot()), &BTreeMap::new());

        let kinds: Vec<_> = vm.cards.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
        assert_eq!(
            texts(&vm),
            vec!["24%", "14.2/32 GB", "12↓ 0.1↑ MB/s", "87%", "256.1/512 GB"]
        );
        assert_eq!(vm.card(MetricKind::MemoryUsage).unwrap().title, "Memory");
    }

    #[test]
    fn test_placeholders_without_snapshot_or_metrics() {
        let expected = vec!["--", "--/-- GB", "--↓ --↑ MB/s", "--", "--/-- GB"];

        let vm = PopoverViewModel::new(None, &BTreeMap::new());
        assert_eq!(texts(&vm), expected);
        assert!(vm.top_cpu_processes.is_empty());

        let empty = at(vec![]);
        let vm = PopoverViewModel::new(Some(&empty), &BTreeMap::new());
        assert_eq!(texts(&vm), expected);
    }

    #[test]
    fn test_history_maps_into_trend_series() {
        let mut history = BTreeMap::new();
        history.insert(
            MetricKind::CpuUsage,
            vec![
                MetricHistorySample::new(Some(20.0), None),
                MetricHistorySample::new(Some(30.0), None),
            ],
        );
        history.insert(
            MetricKind::NetworkThroughput,
            vec![
                MetricHistorySample::new(Some(1.2), Some(0.2)),
                MetricHistorySample::new(Some(1.6), Some(0.4)),
            ],
        );

        let vm = PopoverViewModel::new(Some(&full_snapshot()), &history);

        let cpu = vm.card(MetricKind::CpuUsage).unwrap();
        assert_eq!(cpu.trend_series.len(), 1);
        assert_eq!(cpu.trend_series[0].label, "Usage");
        assert_eq!(cpu.trend_series[0].points, vec![20.0, 30.0]);

        let net = vm.card(MetricKind::NetworkThroughput).unwrap();
        let labels: Vec<_> = net.trend_series.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Down", "Up"]);
        assert_eq!(net.trend_series[0].points, vec![1.2, 1.6]);
        assert_eq!(net.trend_series[1].points, vec![0.2, 0.4]);

        let disk = vm.card(MetricKind::DiskUsage).unwrap();
        assert_eq!(disk.trend_series[0].label, "Used");
        assert!(disk.trend_series[0].points.is_empty());
    }

    #[test]
    fn test_trend_series_skips_missing_values() {
        let mut history = BTreeMap::new();
        history.insert(
            MetricKind::BatteryStatus,
            vec![
                MetricHistorySample::new(Some(80.0), None),
                MetricHistorySample::new(None, None),
                MetricHistorySample::new(Some(f64::NAN), None),
                MetricHistorySample::new(Some(79.0), None),
            ],
        );
        let vm = PopoverViewModel::new(None, &history);
        let battery = vm.card(MetricKind::BatteryStatus).unwrap();
        assert_eq!(battery.trend_series[0].label, "Charge");
        assert_eq!(battery.trend_series[0].points, vec![80.0, 79.0]);
    }

    #[test]
    fn test_top_processes_sorted_with_minimum_and_limit() {
        let usages = [
            ("Finder", 0.9),
            ("Chrome Helper", 12.8),
            ("WindowServer", 7.2),
            ("Xcode", 41.3),
            ("mds", 1.0),
            ("node", 1.4),
            ("Slack", 4.4),
            ("Safari", 5.0),
            ("kernel_task", 9.7),
            ("Spotify", 3.1),
            ("Code", 2.2),
            ("Photos", 1.9),
            ("backupd", 0.4),
        ]
        .into_iter()
        .map(|(name, cpu)| ProcessCpuUsage::new(name, cpu))
        .collect();
        let snapshot = at(vec![(MetricKind::CpuUsage, MetricValue::percent(42.0))])
            .with_process_cpu_usages(usages);

        let vm = PopoverViewModel::new(Some(&snapshot), &BTreeMap::new());

        let names: Vec<_> = vm.top_cpu_processes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Xcode",
                "Chrome Helper",
                "kernel_task",
                "WindowServer",
                "Safari",
                "Slack",
                "Spotify",
                "Code",
                "Photos",
                "node",
            ]
        );
        assert!((vm.top_cpu_processes[9].cpu_usage_percent - 1.4).abs() < 1e-9);
        assert!(
            vm.top_cpu_processes
                .iter()
                .all(|p| p.cpu_usage_percent >= TOP_PROCESS_MIN_PERCENT)
        );
    }

    #[test]
    fn test_top_processes_unique_ids_for_repeated_names() {
        let snapshot = at(vec![]).with_process_cpu_usages(vec![
            ProcessCpuUsage::new("Chrome Helper", 5.0),
            ProcessCpuUsage::new("Chrome Helper", 5.0),
            ProcessCpuUsage::new("WindowServer", 4.0),
            ProcessCpuUsage::new("Finder", 0.5),
            ProcessCpuUsage::new("broken", f64::NAN),
        ]);

        let vm = PopoverViewModel::new(Some(&snapshot), &BTreeMap::new());

        let names: Vec<_> = vm.top_cpu_processes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Chrome Helper", "Chrome Helper", "WindowServer"]);
        let ids: Vec<_> = vm.top_cpu_processes.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_sparkline_points_preserve_series_grouping() {
        let series = vec![
            PopoverTrendSeries {
                label: "Down",
                points: vec![1.2, 1.6],
            },
            PopoverTrendSeries {
                label: "Up",
                points: vec![0.2, 0.4],
            },
        ];

        let points = build_sparkline_points(&series);

        let labels: Vec<_> = points.iter().map(|p| p.series_label).collect();
        let indices: Vec<_> = points.iter().map(|p| p.sample_index).collect();
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(labels, vec!["Down", "Down", "Up", "Up"]);
        assert_eq!(indices, vec![0, 1, 0, 1]);
        assert_eq!(values, vec![1.2, 1.6, 0.2, 0.4]);
    }

    #[test]
    fn test_sparkline_points_empty() {
        assert!(build_sparkline_points(&[]).is_empty());
    }
}
