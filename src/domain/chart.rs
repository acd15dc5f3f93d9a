// Chart request and chart model domain types
use super::run::{RunMetadata, RunRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartMode {
    #[default]
    SingleAxis,
    MultiAxis,
}

/// Zoom window persisted by the client; passed through untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(default)]
    pub mode: ChartMode,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
    #[serde(default)]
    pub shown_runs_override: BTreeSet<String>,
    #[serde(default)]
    pub hidden_series_names: BTreeSet<String>,
    #[serde(default)]
    pub smoothing_pct: u8,
    #[serde(default)]
    pub monochrome: bool,
    #[serde(default)]
    pub explicit_title: Option<String>,
    #[serde(default)]
    pub range: Option<ChartRange>,
}

impl ChartRequest {
    pub fn new(mode: ChartMode, runs: Vec<RunRecord>) -> Self {
        Self {
            mode,
            runs,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YAxis {
    pub metric: String,
    pub side: AxisSide,
    pub offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub elapsed_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(elapsed_ms: i64, value: f64) -> Self {
        Self { elapsed_ms, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSeries {
    pub name: String,
    pub metric_group: String,
    pub y_axis_index: usize,
    pub points: Vec<TimeSeriesPoint>,
    pub color: String,
    pub dash_style: DashStyle,
    pub visible: bool,
    pub contributing_runs: Vec<RunMetadata>,
}

/// Hover information for one series, collected once at build time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipMetadata {
    pub metric: String,
    pub workloads: Vec<String>,
    pub models: Vec<String>,
    pub sources: Vec<String>,
    pub params: Vec<String>,
    pub letters: Vec<String>,
    pub run_count: usize,
    pub duration_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartModel {
    pub title: String,
    pub mode: ChartMode,
    pub y_axes: Vec<YAxis>,
    pub series: Vec<RenderedSeries>,
    pub legend_visibility: BTreeMap<String, bool>,
    pub tooltips: BTreeMap<String, TooltipMetadata>,
    pub toggleable_workloads: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ChartRange>,
}

impl ChartModel {
    pub fn tooltip(&self, series_name: &str) -> Option<&TooltipMetadata> {
        self.tooltips.get(series_name)
    }

    pub fn series_named(&self, name: &str) -> Option<&RenderedSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn series_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = r#"{
            "mode": "multiAxis",
            "runs": [],
            "shownRunsOverride": ["a-1"],
            "smoothingPct": 40,
            "monochrome": true
        }"#;
        let request: ChartRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.mode, ChartMode::MultiAxis);
        assert!(request.shown_runs_override.contains("a-1"));
        assert!(request.hidden_series_names.is_empty());
        assert_eq!(request.smoothing_pct, 40);
        assert!(request.monochrome);
        assert_eq!(request.explicit_title, None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&DashStyle::Dotted).unwrap(), "\"dotted\"");
        assert_eq!(serde_json::to_string(&AxisSide::Right).unwrap(), "\"right\"");
        assert_eq!(
            serde_json::to_string(&ChartMode::SingleAxis).unwrap(),
            "\"singleAxis\""
        );
    }
}
