// Chart model builder - the entry point of the chart engine
use crate::application::aggregator::{AggregatedSeries, MetricGroup, aggregate};
use crate::application::normalizer::format_elapsed;
use crate::application::palette::Palette;
use crate::application::smoothing::smooth;
use crate::domain::chart::{
    AxisSide, ChartMode, ChartModel, ChartRequest, RenderedSeries, TooltipMetadata, YAxis,
};
use crate::domain::error::ChartError;
use crate::domain::run::RunRecord;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const NO_DATA_TITLE: &str = "No Data";
const DEFAULT_AXIS_NAME: &str = "Value";
const AXIS_OFFSET_STEP: i32 = 50;

/// Turn a chart request into a renderable chart model.
///
/// The build is a pure function of the request: the same request always
/// produces the same series order, names, colors and points. Colors are
/// assigned before hidden series are filtered out, so toggling a series
/// never restyles the others.
pub fn build_chart(request: &ChartRequest) -> Result<ChartModel, ChartError> {
    let mut groups = aggregate(request);
    // metrics with no plottable samples get no axis
    groups.retain(|g| !g.series.is_empty());

    let palette = Palette::new(request.monochrome);
    let total_series: usize = groups.iter().map(|g| g.series.len()).sum();
    palette.check_series_count(total_series)?;

    let title = chart_title(request.explicit_title.as_deref(), &groups);
    let y_axes = y_axes(request.mode, &groups, &request.runs);

    let mut series = Vec::new();
    let mut legend_visibility = BTreeMap::new();
    let mut tooltips = BTreeMap::new();

    for (metric_index, group) in groups.into_iter().enumerate() {
        let dash_style = palette.dash_style(metric_index);

        for (series_index, s) in group.series.into_iter().enumerate() {
            legend_visibility.insert(s.name.clone(), s.visible);
            if !s.visible {
                continue;
            }

            tooltips.insert(s.name.clone(), tooltip_metadata(&s));
            series.push(RenderedSeries {
                points: smooth(&s.points, request.smoothing_pct),
                name: s.name,
                metric_group: group.metric.clone(),
                y_axis_index: metric_index,
                color: palette.color(series_index).to_string(),
                dash_style,
                visible: true,
                contributing_runs: s.runs,
            });
        }
    }

    tracing::debug!(
        "Built chart '{}' with {} of {} series on {} axes",
        title,
        series.len(),
        total_series,
        y_axes.len()
    );

    Ok(ChartModel {
        title,
        mode: request.mode,
        y_axes,
        series,
        legend_visibility,
        tooltips,
        toggleable_workloads: toggleable_workloads(&request.runs),
        range: request.range,
    })
}

/// Caller's title wins; otherwise the single experiment name, or a count of experiments.
pub fn chart_title(explicit: Option<&str>, groups: &[MetricGroup]) -> String {
    if let Some(title) = explicit.filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    let mut experiments: Vec<&str> = Vec::new();
    let runs = groups
        .iter()
        .flat_map(|g| &g.series)
        .flat_map(|s| &s.runs);
    for run in runs {
        if !experiments.contains(&run.experiment_name.as_str()) {
            experiments.push(&run.experiment_name);
        }
    }

    match experiments.as_slice() {
        [] => NO_DATA_TITLE.to_string(),
        [only] => only.to_string(),
        many => format!("Multiple Experiments ({})", many.len()),
    }
}

fn y_axes(mode: ChartMode, groups: &[MetricGroup], runs: &[RunRecord]) -> Vec<YAxis> {
    match mode {
        ChartMode::SingleAxis => {
            let metric = runs
                .iter()
                .map(|r| r.metric.as_str())
                .find(|m| !m.is_empty())
                .unwrap_or(DEFAULT_AXIS_NAME);
            vec![YAxis {
                metric: metric.to_string(),
                side: AxisSide::Left,
                offset: 0,
            }]
        }
        ChartMode::MultiAxis => groups
            .iter()
            .enumerate()
            .map(|(i, g)| YAxis {
                metric: g.metric.clone(),
                side: if i % 2 == 1 {
                    AxisSide::Right
                } else {
                    AxisSide::Left
                },
                offset: i as i32 * AXIS_OFFSET_STEP,
            })
            .collect(),
    }
}

/// De-duplicated run attributes for hover display, in first-seen order
pub fn tooltip_metadata(series: &AggregatedSeries) -> TooltipMetadata {
    let mut tooltip = TooltipMetadata {
        metric: series.metric.clone(),
        run_count: series.runs.len(),
        duration_label: format_elapsed(series.points.last().map(|p| p.elapsed_ms).unwrap_or(0)),
        ..TooltipMetadata::default()
    };

    for run in &series.runs {
        push_unique(&mut tooltip.workloads, Some(&run.workload_id));
        push_unique(&mut tooltip.models, run.model.as_deref());
        push_unique(&mut tooltip.sources, run.source.as_deref());
        push_unique(&mut tooltip.letters, run.letter.as_deref());
        let params = run.params_label();
        push_unique(&mut tooltip.params, Some(&params));
    }

    tooltip
}

fn push_unique(values: &mut Vec<String>, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        if !values.iter().any(|existing| existing == v) {
            values.push(v.to_string());
        }
    }
}

/// Workloads holding more than one run, i.e. the ones worth an expand toggle
pub fn toggleable_workloads(runs: &[RunRecord]) -> Vec<String> {
    let mut run_ids: HashMap<&str, HashSet<&str>> = HashMap::new();
    for run in runs {
        run_ids
            .entry(run.workload.as_str())
            .or_default()
            .insert(run.id.as_str());
    }

    let mut workloads: Vec<String> = Vec::new();
    for run in runs {
        let workload = run.workload.as_str();
        let repeated = run_ids.get(workload).is_some_and(|ids| ids.len() > 1);
        if repeated && !workloads.iter().any(|w| w == workload) {
            workloads.push(workload.to_string());
        }
    }
    workloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::DashStyle;
    use crate::domain::sample::Sample;

    fn run(id: &str, workload: &str, metric: &str, samples: &[(i64, f64)]) -> RunRecord {
        RunRecord::new(
            id,
            workload,
            metric,
            samples
                .iter()
                .map(|&(t, v)| Sample::new(t, v, 0))
                .collect(),
        )
        .with_experiment("exp-1")
    }

    fn workloads(n: usize) -> Vec<RunRecord> {
        (0..n)
            .map(|i| {
                run(
                    &format!("run{:04}", i),
                    &format!("W{}-1", i),
                    "loss",
                    &[(1_000 + i as i64, i as f64), (2_000, 1.0)],
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_request() {
        let model = build_chart(&ChartRequest::default()).unwrap();
        assert!(model.series.is_empty());
        assert_eq!(model.title, "No Data");
        assert!(model.legend_visibility.is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut request = ChartRequest::new(ChartMode::MultiAxis, workloads(4));
        request.runs.push(run("xx", "W0-null", "accuracy", &[(5, 0.1), (9, 0.4)]));
        request.smoothing_pct = 30;
        let a = build_chart(&request).unwrap();
        let b = build_chart(&request).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_every_series_starts_at_zero() {
        let request = ChartRequest::new(ChartMode::SingleAxis, workloads(3));
        let model = build_chart(&request).unwrap();
        for s in &model.series {
            assert_eq!(s.points.iter().map(|p| p.elapsed_ms).min(), Some(0));
        }
    }

    #[test]
    fn test_monochrome_limit() {
        let mut request = ChartRequest::new(ChartMode::SingleAxis, workloads(6));
        request.monochrome = true;
        assert_eq!(
            build_chart(&request),
            Err(ChartError::MonochromeSeriesLimitExceeded { count: 6, limit: 5 })
        );

        request.runs.pop();
        let model = build_chart(&request).unwrap();
        assert_eq!(model.series.len(), 5);
        assert_eq!(model.series[4].color, "#666666");
    }

    #[test]
    fn test_multi_axis_styles() {
        let runs = vec![
            run("r1", "A-1", "loss", &[(0, 1.0)]),
            run("r2", "B-1", "loss", &[(0, 2.0)]),
            run("r1", "A-1", "accuracy", &[(0, 0.1)]),
            run("r2", "B-1", "accuracy", &[(0, 0.2)]),
        ];
        let model = build_chart(&ChartRequest::new(ChartMode::MultiAxis, runs)).unwrap();

        assert_eq!(model.y_axes.len(), 2);
        assert_eq!(model.y_axes[0].side, AxisSide::Left);
        assert_eq!(model.y_axes[1].side, AxisSide::Right);
        assert_eq!(model.y_axes[1].offset, 50);
        assert_eq!(model.series.len(), 4);

        let loss: Vec<&RenderedSeries> = model
            .series
            .iter()
            .filter(|s| s.metric_group == "loss")
            .collect();
        let accuracy: Vec<&RenderedSeries> = model
            .series
            .iter()
            .filter(|s| s.metric_group == "accuracy")
            .collect();
        assert!(loss.iter().all(|s| s.dash_style == DashStyle::Solid));
        assert!(accuracy.iter().all(|s| s.dash_style == DashStyle::Dashed));
        assert!(accuracy.iter().all(|s| s.y_axis_index == 1));
        // colors restart per metric group
        assert_eq!(loss[1].color, accuracy[1].color);
        assert_eq!(model.series_names(), vec![
            "A-1 :: loss",
            "B-1 :: loss",
            "A-1 :: accuracy",
            "B-1 :: accuracy",
        ]);
    }

    #[test]
    fn test_single_axis_always_solid() {
        let model = build_chart(&ChartRequest::new(ChartMode::SingleAxis, workloads(4))).unwrap();
        assert_eq!(model.y_axes.len(), 1);
        assert_eq!(model.y_axes[0].metric, "loss");
        assert!(model.series.iter().all(|s| s.dash_style == DashStyle::Solid));
    }

    #[test]
    fn test_hiding_is_reversible() {
        let mut request = ChartRequest::new(ChartMode::SingleAxis, workloads(3));
        let full = build_chart(&request).unwrap();

        request.hidden_series_names.insert("W1-1".to_string());
        let hidden = build_chart(&request).unwrap();
        assert_eq!(hidden.series.len(), 2);
        assert!(hidden.series_named("W1-1").is_none());
        assert_eq!(hidden.legend_visibility.get("W1-1"), Some(&false));
        assert_eq!(hidden.legend_visibility.get("W0-1"), Some(&true));
        // remaining series keep their colors
        assert_eq!(
            hidden.series_named("W2-1").map(|s| &s.color),
            full.series_named("W2-1").map(|s| &s.color)
        );

        request.hidden_series_names.clear();
        assert_eq!(build_chart(&request).unwrap(), full);
    }

    #[test]
    fn test_smoothing_applied_after_merge() {
        let runs = vec![
            run("r1", "A-1", "loss", &[(0, 10.0), (2, 0.0)]),
            run("r2", "A-1", "loss", &[(1, 20.0)]),
        ];
        let mut request = ChartRequest::new(ChartMode::SingleAxis, runs);
        request.smoothing_pct = 50;
        let model = build_chart(&request).unwrap();
        let values: Vec<f64> = model.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![10.0, 15.0, 7.5]);
    }

    #[test]
    fn test_titles() {
        let mut request = ChartRequest::new(ChartMode::SingleAxis, workloads(2));
        assert_eq!(build_chart(&request).unwrap().title, "exp-1");

        request.runs[1].experiment_name = "exp-2".to_string();
        assert_eq!(
            build_chart(&request).unwrap().title,
            "Multiple Experiments (2)"
        );

        request.explicit_title = Some("Loss comparison".to_string());
        assert_eq!(build_chart(&request).unwrap().title, "Loss comparison");
    }

    #[test]
    fn test_empty_runs_ignored_in_title_and_tooltips() {
        let with_data = run("r1", "A-1", "loss", &[(0, 1.0)]);
        let mut empty = run("r2", "A-1", "loss", &[]).with_experiment("exp-2");
        empty.model = Some("vit".to_string());

        let request = ChartRequest::new(ChartMode::SingleAxis, vec![with_data.clone(), empty.clone()]);
        let model = build_chart(&request).unwrap();
        assert_eq!(model.title, "exp-1");
        assert_eq!(model.series[0].contributing_runs.len(), 1);
        let tooltip = model.tooltip("A-1").unwrap();
        assert_eq!(tooltip.run_count, 1);
        assert!(tooltip.models.is_empty());

        // same outcome when the empty run sits in another workload
        empty.workload = "B-1".into();
        let regrouped = build_chart(&ChartRequest::new(ChartMode::SingleAxis, vec![with_data, empty])).unwrap();
        assert_eq!(regrouped.title, model.title);
    }

    #[test]
    fn test_tooltip_metadata() {
        let mut a = run("r1", "A-1", "loss", &[(0, 1.0), (90_000, 2.0)]).with_letter("a");
        a.model = Some("resnet50".to_string());
        a.source = Some("imagenet".to_string());
        a.params.insert("lr".to_string(), "0.1".to_string());
        let mut b = run("r2", "A-1", "loss", &[(30_000, 3.0)]).with_letter("b");
        b.model = Some("resnet50".to_string());
        b.params.insert("lr".to_string(), "0.01".to_string());

        let model = build_chart(&ChartRequest::new(ChartMode::SingleAxis, vec![a, b])).unwrap();
        let tooltip = model.tooltip("A-1").unwrap();
        assert_eq!(tooltip.metric, "loss");
        assert_eq!(tooltip.workloads, vec!["A-1"]);
        assert_eq!(tooltip.models, vec!["resnet50"]);
        assert_eq!(tooltip.sources, vec!["imagenet"]);
        assert_eq!(tooltip.params, vec!["lr:0.1", "lr:0.01"]);
        assert_eq!(tooltip.letters, vec!["a", "b"]);
        assert_eq!(tooltip.run_count, 2);
        assert_eq!(tooltip.duration_label, "00:01:30");
    }

    #[test]
    fn test_toggleable_workloads() {
        let runs = vec![
            run("r1", "A-1", "loss", &[(0, 1.0)]),
            run("r1", "A-1", "accuracy", &[(0, 1.0)]),
            run("r2", "B-1", "loss", &[(0, 1.0)]),
            run("r3", "B-1", "loss", &[(0, 1.0)]),
        ];
        assert_eq!(toggleable_workloads(&runs), vec!["B-1"]);
    }

    #[test]
    fn test_range_passthrough() {
        let mut request = ChartRequest::new(ChartMode::SingleAxis, workloads(1));
        request.range = Some(crate::domain::chart::ChartRange {
            min: 10.0,
            max: 500.0,
        });
        assert_eq!(build_chart(&request).unwrap().range, request.range);
    }
}
