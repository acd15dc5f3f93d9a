// Series aggregation - merges run samples into named series per metric group
use crate::application::labeling::resolve_series_key;
use crate::application::normalizer::normalize;
use crate::domain::chart::{ChartMode, ChartRequest, TimeSeriesPoint};
use crate::domain::run::{RunMetadata, RunRecord};
use crate::domain::sample::Sample;
use std::collections::HashMap;

/// Metric name for multi-axis runs that don't carry one
const UNKNOWN_METRIC: &str = "unknown";

/// A merged, normalized series before smoothing and styling
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSeries {
    pub name: String,
    pub label: String,
    pub metric: String,
    pub points: Vec<TimeSeriesPoint>,
    pub runs: Vec<RunMetadata>,
    pub visible: bool,
}

/// All series that share one metric (and one y-axis)
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub metric: String,
    pub series: Vec<AggregatedSeries>,
}

impl MetricGroup {
    pub fn visible_series(&self) -> impl Iterator<Item = &AggregatedSeries> {
        self.series.iter().filter(|s| s.visible)
    }
}

struct SeriesBuilder {
    label: String,
    individualized: bool,
    samples: Vec<Sample>,
    runs: Vec<RunMetadata>,
}

struct MetricBucket {
    metric: String,
    index: HashMap<String, usize>,
    series: Vec<SeriesBuilder>,
}

impl MetricBucket {
    fn new(metric: String) -> Self {
        Self {
            metric,
            index: HashMap::new(),
            series: Vec::new(),
        }
    }

    fn add_run(&mut self, run: &RunRecord, samples: Vec<Sample>, expand_requested: bool) {
        let key = resolve_series_key(&run.workload, run.letter(), &run.id, expand_requested);

        let idx = match self.index.get(&key.label).copied() {
            Some(idx) => {
                if key.individualized {
                    let other = self.series[idx].runs.first().map(|r| r.id.as_str());
                    tracing::warn!(
                        "Series label '{}' shared by runs {:?} and {}; merging them",
                        key.label,
                        other,
                        run.id
                    );
                }
                idx
            }
            None => {
                self.index.insert(key.label.clone(), self.series.len());
                self.series.push(SeriesBuilder {
                    label: key.label,
                    individualized: key.individualized,
                    samples: Vec::new(),
                    runs: Vec::new(),
                });
                self.series.len() - 1
            }
        };

        let series = &mut self.series[idx];
        series.individualized |= key.individualized;
        series.runs.push(run.metadata());
        series.samples.extend(samples);
    }
}

/// Group the request's runs into series, one group per y-axis.
///
/// Groups and the series inside them keep the first-seen order of the input
/// runs. Runs without a valid sample contribute nothing, not even metadata.
/// Hidden series are still computed and returned with `visible == false`.
pub fn aggregate(request: &ChartRequest) -> Vec<MetricGroup> {
    let mut buckets: Vec<MetricBucket> = Vec::new();

    for run in &request.runs {
        let samples: Vec<Sample> = valid_samples(run).collect();
        if samples.is_empty() {
            tracing::debug!("Skipping run {} ({}): no valid samples", run.id, run.metric);
            continue;
        }
        let expand = request.shown_runs_override.contains(run.workload.as_str());
        let bucket = match request.mode {
            ChartMode::SingleAxis => single_bucket(&mut buckets, run),
            ChartMode::MultiAxis => metric_bucket(&mut buckets, run),
        };
        bucket.add_run(run, samples, expand);
    }

    buckets
        .into_iter()
        .map(|bucket| finish_bucket(bucket, request))
        .collect()
}

fn single_bucket<'a>(buckets: &'a mut Vec<MetricBucket>, run: &RunRecord) -> &'a mut MetricBucket {
    if buckets.is_empty() {
        buckets.push(MetricBucket::new(run.metric.clone()));
    }
    let bucket = &mut buckets[0];
    if bucket.metric.is_empty() {
        bucket.metric = run.metric.clone();
    } else if !run.metric.is_empty() && run.metric != bucket.metric {
        tracing::warn!(
            "Single-axis chart for '{}' received run {} with metric '{}'",
            bucket.metric,
            run.id,
            run.metric
        );
    }
    bucket
}

fn metric_bucket<'a>(buckets: &'a mut Vec<MetricBucket>, run: &RunRecord) -> &'a mut MetricBucket {
    let metric = if run.metric.is_empty() {
        UNKNOWN_METRIC
    } else {
        run.metric.as_str()
    };

    let idx = match buckets.iter().position(|b| b.metric == metric) {
        Some(idx) => idx,
        None => {
            buckets.push(MetricBucket::new(metric.to_string()));
            buckets.len() - 1
        }
    };
    &mut buckets[idx]
}

fn finish_bucket(bucket: MetricBucket, request: &ChartRequest) -> MetricGroup {
    let metric = bucket.metric;
    let series = bucket
        .series
        .into_iter()
        .filter(|s| !s.samples.is_empty())
        .map(|s| {
            let name = series_name(request.mode, &s.label, &metric);
            let visible = !request.hidden_series_names.contains(&name);
            tracing::debug!(
                "Series '{}' from {} run(s), {} samples, individualized={}",
                name,
                s.runs.len(),
                s.samples.len(),
                s.individualized
            );
            AggregatedSeries {
                name,
                label: s.label,
                metric: metric.clone(),
                points: normalize(s.samples),
                runs: s.runs,
                visible,
            }
        })
        .collect();

    MetricGroup { metric, series }
}

/// Multi-axis charts repeat workload labels across metrics, so the metric is part of the name.
///
/// Multi-axis names (`label :: metric`) differ from the bare labels older
/// clients stored, so hidden-series names saved by those clients don't match.
pub fn series_name(mode: ChartMode, label: &str, metric: &str) -> String {
    match mode {
        ChartMode::SingleAxis => label.to_string(),
        ChartMode::MultiAxis => format!("{} :: {}", label, metric),
    }
}

fn valid_samples(run: &RunRecord) -> impl Iterator<Item = Sample> + '_ {
    run.samples.iter().copied().filter(move |s| match s.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Dropping invalid sample for run {}: {}", run.id, e);
            false
        }
    })
}
