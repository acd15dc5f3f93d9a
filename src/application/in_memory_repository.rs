// In-memory repository used by the service tests
use crate::application::run_repository::{Experiment, MetricSample, RunRepository, RunSummary};
use crate::domain::sample::RawSample;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemoryRunRepository {
    pub experiments: Vec<Experiment>,
    pub runs: Vec<RunSummary>,
    // (run id, metric) -> samples
    pub samples: BTreeMap<(String, String), Vec<RawSample>>,
    pub fail_queries: AtomicBool,
    pub run_list_calls: AtomicUsize,
}

impl InMemoryRunRepository {
    pub fn with_experiment(mut self, id: &str, name: &str) -> Self {
        self.experiments.push(Experiment {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_run(mut self, id: &str, experiment_id: &str, workload: &str, letter: Option<&str>) -> Self {
        self.runs.push(RunSummary {
            id: id.to_string(),
            display_name: format!("run {}", id),
            experiment_id: experiment_id.to_string(),
            workload_id: workload.to_string(),
            letter: letter.map(str::to_string),
            model: Some("resnet50".to_string()),
            source: Some("imagenet".to_string()),
            params: BTreeMap::new(),
        });
        self
    }

    pub fn with_samples(mut self, run_id: &str, metric: &str, points: &[(i64, f64)]) -> Self {
        let raw = points
            .iter()
            .enumerate()
            .map(|(i, &(t, v))| RawSample {
                timestamp_ms: Some(t),
                value: Some(v),
                step: Some(i as i64),
            })
            .collect();
        self.samples
            .insert((run_id.to_string(), metric.to_string()), raw);
        self
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            anyhow::bail!("metrics store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn list_experiments(&self) -> anyhow::Result<Vec<Experiment>> {
        self.check()?;
        Ok(self.experiments.clone())
    }

    async fn list_runs(&self, experiment_id: Option<&str>) -> anyhow::Result<Vec<RunSummary>> {
        self.run_list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .runs
            .iter()
            .filter(|r| experiment_id.is_none_or(|id| r.experiment_id == id))
            .cloned()
            .collect())
    }

    async fn list_available_metrics(&self, run_ids: &[String]) -> anyhow::Result<Vec<String>> {
        self.check()?;
        let mut metrics: Vec<String> = Vec::new();
        for (run_id, metric) in self.samples.keys() {
            if run_ids.contains(run_id) && !metrics.contains(metric) {
                metrics.push(metric.clone());
            }
        }
        Ok(metrics)
    }

    async fn query_metric_samples(
        &self,
        run_ids: &[String],
        metric: &str,
    ) -> anyhow::Result<Vec<MetricSample>> {
        self.check()?;
        let mut rows = Vec::new();
        for ((run_id, m), samples) in &self.samples {
            if m == metric && run_ids.contains(run_id) {
                rows.extend(samples.iter().map(|s| MetricSample {
                    run_id: run_id.clone(),
                    sample: s.clone(),
                }));
            }
        }
        Ok(rows)
    }
}
