// Repository trait for experiment/run/metric data access
use crate::domain::sample::RawSample;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    pub name: String,
}

/// Run row as stored, without samples
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: String,
    pub display_name: String,
    pub experiment_id: String,
    pub workload_id: String,
    pub letter: Option<String>,
    pub model: Option<String>,
    pub source: Option<String>,
    pub params: BTreeMap<String, String>,
}

/// One stored sample of one metric for one run
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub run_id: String,
    pub sample: RawSample,
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// List all experiments
    async fn list_experiments(&self) -> anyhow::Result<Vec<Experiment>>;

    /// List runs, optionally restricted to one experiment
    async fn list_runs(&self, experiment_id: Option<&str>) -> anyhow::Result<Vec<RunSummary>>;

    /// Metric keys recorded for any of the given runs
    async fn list_available_metrics(&self, run_ids: &[String]) -> anyhow::Result<Vec<String>>;

    /// All samples of one metric for the given runs
    async fn query_metric_samples(
        &self,
        run_ids: &[String],
        metric: &str,
    ) -> anyhow::Result<Vec<MetricSample>>;
}
