// Chart service - Use case for building charts from stored runs
use crate::application::chart_builder;
use crate::application::run_repository::{Experiment, RunRepository, RunSummary};
use crate::domain::chart::{ChartMode, ChartModel, ChartRange, ChartRequest};
use crate::domain::error::ChartError;
use crate::domain::run::RunRecord;
use crate::domain::sample::{RawSample, ingest_samples};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Per-chart view state owned by the client and sent with every request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(default)]
    pub shown_runs: BTreeSet<String>,
    #[serde(default)]
    pub hidden_series: BTreeSet<String>,
    #[serde(default)]
    pub smoothing: u8,
    #[serde(default)]
    pub monochrome: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub range: Option<ChartRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSelection {
    #[serde(default)]
    pub run_ids: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub mode: ChartMode,
    #[serde(default)]
    pub view: ViewState,
}

impl ChartSelection {
    pub fn to_request(&self, runs: Vec<RunRecord>) -> ChartRequest {
        ChartRequest {
            mode: self.mode,
            runs,
            shown_runs_override: self.view.shown_runs.clone(),
            hidden_series_names: self.view.hidden_series.clone(),
            smoothing_pct: self.view.smoothing,
            monochrome: self.view.monochrome,
            explicit_title: self.view.title.clone(),
            range: self.view.range,
        }
    }

    /// Same runs and view, narrowed to a single metric on a single axis
    pub fn for_metric(&self, metric: &str) -> ChartSelection {
        ChartSelection {
            run_ids: self.run_ids.clone(),
            metrics: vec![metric.to_string()],
            mode: ChartMode::SingleAxis,
            view: self.view.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.metrics.is_empty() {
            return Err(ServiceError::InvalidSelection(
                "at least one metric is required".to_string(),
            ));
        }
        if self.metrics.iter().any(|m| m.is_empty()) {
            return Err(ServiceError::InvalidSelection(
                "metric names must not be empty".to_string(),
            ));
        }
        if self.mode == ChartMode::SingleAxis && self.metrics.len() > 1 {
            return Err(ServiceError::InvalidSelection(format!(
                "single-axis charts take one metric, got {}",
                self.metrics.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("Metrics store error: {0:#}")]
    Repository(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidSelection(_) => "InvalidSelection",
            ServiceError::Chart(e) => e.kind(),
            ServiceError::Repository(_) => "Repository",
        }
    }
}

#[derive(Clone)]
pub struct ChartService {
    repository: Arc<dyn RunRepository>,
}

impl ChartService {
    pub fn new(repository: Arc<dyn RunRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_experiments(&self) -> anyhow::Result<Vec<Experiment>> {
        self.repository.list_experiments().await
    }

    pub async fn list_runs(&self, experiment_id: Option<&str>) -> anyhow::Result<Vec<RunSummary>> {
        self.repository.list_runs(experiment_id).await
    }

    pub async fn available_metrics(&self, run_ids: &[String]) -> anyhow::Result<Vec<String>> {
        if run_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repository.list_available_metrics(run_ids).await
    }

    /// Fetch the selected runs and build their chart
    pub async fn build_chart(&self, selection: &ChartSelection) -> Result<ChartModel, ServiceError> {
        selection.validate()?;
        let catalog = self.load_catalog(&selection.run_ids).await?;
        self.build_chart_with(&catalog, selection).await
    }

    /// Build a chart against an already loaded catalog, fetching only samples
    pub async fn build_chart_with(
        &self,
        catalog: &RunCatalog,
        selection: &ChartSelection,
    ) -> Result<ChartModel, ServiceError> {
        selection.validate()?;

        let runs = self.records_for(catalog, &selection.metrics).await?;
        let request = selection.to_request(runs);
        Ok(chart_builder::build_chart(&request)?)
    }

    /// Resolve the selected run ids against the store's run rows and experiment names.
    ///
    /// The store can only filter runs by experiment, so this reads the whole
    /// run list. Callers building several charts for one selection should load
    /// the catalog once and reuse it.
    pub async fn load_catalog(&self, run_ids: &[String]) -> Result<RunCatalog, ServiceError> {
        let mut ids: Vec<&String> = Vec::with_capacity(run_ids.len());
        for id in run_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Ok(RunCatalog::default());
        }

        let (summaries, experiments) = tokio::try_join!(
            self.repository.list_runs(None),
            self.repository.list_experiments()
        )?;

        let mut by_id: HashMap<String, RunSummary> =
            summaries.into_iter().map(|r| (r.id.clone(), r)).collect();
        let mut runs = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id.as_str()) {
                Some(summary) => runs.push(summary),
                None => tracing::warn!("Selected run {} not found in metrics store", id),
            }
        }

        Ok(RunCatalog {
            runs,
            experiment_names: experiments.into_iter().map(|e| (e.id, e.name)).collect(),
        })
    }

    /// Join run rows, experiment names and metric samples into one record per run and metric.
    pub async fn load_records(
        &self,
        run_ids: &[String],
        metrics: &[String],
    ) -> Result<Vec<RunRecord>, ServiceError> {
        let catalog = self.load_catalog(run_ids).await?;
        self.records_for(&catalog, metrics).await
    }

    /// Records come out metric-major, in selection order, so multi-axis charts
    /// lay out their axes in the order the metrics were picked.
    pub async fn records_for(
        &self,
        catalog: &RunCatalog,
        metrics: &[String],
    ) -> Result<Vec<RunRecord>, ServiceError> {
        if catalog.runs.is_empty() {
            return Ok(Vec::new());
        }

        let ids = catalog.run_ids();
        let sample_sets = try_join_all(
            metrics
                .iter()
                .map(|metric| self.repository.query_metric_samples(&ids, metric)),
        )
        .await?;

        let mut records = Vec::with_capacity(catalog.runs.len() * metrics.len());
        for (metric, rows) in metrics.iter().zip(sample_sets) {
            let mut raw_by_run: HashMap<String, Vec<RawSample>> = HashMap::new();
            for row in rows {
                raw_by_run.entry(row.run_id).or_default().push(row.sample);
            }

            for summary in &catalog.runs {
                let raw = raw_by_run.remove(&summary.id).unwrap_or_default();
                let samples = ingest_samples(raw, &summary.id);
                records.push(RunRecord {
                    id: summary.id.clone(),
                    display_name: summary.display_name.clone(),
                    experiment_name: catalog.experiment_name(&summary.experiment_id),
                    workload: summary.workload_id.as_str().into(),
                    letter: summary.letter.clone(),
                    model: summary.model.clone(),
                    source: summary.source.clone(),
                    params: summary.params.clone(),
                    metric: metric.clone(),
                    samples,
                });
            }
        }

        tracing::debug!(
            "Loaded {} run records for {} runs and {} metrics",
            records.len(),
            catalog.runs.len(),
            metrics.len()
        );
        Ok(records)
    }
}

/// Selected run rows, in selection order, plus experiment names by id
#[derive(Debug, Clone, Default)]
pub struct RunCatalog {
    pub runs: Vec<RunSummary>,
    pub experiment_names: HashMap<String, String>,
}

impl RunCatalog {
    pub fn run_ids(&self) -> Vec<String> {
        self.runs.iter().map(|r| r.id.clone()).collect()
    }

    /// Falls back to the id for experiments the store doesn't list
    pub fn experiment_name(&self, experiment_id: &str) -> String {
        self.experiment_names
            .get(experiment_id)
            .cloned()
            .unwrap_or_else(|| experiment_id.to_string())
    }
}
