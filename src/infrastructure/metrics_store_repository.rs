// Metrics store repository implementation (REST proxy over the tracking database)
use crate::application::run_repository::{Experiment, MetricSample, RunRepository, RunSummary};
use crate::domain::sample::RawSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MetricsStoreRepository {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ExperimentRow {
    experiment_id: Value,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RunRow {
    name: String,
    #[serde(default)]
    run_name: Option<String>,
    #[serde(default)]
    experiment_id: Value,
    #[serde(default)]
    workload: Option<String>,
    #[serde(default)]
    letter: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    params: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct MetricKeyRow {
    key: String,
}

#[derive(Debug, Deserialize)]
struct MetricRow {
    name: String,
    #[serde(default)]
    timestamp: Value,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    step: Value,
}

impl MetricsStoreRepository {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build metrics store HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}?{}", self.base_url, path, query)
        }
    }

    async fn execute_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let url = self.build_url(path, params);
        tracing::debug!("Querying metrics store: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to metrics store ({})", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Metrics store {} failed with status {}: {}", path, status, body);
        }

        response
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("Failed to parse metrics store response ({})", path))
    }
}

/// `in.(a,b,c)` filter understood by the store
fn in_list(values: &[String]) -> String {
    format!("in.({})", values.join(","))
}

/// Bigint columns come back as JSON strings, so accept both encodings
fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<RunRow> for RunSummary {
    fn from(row: RunRow) -> Self {
        let params = row
            .params
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, value_as_string(&v)))
            .collect();

        RunSummary {
            display_name: row.run_name.unwrap_or_else(|| row.name.clone()),
            id: row.name,
            experiment_id: value_as_string(&row.experiment_id),
            workload_id: row.workload.unwrap_or_default(),
            letter: row.letter,
            model: row.model,
            source: row.source,
            params,
        }
    }
}

impl From<MetricRow> for MetricSample {
    fn from(row: MetricRow) -> Self {
        MetricSample {
            sample: RawSample {
                timestamp_ms: value_as_i64(&row.timestamp),
                value: value_as_f64(&row.value),
                step: value_as_i64(&row.step),
            },
            run_id: row.name,
        }
    }
}

#[async_trait]
impl RunRepository for MetricsStoreRepository {
    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let rows: Vec<ExperimentRow> = self.execute_get("fe_experiments", &[]).await?;
        Ok(rows
            .into_iter()
            .map(|r| Experiment {
                id: value_as_string(&r.experiment_id),
                name: r.name,
            })
            .collect())
    }

    async fn list_runs(&self, experiment_id: Option<&str>) -> Result<Vec<RunSummary>> {
        let params: Vec<(&str, String)> = experiment_id
            .map(|id| vec![("experiment_id", id.to_string())])
            .unwrap_or_default();
        let rows: Vec<RunRow> = self.execute_get("fe_runs", &params).await?;
        Ok(rows.into_iter().map(RunSummary::from).collect())
    }

    async fn list_available_metrics(&self, run_ids: &[String]) -> Result<Vec<String>> {
        if run_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<MetricKeyRow> = self
            .execute_get("fe_metrics_available", &[("run_uuid", in_list(run_ids))])
            .await?;
        Ok(rows.into_iter().map(|r| r.key).collect())
    }

    async fn query_metric_samples(&self, run_ids: &[String], metric: &str) -> Result<Vec<MetricSample>> {
        if run_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<MetricRow> = self
            .execute_get(
                "fe_metrics",
                &[
                    ("run_uuid", in_list(run_ids)),
                    ("key", format!("eq.{}", metric)),
                ],
            )
            .await?;

        tracing::debug!("Fetched {} samples of {} for {} runs", rows.len(), metric, run_ids.len());
        Ok(rows.into_iter().map(MetricSample::from).collect())
    }
}
