// Streaming panel service - One chart per metric, delivered as each finishes
use crate::application::chart_service::{ChartSelection, ChartService, RunCatalog};
use crate::domain::chart::ChartModel;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelMessage {
    /// Sent first so the client can lay out placeholders
    Skeleton { metrics: Vec<String> },
    Panel { metric: String, chart: ChartModel },
    PanelError {
        metric: String,
        kind: String,
        message: String,
    },
    Complete { panels: usize, duration_ms: i64 },
}

#[derive(Clone)]
pub struct PanelStreamingService {
    chart_service: ChartService,
}

impl PanelStreamingService {
    pub fn new(chart_service: ChartService) -> Self {
        Self { chart_service }
    }

    pub async fn stream_panels(&self, selection: ChartSelection) -> mpsc::Receiver<PanelMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let start_time = Instant::now();

        let mut metrics: Vec<String> = Vec::new();
        for metric in &selection.metrics {
            if !metric.is_empty() && !metrics.contains(metric) {
                metrics.push(metric.clone());
            }
        }

        // 1. Skeleton
        let _ = tx
            .send(PanelMessage::Skeleton {
                metrics: metrics.clone(),
            })
            .await;

        // 2. Panels load in the background so the skeleton goes out first
        let service = self.chart_service.clone();
        tokio::spawn(async move {
            let panels = metrics.len();

            // Run rows and experiment names once for every panel
            let catalog = if metrics.is_empty() {
                Ok(RunCatalog::default())
            } else {
                service.load_catalog(&selection.run_ids).await
            };

            match catalog {
                Ok(catalog) => build_panels(service, Arc::new(catalog), &selection, metrics, &tx).await,
                Err(e) => {
                    tracing::warn!("Loading runs for panels failed: {}", e);
                    let (kind, message) = (e.kind().to_string(), e.to_string());
                    for metric in metrics {
                        let _ = tx
                            .send(PanelMessage::PanelError {
                                metric,
                                kind: kind.clone(),
                                message: message.clone(),
                            })
                            .await;
                    }
                }
            }

            // 3. Completion once every panel is done
            let duration_ms = start_time.elapsed().as_millis() as i64;
            tracing::debug!("Streamed {} panels in {}ms", panels, duration_ms);
            let _ = tx.send(PanelMessage::Complete { panels, duration_ms }).await;
        });

        rx
    }
}

/// One task per metric panel, each sending its panel or error as soon as it's built
async fn build_panels(
    service: ChartService,
    catalog: Arc<RunCatalog>,
    selection: &ChartSelection,
    metrics: Vec<String>,
    tx: &mpsc::Sender<PanelMessage>,
) {
    let mut handles = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let tx = tx.clone();
        let service = service.clone();
        let catalog = Arc::clone(&catalog);
        let panel_selection = selection.for_metric(&metric);

        handles.push(tokio::spawn(async move {
            let msg = match service.build_chart_with(&catalog, &panel_selection).await {
                Ok(chart) => PanelMessage::Panel { metric, chart },
                Err(e) => {
                    tracing::warn!("Panel for metric {} failed: {}", metric, e);
                    PanelMessage::PanelError {
                        metric,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
            };
            let _ = tx.send(msg).await;
        }));
    }

    for result in join_all(handles).await {
        if let Err(e) = result {
            tracing::error!("Panel task panicked: {}", e);
        }
    }
}
