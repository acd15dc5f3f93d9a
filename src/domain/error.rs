// Chart engine errors

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChartError {
    #[error("Monochrome mode supports at most {limit} series, chart has {count}")]
    MonochromeSeriesLimitExceeded { count: usize, limit: usize },
}

impl ChartError {
    /// Stable identifier used in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::MonochromeSeriesLimitExceeded { .. } => "MonochromeSeriesLimitExceeded",
        }
    }
}
