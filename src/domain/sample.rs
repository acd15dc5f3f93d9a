// Metric sample domain model
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
    pub step: i64,
}

impl Sample {
    pub fn new(timestamp_ms: i64, value: f64, step: i64) -> Self {
        Self {
            timestamp_ms,
            value,
            step,
        }
    }

    /// Reject samples the aggregator can't place on a time axis
    pub fn validate(&self) -> Result<(), InvalidSample> {
        if self.timestamp_ms < 0 {
            return Err(InvalidSample::NegativeTimestamp(self.timestamp_ms));
        }
        if !self.value.is_finite() {
            return Err(InvalidSample::NonFiniteValue {
                timestamp_ms: self.timestamp_ms,
                value: self.value,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidSample {
    #[error("sample has no timestamp")]
    MissingTimestamp,

    #[error("sample at {0} has no value")]
    MissingValue(i64),

    #[error("negative timestamp {0}")]
    NegativeTimestamp(i64),

    #[error("non-finite value {value} at {timestamp_ms}")]
    NonFiniteValue { timestamp_ms: i64, value: f64 },
}

/// Sample as it arrives over the wire, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub step: Option<i64>,
}

impl TryFrom<RawSample> for Sample {
    type Error = InvalidSample;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        let timestamp_ms = raw.timestamp_ms.ok_or(InvalidSample::MissingTimestamp)?;
        let value = raw.value.ok_or(InvalidSample::MissingValue(timestamp_ms))?;
        let sample = Sample::new(timestamp_ms, value, raw.step.unwrap_or(0));
        sample.validate()?;
        Ok(sample)
    }
}

/// Convert raw samples, dropping the ones that fail validation.
pub fn ingest_samples(raw: Vec<RawSample>, run_id: &str) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(raw.len());
    for r in raw {
        match Sample::try_from(r) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                tracing::debug!("Dropping invalid sample for run {}: {}", run_id, e);
            }
        }
    }
    samples
}

/// serde helper for sample lists: a bad sample is dropped instead of failing the whole payload
pub fn deserialize_samples<'de, D>(deserializer: D) -> Result<Vec<Sample>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawSample>::deserialize(deserializer)?;
    Ok(ingest_samples(raw, "<request>"))
}
