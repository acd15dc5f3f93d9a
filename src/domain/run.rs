// Run domain model
use super::sample::{Sample, deserialize_samples};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Subgroup value for runs that were never assigned to a sub-bucket
pub const UNASSIGNED_SUBGROUP: &str = "null";

/// Workload identifier of the form `<group>-<subgroup>`, parsed once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct WorkloadId {
    raw: String,
    // byte offset of the first '-'
    dash: Option<usize>,
}

impl WorkloadId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let dash = raw.find('-');
        Self { raw, dash }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Text before the first `-`, or the whole id when there is none
    pub fn group(&self) -> &str {
        match self.dash {
            Some(i) => &self.raw[..i],
            None => &self.raw,
        }
    }

    /// Text after the first `-`, or empty when there is none
    pub fn subgroup(&self) -> &str {
        match self.dash {
            Some(i) => &self.raw[i + 1..],
            None => "",
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.subgroup() == UNASSIGNED_SUBGROUP
    }
}

impl From<String> for WorkloadId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for WorkloadId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<WorkloadId> for String {
    fn from(id: WorkloadId) -> Self {
        id.raw
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub experiment_name: String,
    #[serde(rename = "workloadId")]
    pub workload: WorkloadId,
    #[serde(default)]
    pub letter: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub metric: String,
    #[serde(default, deserialize_with = "deserialize_samples")]
    pub samples: Vec<Sample>,
}

impl RunRecord {
    pub fn new(
        id: impl Into<String>,
        workload: impl Into<WorkloadId>,
        metric: impl Into<String>,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            experiment_name: String::new(),
            workload: workload.into(),
            letter: None,
            model: None,
            source: None,
            params: BTreeMap::new(),
            metric: metric.into(),
            samples,
        }
    }

    pub fn with_letter(mut self, letter: impl Into<String>) -> Self {
        self.letter = Some(letter.into());
        self
    }

    pub fn with_experiment(mut self, experiment_name: impl Into<String>) -> Self {
        self.experiment_name = experiment_name.into();
        self
    }

    /// Letter with empty strings treated as absent
    pub fn letter(&self) -> Option<&str> {
        self.letter.as_deref().filter(|l| !l.is_empty())
    }

    pub fn metadata(&self) -> RunMetadata {
        RunMetadata {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            experiment_name: self.experiment_name.clone(),
            workload_id: self.workload.as_str().to_string(),
            letter: self.letter().map(str::to_string),
            model: self.model.clone(),
            source: self.source.clone(),
            params: self.params.clone(),
            metric: self.metric.clone(),
        }
    }
}

/// Run attributes carried on a rendered series, without the samples
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub id: String,
    pub display_name: String,
    pub experiment_name: String,
    pub workload_id: String,
    pub letter: Option<String>,
    pub model: Option<String>,
    pub source: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metric: String,
}

impl RunMetadata {
    /// Params rendered as `key:value` pairs in key order
    pub fn params_label(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_parts() {
        let id = WorkloadId::new("resnet-3");
        assert_eq!(id.group(), "resnet");
        assert_eq!(id.subgroup(), "3");
        assert!(!id.is_unassigned());

        let id = WorkloadId::new("resnet-null");
        assert!(id.is_unassigned());

        // only the first dash splits
        let id = WorkloadId::new("a-b-c");
        assert_eq!(id.group(), "a");
        assert_eq!(id.subgroup(), "b-c");

        let id = WorkloadId::new("plain");
        assert_eq!(id.group(), "plain");
        assert_eq!(id.subgroup(), "");
    }

    #[test]
    fn test_run_record_defaults() {
        let json = r#"{
            "id": "4f1c2e9a",
            "workloadId": "bert-2",
            "letter": "",
            "samples": [{"timestampMs": 10, "value": 0.5, "step": 1}]
        }"#;
        let run: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(run.workload.as_str(), "bert-2");
        assert_eq!(run.letter(), None);
        assert!(run.params.is_empty());
        assert_eq!(run.samples.len(), 1);
        assert_eq!(run.metadata().letter, None);
    }

    #[test]
    fn test_params_label() {
        let mut run = RunRecord::new("r1", "a-1", "loss", vec![]);
        run.params.insert("lr".to_string(), "0.1".to_string());
        run.params.insert("batch".to_string(), "32".to_string());
        assert_eq!(run.metadata().params_label(), "batch:32 lr:0.1");
    }
}
