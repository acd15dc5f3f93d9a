// Series grouping and label resolution
use crate::domain::run::WorkloadId;

/// Characters of the run identifier shown in individualized labels
const RUN_SUFFIX_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesKey {
    /// Grouping key, which doubles as the display label
    pub label: String,
    /// True when the run is shown as its own series
    pub individualized: bool,
}

/// Decide which series a run merges into and how that series is labelled.
///
/// Runs of a workload are merged under the verbatim workload id unless the
/// workload was never assigned a subgroup (`<group>-null`) or the caller asked
/// to expand it. Individualized runs are labelled from the workload, the
/// run letter and a short prefix of the run identifier:
///
/// - no letter: `group (abcde)`
/// - multi-character letter: `workload letter`
/// - single-character letter: `workload letter (abcde)`
pub fn resolve_series_key(
    workload: &WorkloadId,
    letter: Option<&str>,
    run_identifier: &str,
    expand_requested: bool,
) -> SeriesKey {
    let individualized = workload.is_unassigned() || expand_requested;
    if !individualized {
        return SeriesKey {
            label: workload.as_str().to_string(),
            individualized,
        };
    }

    let label = match letter.filter(|l| !l.is_empty()) {
        None => format!("{} ({})", workload.group(), short_id(run_identifier)),
        Some(letter) if letter.chars().count() > 1 => format!("{} {}", workload, letter),
        Some(letter) => format!("{} {} ({})", workload, letter, short_id(run_identifier)),
    };

    SeriesKey {
        label,
        individualized,
    }
}

fn short_id(run_identifier: &str) -> String {
    run_identifier.chars().take(RUN_SUFFIX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(workload: &str, letter: Option<&str>, run: &str, expand: bool) -> SeriesKey {
        resolve_series_key(&WorkloadId::new(workload), letter, run, expand)
    }

    #[test]
    fn test_assigned_workload_merges() {
        let k = key("resnet-1", Some("a"), "9f8e7d6c", false);
        assert_eq!(k.label, "resnet-1");
        assert!(!k.individualized);
    }

    #[test]
    fn test_unassigned_without_letter() {
        let k = key("resnet-null", None, "9f8e7d6c", false);
        assert_eq!(k.label, "resnet (9f8e7)");
        assert!(k.individualized);

        // empty letter behaves like a missing one
        let k = key("resnet-null", Some(""), "9f8e7d6c", false);
        assert_eq!(k.label, "resnet (9f8e7)");
    }

    #[test]
    fn test_expanded_without_dash_uses_full_id() {
        let k = key("solo", None, "abcdefgh", true);
        assert_eq!(k.label, "solo (abcde)");
    }

    #[test]
    fn test_multi_char_letter_has_no_run_suffix() {
        let k = key("bert-2", Some("warmup"), "abcdefgh", true);
        assert_eq!(k.label, "bert-2 warmup");
    }

    #[test]
    fn test_single_char_letter_keeps_run_suffix() {
        let k = key("bert-2", Some("b"), "abcdefgh", true);
        assert_eq!(k.label, "bert-2 b (abcde)");

        let k = key("bert-null", Some("c"), "xyz", false);
        assert_eq!(k.label, "bert-null c (xyz)");
    }

    #[test]
    fn test_short_id_counts_chars() {
        assert_eq!(short_id("ééééééé"), "ééééé");
        assert_eq!(short_id("ab"), "ab");
    }
}
