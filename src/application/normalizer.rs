// Time series normalization - ordering and elapsed-time re-zeroing
use crate::domain::chart::TimeSeriesPoint;
use crate::domain::sample::Sample;

const MS_PER_DAY: i64 = 86_400_000;

/// Stable sort, so samples sharing a timestamp keep their input order.
pub fn sort_by_timestamp(samples: &mut [Sample]) {
    samples.sort_by_key(|s| s.timestamp_ms);
}

pub fn to_elapsed(samples: &[Sample], origin_ms: i64) -> Vec<TimeSeriesPoint> {
    samples
        .iter()
        .map(|s| TimeSeriesPoint::new(s.timestamp_ms - origin_ms, s.value))
        .collect()
}

/// Sort a merged sample set and re-zero it to its own earliest timestamp
pub fn normalize(mut samples: Vec<Sample>) -> Vec<TimeSeriesPoint> {
    sort_by_timestamp(&mut samples);
    match samples.first() {
        Some(first) => to_elapsed(&samples, first.timestamp_ms),
        None => Vec::new(),
    }
}

/// Axis label for an elapsed duration: `HH:MM:SS`, with a `Nd ` prefix past one day
pub fn format_elapsed(elapsed_ms: i64) -> String {
    let elapsed_ms = elapsed_ms.max(0);
    let days = elapsed_ms / MS_PER_DAY;
    let clock = chrono::DateTime::from_timestamp_millis(elapsed_ms)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string());

    if days > 0 {
        format!("{}d {}", days, clock)
    } else {
        clock
    }
}
