// Exponential moving average smoothing
use crate::domain::chart::TimeSeriesPoint;

pub const MAX_SMOOTHING_PCT: u8 = 99;

/// EMA over the point values; x-values are kept as-is.
///
/// `pct` is the weight given to the previous smoothed value, in percent.
/// Each step is rounded to 4 decimal places. `pct == 0` is the identity.
pub fn smooth(points: &[TimeSeriesPoint], pct: u8) -> Vec<TimeSeriesPoint> {
    let pct = pct.min(MAX_SMOOTHING_PCT);
    if pct == 0 || points.is_empty() {
        return points.to_vec();
    }

    let alpha = f64::from(pct) / 100.0;
    let mut smoothed = Vec::with_capacity(points.len());
    let mut prev = points[0].value;
    smoothed.push(points[0]);

    for p in &points[1..] {
        let value = round4(p.value * (1.0 - alpha) + prev * alpha);
        smoothed.push(TimeSeriesPoint::new(p.elapsed_ms, value));
        prev = value;
    }

    smoothed
}

/// Rounds the exact stored value to 4 decimals, ties away from zero.
///
/// Scaling first would round `2.00005` (stored just below the tie) up, so the
/// decimal expansion is rounded instead. `{:.4}` breaks exact ties to even;
/// those are multiples of 1/32 and get pushed up explicitly.
fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let magnitude = value.abs();
    let scaled = magnitude * 10_000.0;
    let exact_tie = (magnitude * 32.0).fract() == 0.0 && scaled.fract() == 0.5;
    let rounded = if exact_tie {
        scaled.ceil() / 10_000.0
    } else {
        format!("{:.4}", magnitude).parse().unwrap_or(magnitude)
    };
    rounded.copysign(value)
}
