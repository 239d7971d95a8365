//! Conversions between [`Duration`] and the textual forms ffmpeg accepts and prints.

use std::time::Duration;

/// Formats a duration as `HH:MM:SS.mmm`.
pub fn format_timestamp(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Parses `HH:MM:SS[.frac]`, `MM:SS[.frac]` or plain seconds (`"12.5"`).
///
/// Returns `None` for negative, non-finite, malformed or out-of-range input.
pub fn parse_timestamp(value: &str) -> Option<Duration> {
    let parts = value
        .trim()
        .split(':')
        .map(|p| p.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;

    if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return None;
    }

    let seconds = match parts.as_slice() {
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        [m, s] => m * 60.0 + s,
        [s] => *s,
        _ => return None,
    };

    Duration::try_from_secs_f64(seconds).ok()
}

/// Formats a float with at most four decimals and no trailing zeros.
///
/// `2.0` becomes `"2"`, `0.75` stays `"0.75"`, `0.95000000001` becomes `"0.95"`.
pub fn format_decimal(value: f64) -> String {
    let text = format!("{:.4}", value);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
