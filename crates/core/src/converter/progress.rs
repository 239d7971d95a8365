//! Progress parsing from ffmpeg's diagnostic stream.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::time::Duration;

use super::types::ConversionProgress;
use crate::timecode::parse_timestamp;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration: (\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid duration regex")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid time regex")
});

static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"speed=\s*(\d+(?:\.\d+)?)x").expect("valid speed regex"));

/// Turns diagnostic lines into progress events for one run.
///
/// The expected length is derived from the arguments and from the
/// `Duration:` announcements of the inputs:
/// - a `-t` limit and a known source: the shorter of the limit and
///   the source remaining after `-ss`;
/// - only a `-t` limit: the limit;
/// - only a source: the source minus `-ss`.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    limit: Option<Duration>,
    offset: Option<Duration>,
    source: Option<Duration>,
    position: Duration,
}

impl ProgressTracker {
    /// Reads `-t` (tightest wins) and `-ss` (furthest wins) from an argv.
    pub fn from_args(args: &[String]) -> Self {
        let mut tracker = Self::default();

        for pair in args.windows(2) {
            let Some(value) = parse_timestamp(&pair[1]) else {
                continue;
            };
            match pair[0].as_str() {
                "-t" => tracker.limit = Some(tracker.limit.map_or(value, |l| l.min(value))),
                "-ss" => tracker.offset = Some(tracker.offset.map_or(value, |o| o.max(value))),
                _ => {}
            }
        }

        tracker
    }

    /// Expected output length, `Duration::ZERO` when unknown.
    pub fn total(&self) -> Duration {
        let remaining = self
            .source
            .map(|s| s.saturating_sub(self.offset.unwrap_or_default()));
        match (self.limit, remaining) {
            (Some(limit), Some(remaining)) => limit.min(remaining),
            (Some(limit), None) => limit,
            (None, Some(remaining)) => remaining,
            (None, None) => Duration::ZERO,
        }
    }

    /// Feeds one diagnostic line; returns an event when it carries a position.
    pub fn feed(&mut self, line: &str) -> Option<ConversionProgress> {
        if let Some(caps) = DURATION_RE.captures(line) {
            if let Some(duration) = captured_duration(&caps) {
                // Several inputs announce several lengths; the longest bounds the output.
                self.source = Some(self.source.map_or(duration, |s| s.max(duration)));
            }
        }

        let position = TIME_RE.captures(line).and_then(|c| captured_duration(&c))?;
        self.position = self.position.max(position);

        let speed = SPEED_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        Some(ConversionProgress {
            position: self.position,
            total: self.total(),
            speed,
        })
    }
}

fn captured_duration(caps: &Captures<'_>) -> Option<Duration> {
    let hours: u64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::try_from_secs_f64(seconds).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "  Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s";
    const LINE: &str =
        "frame=  250 fps=50 q=28.0 size=1024kB time=00:00:10.00 bitrate=838.9kbits/s speed=2.01x";

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_total_from_source() {
        let mut tracker = ProgressTracker::from_args(&args("-i a.mp4 b.mp4"));
        assert!(tracker.feed(HEADER).is_none());
        let progress = tracker.feed(LINE).unwrap();
        assert_eq!(progress.position, Duration::from_secs(10));
        assert_eq!(progress.total, Duration::from_secs(100));
        assert_eq!(progress.speed, Some(2.01));
    }

    #[test]
    fn test_seek_is_subtracted_from_source() {
        let mut tracker = ProgressTracker::from_args(&args("-ss 00:00:30.000 -i a.mp4 b.mp4"));
        tracker.feed(HEADER);
        assert_eq!(tracker.total(), Duration::from_secs(70));
    }

    #[test]
    fn test_limit_caps_total() {
        let mut tracker = ProgressTracker::from_args(&args("-i a.mp4 -t 00:00:20.000 b.mp4"));
        assert_eq!(tracker.total(), Duration::from_secs(20));
        tracker.feed(HEADER);
        assert_eq!(tracker.total(), Duration::from_secs(20));

        let mut short = ProgressTracker::from_args(&args("-ss 95 -i a.mp4 -t 20 b.mp4"));
        short.feed(HEADER);
        assert_eq!(short.total(), Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_duration_is_ignored() {
        let mut tracker = ProgressTracker::from_args(&[]);
        tracker.feed("  Duration: N/A, bitrate: N/A");
        let progress = tracker.feed(LINE).unwrap();
        assert_eq!(progress.total, Duration::ZERO);
        assert_eq!(progress.percent(), None);
    }

    #[test]
    fn test_position_never_decreases() {
        let mut tracker = ProgressTracker::default();
        tracker.feed("time=00:00:05.00");
        let progress = tracker.feed("time=00:00:04.50").unwrap();
        assert_eq!(progress.position, Duration::from_secs(5));
    }

    #[test]
    fn test_negative_time_is_not_progress() {
        let mut tracker = ProgressTracker::default();
        assert!(tracker.feed("size=0kB time=-00:00:00.04 bitrate=N/A").is_none());
    }

    #[test]
    fn test_out_of_range_values_are_ignored() {
        let mut tracker = ProgressTracker::from_args(&args("-i a.mp4 -t 1e30 -ss 99999999999999999999 b.mp4"));
        assert_eq!(tracker.total(), Duration::ZERO);

        assert!(tracker.feed("time=99999999999999999999:00:00.00").is_none());
        tracker.feed("  Duration: 99999999999999999999:00:00.00, start: 0.000000");
        let progress = tracker.feed(LINE).unwrap();
        assert_eq!(progress.position, Duration::from_secs(10));
        assert_eq!(progress.total, Duration::ZERO);
    }
}
