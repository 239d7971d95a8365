//! ffprobe adapter.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::types::{AudioStreamInfo, MediaInfo, SubtitleStreamInfo, VideoStreamInfo};
use crate::converter::ConverterError;

/// Runs ffprobe and turns its JSON into [`MediaInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prober {
    ffprobe_path: PathBuf,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(PathBuf::from("ffprobe"))
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: String,
    codec_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ProbeStream {
    fn codec(&self) -> String {
        self.codec_name
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn flag(&self, name: &str) -> bool {
        self.disposition.get(name).copied().unwrap_or(0) != 0
    }

    fn tag(&self, name: &str) -> Option<String> {
        self.tags.get(name).cloned()
    }

    fn duration_or(&self, fallback: Duration) -> Duration {
        self.duration
            .as_deref()
            .and_then(parse_seconds)
            .unwrap_or(fallback)
    }
}

impl Prober {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }

    /// Probes `path` for container and stream metadata.
    pub async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), "Probing media file");
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse(path, &String::from_utf8_lossy(&output.stdout))
    }

    /// Parses ffprobe's `-print_format json -show_format -show_streams` output.
    pub fn parse(path: &Path, json: &str) -> Result<MediaInfo, ConverterError> {
        let probe: ProbeOutput =
            serde_json::from_str(json).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration = probe
            .format
            .duration
            .as_deref()
            .and_then(parse_seconds)
            .unwrap_or_default();

        let format = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown")
            .to_string();

        let mut info = MediaInfo {
            path: path.to_path_buf(),
            format,
            size_bytes: parse_number(probe.format.size.as_deref()).unwrap_or(0),
            duration,
            bit_rate: parse_number(probe.format.bit_rate.as_deref()),
            video_streams: Vec::new(),
            audio_streams: Vec::new(),
            subtitle_streams: Vec::new(),
        };

        for stream in &probe.streams {
            match stream.codec_type.as_str() {
                "video" => {
                    let width = stream.width.unwrap_or(0);
                    let height = stream.height.unwrap_or(0);
                    info.video_streams.push(VideoStreamInfo {
                        index: stream.index,
                        codec: stream.codec(),
                        width,
                        height,
                        frame_rate: stream
                            .r_frame_rate
                            .as_deref()
                            .and_then(parse_frame_rate)
                            .unwrap_or(0.0),
                        ratio: aspect_ratio(width, height),
                        duration: stream.duration_or(duration),
                        bit_rate: parse_number(stream.bit_rate.as_deref()),
                        pixel_format: stream.pix_fmt.clone(),
                        default: stream.flag("default"),
                        forced: stream.flag("forced"),
                        language: stream.tag("language"),
                        title: stream.tag("title"),
                    });
                }
                "audio" => info.audio_streams.push(AudioStreamInfo {
                    index: stream.index,
                    codec: stream.codec(),
                    duration: stream.duration_or(duration),
                    bit_rate: parse_number(stream.bit_rate.as_deref()),
                    channels: stream.channels,
                    sample_rate: parse_number(stream.sample_rate.as_deref())
                        .and_then(|r| u32::try_from(r).ok()),
                    default: stream.flag("default"),
                    forced: stream.flag("forced"),
                    language: stream.tag("language"),
                    title: stream.tag("title"),
                }),
                "subtitle" => info.subtitle_streams.push(SubtitleStreamInfo {
                    index: stream.index,
                    codec: stream.codec(),
                    default: stream.flag("default"),
                    forced: stream.flag("forced"),
                    language: stream.tag("language"),
                    title: stream.tag("title"),
                }),
                // data and attachment streams are not modelled
                _ => {}
            }
        }

        Ok(info)
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let secs = value.parse::<f64>().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

fn parse_number(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.parse::<u64>().ok())
}

/// Parses a frame rate like "24000/1001" or "30".
fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            if den > 0.0 {
                Some(num / den)
            } else {
                None
            }
        }
        None => value.parse::<f64>().ok(),
    }
}

/// Display aspect ratio reduced by the greatest common divisor, e.g. "16:9".
fn aspect_ratio(width: u32, height: u32) -> Option<String> {
    if width == 0 || height == 0 {
        return None;
    }
    let divisor = gcd(width, height);
    Some(format!("{}:{}", width / divisor, height / divisor))
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "format": {
                "filename": "test.flac",
                "format_name": "flac",
                "duration": "180.5",
                "size": "30000000",
                "bit_rate": "1329639"
            },
            "streams": [
                {
                    "index": 0,
                    "codec_type": "audio",
                    "codec_name": "flac",
                    "sample_rate": "44100",
                    "channels": 2,
                    "disposition": {"default": 1, "forced": 0}
                }
            ]
        }"#;

        let info = Prober::parse(Path::new("test.flac"), json).unwrap();
        assert_eq!(info.format, "flac");
        assert_eq!(info.duration, Duration::from_secs_f64(180.5));
        assert_eq!(info.size_bytes, 30000000);
        assert_eq!(info.bit_rate, Some(1329639));

        let audio = &info.audio_streams[0];
        assert_eq!(audio.codec, "flac");
        assert_eq!(audio.sample_rate, Some(44100));
        assert_eq!(audio.channels, Some(2));
        assert_eq!(audio.duration, info.duration);
        assert!(audio.default);
        assert!(!audio.forced);
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "filename": "test.mkv",
                "format_name": "matroska,webm",
                "duration": "7200.0",
                "size": "5000000000"
            },
            "streams": [
                {
                    "index": 0,
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "24000/1001",
                    "pix_fmt": "yuv420p",
                    "duration": "7199.5"
                },
                {
                    "index": 1,
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "bit_rate": "192000",
                    "sample_rate": "48000",
                    "channels": 6,
                    "tags": {"language": "eng", "title": "Surround"}
                },
                {
                    "index": 2,
                    "codec_type": "subtitle",
                    "codec_name": "subrip",
                    "disposition": {"default": 0, "forced": 1},
                    "tags": {"language": "ita"}
                },
                {
                    "index": 3,
                    "codec_type": "attachment"
                }
            ]
        }"#;

        let info = Prober::parse(Path::new("test.mkv"), json).unwrap();
        assert_eq!(info.format, "matroska");

        let video = &info.video_streams[0];
        assert_eq!(video.codec, "h264");
        assert_eq!((video.width, video.height), (1920, 1080));
        assert!((video.frame_rate - 23.976).abs() < 0.01);
        assert_eq!(video.ratio.as_deref(), Some("16:9"));
        assert_eq!(video.duration, Duration::from_secs_f64(7199.5));
        assert_eq!(video.pixel_format.as_deref(), Some("yuv420p"));

        let audio = &info.audio_streams[0];
        assert_eq!(audio.index, 1);
        assert_eq!(audio.bit_rate, Some(192000));
        assert_eq!(audio.language.as_deref(), Some("eng"));
        assert_eq!(audio.title.as_deref(), Some("Surround"));

        let subtitle = &info.subtitle_streams[0];
        assert!(subtitle.forced);
        assert!(!subtitle.default);
        assert_eq!(subtitle.language.as_deref(), Some("ita"));

        assert_eq!(info.streams().len(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Prober::parse(Path::new("x"), "not json").unwrap_err();
        assert!(matches!(err, ConverterError::ParseError { .. }));
    }

    #[test]
    fn test_parse_seconds_bounds() {
        assert_eq!(parse_seconds("12.5"), Some(Duration::from_millis(12_500)));
        assert_eq!(parse_seconds("1e30"), None);
        assert_eq!(parse_seconds("-1"), None);
        assert_eq!(parse_seconds("N/A"), None);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio(1280, 720).as_deref(), Some("16:9"));
        assert_eq!(aspect_ratio(640, 480).as_deref(), Some("4:3"));
        assert_eq!(aspect_ratio(0, 480), None);
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = Prober::default()
            .probe(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }
}
