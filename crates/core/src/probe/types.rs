//! Metadata records produced by probing a media file.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::stream::{AudioStream, MediaStream, SubtitleStream, VideoStream};

/// Container-level metadata plus every elementary stream found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// First name of ffprobe's comma-separated `format_name`.
    pub format: String,
    pub size_bytes: u64,
    pub duration: Duration,
    pub bit_rate: Option<u64>,
    pub video_streams: Vec<VideoStreamInfo>,
    pub audio_streams: Vec<AudioStreamInfo>,
    pub subtitle_streams: Vec<SubtitleStreamInfo>,
}

impl MediaInfo {
    /// Video streams pre-populated from this file.
    pub fn video(&self) -> Vec<VideoStream> {
        self.video_streams
            .iter()
            .map(|info| VideoStream::from_info(&self.path, info))
            .collect()
    }

    /// Audio streams pre-populated from this file.
    pub fn audio(&self) -> Vec<AudioStream> {
        self.audio_streams
            .iter()
            .map(|info| AudioStream::from_info(&self.path, info))
            .collect()
    }

    /// Subtitle streams pre-populated from this file.
    pub fn subtitles(&self) -> Vec<SubtitleStream> {
        self.subtitle_streams
            .iter()
            .map(|info| SubtitleStream::from_info(&self.path, info))
            .collect()
    }

    /// Every stream, ordered by index.
    pub fn streams(&self) -> Vec<MediaStream> {
        let mut streams: Vec<MediaStream> = self
            .video()
            .into_iter()
            .map(MediaStream::from)
            .chain(self.audio().into_iter().map(MediaStream::from))
            .chain(self.subtitles().into_iter().map(MediaStream::from))
            .collect();
        streams.sort_by_key(|s| crate::stream::Stream::index(s));
        streams
    }
}

/// One video stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// Frames per second, from `r_frame_rate`.
    pub frame_rate: f64,
    /// Display ratio reduced by GCD, e.g. `"16:9"`.
    pub ratio: Option<String>,
    pub duration: Duration,
    pub bit_rate: Option<u64>,
    pub pixel_format: Option<String>,
    pub default: bool,
    pub forced: bool,
    pub language: Option<String>,
    pub title: Option<String>,
}

/// One audio stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub duration: Duration,
    pub bit_rate: Option<u64>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub default: bool,
    pub forced: bool,
    pub language: Option<String>,
    pub title: Option<String>,
}

/// One subtitle stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleStreamInfo {
    pub index: usize,
    pub codec: String,
    pub default: bool,
    pub forced: bool,
    pub language: Option<String>,
    pub title: Option<String>,
}
