//! Probe adapter: container and stream metadata via ffprobe.

mod ffprobe;
mod types;

pub use ffprobe::Prober;
pub use types::{AudioStreamInfo, MediaInfo, SubtitleStreamInfo, VideoStreamInfo};
