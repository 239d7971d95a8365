//! Stream model: one elementary media track plus the parameters and filters
//! that should be applied to it.
//!
//! Streams are plain values. Every setter consumes the stream and returns it
//! (or a range error), so a stream can be configured once and cloned into
//! several pipelines without one build affecting another.
//!
//! # Example
//!
//! ```ignore
//! use ffpipe_core::stream::{AudioStream, VideoStream};
//!
//! let video = VideoStream::new("input.mkv", 0)
//!     .set_codec("libx264")
//!     .change_speed(1.5)?;
//! let audio = AudioStream::new("input.mkv", 1)
//!     .set_codec("aac")
//!     .set_bitrate(128_000)?
//!     .change_speed(1.5)?;
//! ```

mod audio;
mod base;
mod filter;
mod parameter;
mod subtitle;
mod video;

use std::path::Path;
use std::time::Duration;

pub use audio::AudioStream;
pub use filter::{
    audio_speed_filter, validate_speed, video_speed_filter, video_speed_scale, FilterAssignment,
    FilterCategory, FilterConfiguration, Rotation, WatermarkPosition, MAX_SPEED, MIN_SPEED,
};
pub use parameter::{Parameter, ParameterPosition};
pub use subtitle::SubtitleStream;
pub use video::VideoStream;

pub(crate) use parameter::ParameterList;

/// Elementary stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

/// Read-only view a pipeline needs from a stream at build time.
pub trait Stream {
    fn kind(&self) -> StreamKind;

    /// File the stream is read from.
    fn source(&self) -> &Path;

    /// Index of the stream inside its source file.
    fn index(&self) -> usize;

    /// Codec set on the stream, or the probed codec when none was set.
    fn codec(&self) -> Option<&str>;

    /// Known source duration, if any.
    fn duration(&self) -> Option<Duration>;

    /// Parameters at `position`, space-joined in insertion order.
    fn build_parameters(&self, position: ParameterPosition) -> String;

    /// Categorised filter entries for the filter-graph builder.
    fn filters(&self) -> Vec<FilterConfiguration>;

    /// Additional files the stream needs declared as inputs.
    fn extra_inputs(&self) -> Vec<&Path> {
        Vec::new()
    }

    /// Metadata options addressed to the `ordinal`-th output stream of this
    /// kind.
    fn build_metadata(&self, _ordinal: usize) -> String {
        String::new()
    }
}

/// Any stream kind, as held by a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaStream {
    Video(VideoStream),
    Audio(AudioStream),
    Subtitle(SubtitleStream),
}

impl MediaStream {
    fn inner(&self) -> &dyn Stream {
        match self {
            Self::Video(s) => s,
            Self::Audio(s) => s,
            Self::Subtitle(s) => s,
        }
    }
}

impl Stream for MediaStream {
    fn kind(&self) -> StreamKind {
        self.inner().kind()
    }

    fn source(&self) -> &Path {
        self.inner().source()
    }

    fn index(&self) -> usize {
        self.inner().index()
    }

    fn codec(&self) -> Option<&str> {
        self.inner().codec()
    }

    fn duration(&self) -> Option<Duration> {
        self.inner().duration()
    }

    fn build_parameters(&self, position: ParameterPosition) -> String {
        self.inner().build_parameters(position)
    }

    fn filters(&self) -> Vec<FilterConfiguration> {
        self.inner().filters()
    }

    fn extra_inputs(&self) -> Vec<&Path> {
        self.inner().extra_inputs()
    }

    fn build_metadata(&self, ordinal: usize) -> String {
        self.inner().build_metadata(ordinal)
    }
}

impl From<VideoStream> for MediaStream {
    fn from(stream: VideoStream) -> Self {
        Self::Video(stream)
    }
}

impl From<AudioStream> for MediaStream {
    fn from(stream: AudioStream) -> Self {
        Self::Audio(stream)
    }
}

impl From<SubtitleStream> for MediaStream {
    fn from(stream: SubtitleStream) -> Self {
        Self::Subtitle(stream)
    }
}
