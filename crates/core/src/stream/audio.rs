//! Audio stream builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::ConverterError;
use crate::probe::AudioStreamInfo;

use super::base::StreamBase;
use super::filter::{audio_speed_filter, FilterCategory, FilterConfiguration};
use super::parameter::{Parameter, ParameterPosition};
use super::{Stream, StreamKind};

/// An audio stream and the settings to apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    base: StreamBase,
    info: Option<AudioStreamInfo>,
}

impl AudioStream {
    pub fn new(source: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            base: StreamBase::new(source.into(), index),
            info: None,
        }
    }

    pub fn from_info(source: impl AsRef<Path>, info: &AudioStreamInfo) -> Self {
        let mut stream = Self::new(source.as_ref().to_path_buf(), info.index);
        stream.base.duration = Some(info.duration);
        stream.info = Some(info.clone());
        stream
    }

    pub fn info(&self) -> Option<&AudioStreamInfo> {
        self.info.as_ref()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.base.duration = Some(duration);
        self
    }

    pub fn set_codec(mut self, codec: impl Into<String>) -> Self {
        self.base.set_codec("-codec:a", codec.into());
        self
    }

    pub fn copy_stream(self) -> Self {
        self.set_codec("copy")
    }

    /// Target bitrate in bits per second; `128_000` renders as `-b:a 128k`.
    pub fn set_bitrate(mut self, bits_per_second: u64) -> Result<Self, ConverterError> {
        self.base.set_bitrate("-b:a", bits_per_second)?;
        Ok(self)
    }

    pub fn set_channels(mut self, channels: u32) -> Result<Self, ConverterError> {
        if channels == 0 {
            return Err(ConverterError::out_of_range(
                "channels",
                "channel count must be greater than zero",
            ));
        }
        self.base
            .parameters
            .set("channels", Parameter::post_input(format!("-ac {}", channels)));
        Ok(self)
    }

    pub fn set_sample_rate(mut self, hz: u32) -> Result<Self, ConverterError> {
        if hz == 0 {
            return Err(ConverterError::out_of_range(
                "sample_rate",
                "sample rate must be greater than zero",
            ));
        }
        self.base
            .parameters
            .set("sample_rate", Parameter::post_input(format!("-ar {}", hz)));
        Ok(self)
    }

    /// Tempo in `[0.5, 2.0]` through `atempo`.
    pub fn change_speed(mut self, multiplier: f64) -> Result<Self, ConverterError> {
        let value = audio_speed_filter(multiplier)?;
        self.base.filters.set(FilterCategory::Audio, "atempo", value);
        Ok(self)
    }

    pub fn reverse(mut self) -> Self {
        self.base.filters.set(FilterCategory::Audio, "areverse", "");
        self
    }

    pub fn set_seek(mut self, seek: Duration) -> Result<Self, ConverterError> {
        self.base.set_seek(seek)?;
        Ok(self)
    }

    pub fn set_duration(mut self, duration: Duration) -> Self {
        self.base.set_duration(duration);
        self
    }

    pub fn set_bitstream_filter(mut self, filter: impl Into<String>) -> Self {
        self.base.parameters.set(
            "bitstream_filter",
            Parameter::post_input(format!("-bsf:a {}", filter.into())),
        );
        self
    }
}

impl Stream for AudioStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Audio
    }

    fn source(&self) -> &Path {
        &self.base.source
    }

    fn index(&self) -> usize {
        self.base.index
    }

    fn codec(&self) -> Option<&str> {
        self.base
            .codec
            .as_deref()
            .or_else(|| self.info.as_ref().map(|i| i.codec.as_str()))
    }

    fn duration(&self) -> Option<Duration> {
        self.base.duration
    }

    fn build_parameters(&self, position: ParameterPosition) -> String {
        self.base.build_parameters(position)
    }

    fn filters(&self) -> Vec<FilterConfiguration> {
        self.base.filter_configurations()
    }
}
