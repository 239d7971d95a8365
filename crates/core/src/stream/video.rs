//! Video stream builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::ConverterError;
use crate::probe::VideoStreamInfo;
use crate::timecode::format_decimal;

use super::base::{format_bitrate, StreamBase};
use super::filter::{
    filter_path, video_speed_filter, FilterCategory, FilterConfiguration, Rotation,
    WatermarkPosition,
};
use super::parameter::{Parameter, ParameterPosition};
use super::{Stream, StreamKind};

/// A video stream and the settings to apply to it.
///
/// Setters consume and return the stream, so a configured stream is built in
/// one expression and can then be cloned into any number of pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    base: StreamBase,
    info: Option<VideoStreamInfo>,
    watermark: Option<PathBuf>,
}

impl VideoStream {
    /// An unconfigured stream `index` of `source`.
    pub fn new(source: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            base: StreamBase::new(source.into(), index),
            info: None,
            watermark: None,
        }
    }

    /// A stream pre-populated from probe output.
    pub fn from_info(source: impl AsRef<Path>, info: &VideoStreamInfo) -> Self {
        let mut stream = Self::new(source.as_ref().to_path_buf(), info.index);
        stream.base.duration = Some(info.duration);
        stream.info = Some(info.clone());
        stream
    }

    /// Probe metadata, when the stream came from a probe.
    pub fn info(&self) -> Option<&VideoStreamInfo> {
        self.info.as_ref()
    }

    /// Declares the source duration used to validate seeks.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.base.duration = Some(duration);
        self
    }

    pub fn set_codec(mut self, codec: impl Into<String>) -> Self {
        self.base.set_codec("-codec:v", codec.into());
        self
    }

    /// Copies the stream without re-encoding.
    pub fn copy_stream(self) -> Self {
        self.set_codec("copy")
    }

    /// Target bitrate in bits per second.
    pub fn set_bitrate(mut self, bits_per_second: u64) -> Result<Self, ConverterError> {
        self.base.set_bitrate("-b:v", bits_per_second)?;
        Ok(self)
    }

    /// Constrained bitrate: `-minrate`, `-maxrate` and `-bufsize`.
    pub fn set_bitrate_bounds(
        mut self,
        min: u64,
        max: u64,
        buffer: u64,
    ) -> Result<Self, ConverterError> {
        if min > max {
            return Err(ConverterError::out_of_range(
                "bitrate",
                format!("minimum {} is greater than maximum {}", min, max),
            ));
        }
        self.base.set_bitrate("-b:v", max)?;
        self.base.parameters.set(
            "bitrate_bounds",
            Parameter::post_input(format!(
                "-maxrate {} -minrate {} -bufsize {}",
                format_bitrate(max),
                format_bitrate(min),
                format_bitrate(buffer)
            )),
        );
        Ok(self)
    }

    pub fn set_size(mut self, width: u32, height: u32) -> Result<Self, ConverterError> {
        if width == 0 || height == 0 {
            return Err(ConverterError::out_of_range(
                "size",
                format!("{}x{} has a zero dimension", width, height),
            ));
        }
        self.base
            .parameters
            .set("size", Parameter::post_input(format!("-s {}x{}", width, height)));
        Ok(self)
    }

    pub fn set_framerate(mut self, fps: f64) -> Result<Self, ConverterError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConverterError::out_of_range(
                "framerate",
                format!("{} is not a positive frame rate", fps),
            ));
        }
        self.base.parameters.set(
            "framerate",
            Parameter::post_input(format!("-r {}", format_decimal(fps))),
        );
        Ok(self)
    }

    pub fn set_pixel_format(mut self, format: impl Into<String>) -> Self {
        self.base.parameters.set(
            "pixel_format",
            Parameter::post_input(format!("-pix_fmt {}", format.into())),
        );
        self
    }

    pub fn rotate(mut self, rotation: Rotation) -> Self {
        self.base.filters.set(
            FilterCategory::Complex,
            "transpose",
            rotation.transpose_value().to_string(),
        );
        self
    }

    pub fn reverse(mut self) -> Self {
        self.base.filters.set(FilterCategory::Complex, "reverse", "");
        self
    }

    /// Playback speed in `[0.5, 2.0]` through `setpts`.
    pub fn change_speed(mut self, multiplier: f64) -> Result<Self, ConverterError> {
        let value = video_speed_filter(multiplier)?;
        self.base
            .filters
            .set(FilterCategory::Complex, "setpts", value);
        Ok(self)
    }

    /// Seeks the input before decoding.
    pub fn set_seek(mut self, seek: Duration) -> Result<Self, ConverterError> {
        self.base.set_seek(seek)?;
        Ok(self)
    }

    /// Limits the output length.
    pub fn set_duration(mut self, duration: Duration) -> Self {
        self.base.set_duration(duration);
        self
    }

    /// Loops the input `count` extra times; `-1` loops forever.
    pub fn set_stream_loop(mut self, count: i32) -> Result<Self, ConverterError> {
        if count < -1 {
            return Err(ConverterError::out_of_range(
                "stream_loop",
                format!("loop count {} is below -1", count),
            ));
        }
        self.base.parameters.set(
            "stream_loop",
            Parameter::pre_input(format!("-stream_loop {}", count)),
        );
        Ok(self)
    }

    pub fn set_output_frames_count(mut self, frames: u64) -> Self {
        self.base.parameters.set(
            "frames",
            Parameter::post_input(format!("-frames:v {}", frames)),
        );
        self
    }

    /// Burns a subtitle file into the picture.
    pub fn add_subtitles(
        mut self,
        subtitles: impl AsRef<Path>,
        encoding: Option<&str>,
        style: Option<&str>,
    ) -> Self {
        let mut value = filter_path(subtitles.as_ref());
        if let Some(encoding) = encoding {
            value.push_str(&format!(":charenc={}", encoding));
        }
        if let Some(style) = style {
            value.push_str(&format!(":force_style='{}'", style));
        }
        if let Some(info) = &self.info {
            value.push_str(&format!(":original_size={}x{}", info.width, info.height));
        }
        self.base
            .filters
            .set(FilterCategory::Complex, "subtitles", value);
        self
    }

    /// Overlays an image; the image becomes an extra pipeline input.
    pub fn set_watermark(mut self, image: impl Into<PathBuf>, position: WatermarkPosition) -> Self {
        self.watermark = Some(image.into());
        self.base.filters.set(
            FilterCategory::Complex,
            "overlay",
            position.overlay_expression(),
        );
        self
    }

    pub fn set_bitstream_filter(mut self, filter: impl Into<String>) -> Self {
        self.base.parameters.set(
            "bitstream_filter",
            Parameter::post_input(format!("-bsf:v {}", filter.into())),
        );
        self
    }
}

impl Stream for VideoStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Video
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

    fn extra_inputs(&self) -> Vec<&Path> {
        self.watermark.iter().map(PathBuf::as_path).collect()
    }
}
