//! Media conversion engine over the ffmpeg/ffprobe command-line tools.
//!
//! Streams describe what to take from each input, a [`Pipeline`] compiles
//! them into one deterministic argument string, a [`FfmpegConverter`] runs it
//! under supervision, and a [`ConversionQueue`] runs many of them.

pub mod config;
pub mod converter;
pub mod pipeline;
pub mod probe;
pub mod queue;
pub mod snippets;
pub mod stream;
pub mod testing;
pub mod timecode;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
};
pub use converter::{
    ConversionProgress, ConversionResult, Converter, ConverterConfig, ConverterError,
    FfmpegConverter, RunHandle, RunOptions, RunState,
};
pub use pipeline::{ConversionPreset, HardwareAcceleration, Pipeline, ThreadPolicy, VideoSyncMethod};
pub use probe::{MediaInfo, Prober};
pub use queue::{ConversionQueue, QueueConfig, QueueError, QueueMode};
pub use stream::{
    AudioStream, MediaStream, ParameterPosition, Stream, SubtitleStream, VideoStream,
    WatermarkPosition,
};
