//! Pipeline module: compiles streams and global settings into the exact
//! command line handed to ffmpeg.
//!
//! # Example
//!
//! ```ignore
//! use ffpipe_core::pipeline::{ConversionPreset, Pipeline};
//! use ffpipe_core::stream::{AudioStream, VideoStream};
//!
//! let pipeline = Pipeline::new()
//!     .add_stream(VideoStream::new("in.mkv", 0).set_codec("libx264"))
//!     .add_stream(AudioStream::new("in.mkv", 1).set_codec("aac").set_bitrate(128_000)?)
//!     .set_preset(ConversionPreset::Fast)
//!     .set_overwrite_output(true)
//!     .set_output("out.mp4");
//!
//! // -i "in.mkv" -y -preset fast -codec:v libx264 -codec:a aac -b:a 128k -map 0:0 -map 0:1 "out.mp4"
//! let arguments = pipeline.build()?;
//! ```

mod args;
mod builder;
mod filter_graph;
mod settings;

pub use args::{quote, split_arguments};
pub use builder::Pipeline;
pub use filter_graph::build_filter_graph;
pub use settings::{ConversionPreset, HardwareAcceleration, ThreadPolicy, VideoSyncMethod};
