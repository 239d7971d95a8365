//! Converter module: runs built pipelines under supervision.
//!
//! A run spawns ffmpeg with its diagnostic stream piped, turns the
//! `Duration:`/`time=` lines into progress events, keeps the full log, and
//! classifies the outcome when the process exits. Runs can be cancelled
//! (graceful `q`, then kill) and bounded by a timeout.
//!
//! # Example
//!
//! ```ignore
//! use ffpipe_core::converter::{Converter, FfmpegConverter, RunOptions};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let handle = converter.start(&pipeline, RunOptions::default().with_progress(tx))?;
//! while let Some(progress) = rx.recv().await {
//!     println!("{:?} / {:?}", progress.position, progress.total);
//! }
//! let result = handle.wait().await?;
//! println!("Converted in {:?}", result.elapsed);
//! ```

mod classifier;
mod config;
mod error;
mod ffmpeg;
mod progress;
mod run;
mod traits;
mod types;

pub use classifier::classify;
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use progress::ProgressTracker;
pub use run::{RunHandle, RunOptions, RunState};
pub use traits::Converter;
pub use types::{ConversionProgress, ConversionResult};
