//! Command-line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use ffpipe_core::timecode::parse_timestamp;
use ffpipe_core::ConversionPreset;

#[derive(Parser, Debug)]
#[command(name = "ffpipe")]
#[command(author, version, about = "Stream-based media conversion over ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "FFPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe a media file and print its metadata as JSON
    Probe {
        /// File to probe
        input: PathBuf,
    },

    /// Convert one file
    Convert(ConvertArgs),

    /// Convert many files through the conversion queue
    Batch(BatchArgs),

    /// Check that ffmpeg and ffprobe are available
    CheckTools,
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input media file
    pub input: PathBuf,

    /// Output file
    pub output: PathBuf,

    /// Video codec (e.g. libx264, copy)
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Audio codec (e.g. aac, copy)
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Video bitrate in bits per second
    #[arg(long)]
    pub video_bitrate: Option<u64>,

    /// Audio bitrate in bits per second
    #[arg(long)]
    pub audio_bitrate: Option<u64>,

    /// Playback speed multiplier, 0.5 to 2.0
    #[arg(long)]
    pub speed: Option<f64>,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long, value_parser = parse_duration)]
    pub seek: Option<Duration>,

    /// Output length (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Encoder preset (ultrafast .. veryslow)
    #[arg(long)]
    pub preset: Option<ConversionPreset>,

    /// Thread count; one per CPU when omitted
    #[arg(long)]
    pub threads: Option<usize>,

    /// Drop video streams
    #[arg(long)]
    pub no_video: bool,

    /// Drop audio streams
    #[arg(long)]
    pub no_audio: bool,

    /// Overwrite the output if it exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Input media files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the outputs are written to
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Output container extension
    #[arg(long, default_value = "mp4")]
    pub extension: String,

    /// Video codec
    #[arg(long, default_value = "libx264")]
    pub video_codec: String,

    /// Audio codec
    #[arg(long, default_value = "aac")]
    pub audio_codec: String,

    /// Run conversions in parallel instead of the configured mode
    #[arg(long)]
    pub parallel: bool,

    /// Worker count in parallel mode
    #[arg(long)]
    pub workers: Option<usize>,

    /// Overwrite outputs that exist
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    parse_timestamp(value).ok_or_else(|| format!("invalid time: {}", value))
}
