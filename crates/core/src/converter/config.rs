//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Kill a run that takes longer than this. No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// How long a cancelled run may take to quit after `q` before it is killed.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,

    /// Capacity of the progress channel handed out by the CLI.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,

    /// FFmpeg `-loglevel`. Anything below `info` hides the progress lines.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Additional global ffmpeg arguments, placed before the inputs.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_cancel_grace_ms() -> u64 {
    5000
}

fn default_progress_buffer() -> usize {
    64
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: None,
            cancel_grace_ms: default_cancel_grace_ms(),
            progress_buffer: default_progress_buffer(),
            log_level: None,
            extra_args: Vec::new(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn with_cancel_grace(mut self, grace_ms: u64) -> Self {
        self.cancel_grace_ms = grace_ms;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Global arguments prepended to every pipeline's arguments.
    pub(crate) fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(level) = &self.log_level {
            args.push("-loglevel".to_string());
            args.push(level.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}
