//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or running a pipeline.
///
/// Run-time failures carry the exact argument string that was passed to the
/// tool so they can be reproduced by hand. The full diagnostic log is kept in
/// the variant but left out of `Display`; use [`ConverterError::diagnostics`].
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Caller input outside its accepted range. Raised before any process starts.
    #[error("Argument out of range: {argument}: {reason}")]
    ArgumentOutOfRange { argument: String, reason: String },

    /// The pipeline is internally inconsistent.
    #[error("Invalid pipeline configuration: {reason}")]
    Configuration { reason: String },

    /// The requested hardware accelerator is not available.
    #[error("Hardware accelerator not found: {message}")]
    HardwareAcceleratorNotFound {
        message: String,
        diagnostics: String,
        arguments: String,
    },

    /// A bitstream filter name was not recognised.
    #[error("Invalid bitstream filter: {message}")]
    InvalidBitstreamFilter {
        message: String,
        diagnostics: String,
        arguments: String,
    },

    /// A forced decoder does not exist.
    #[error("Unknown decoder: {message}")]
    UnknownDecoder {
        message: String,
        diagnostics: String,
        arguments: String,
    },

    /// Generic conversion failure.
    #[error("Conversion failed (exit code {exit_code:?}) for arguments: {arguments}")]
    ConversionFailed {
        exit_code: Option<i32>,
        diagnostics: String,
        arguments: String,
    },

    /// The run was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64, arguments: String },

    /// The run's task panicked.
    #[error("Conversion task panicked: {reason}")]
    Panicked { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new argument range error.
    pub fn out_of_range(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentOutOfRange {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Wraps a caught panic payload.
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked { reason }
    }

    /// The argument string of the failed run, for run-time failures.
    pub fn arguments(&self) -> Option<&str> {
        match self {
            Self::HardwareAcceleratorNotFound { arguments, .. }
            | Self::InvalidBitstreamFilter { arguments, .. }
            | Self::UnknownDecoder { arguments, .. }
            | Self::ConversionFailed { arguments, .. }
            | Self::Timeout { arguments, .. } => Some(arguments),
            _ => None,
        }
    }

    /// The full diagnostic log of the failed run, for classified failures.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::HardwareAcceleratorNotFound { diagnostics, .. }
            | Self::InvalidBitstreamFilter { diagnostics, .. }
            | Self::UnknownDecoder { diagnostics, .. }
            | Self::ConversionFailed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}
