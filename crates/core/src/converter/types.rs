//! Types for the converter module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::error::ConverterError;
use crate::probe::{MediaInfo, Prober};

/// Progress update during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionProgress {
    /// Position reached in the output timeline. Never decreases within a run.
    pub position: Duration,
    /// Expected output length, `Duration::ZERO` when unknown.
    pub total: Duration,
    /// Encoding speed relative to realtime (e.g. `2.5` for "2.5x").
    pub speed: Option<f64>,
}

impl ConversionProgress {
    /// Completion percentage, capped at 100. `None` when the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        if self.total.is_zero() {
            return None;
        }
        Some((self.position.as_secs_f64() / self.total.as_secs_f64() * 100.0).min(100.0))
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// The exact argument string the tool was started with.
    pub arguments: String,
    pub output: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Full diagnostic log.
    pub log: String,
    prober: Option<Prober>,
    output_info: OnceCell<MediaInfo>,
}

impl ConversionResult {
    pub fn new(
        arguments: String,
        output: Option<PathBuf>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        elapsed: Duration,
        log: String,
    ) -> Self {
        Self {
            arguments,
            output,
            started_at,
            finished_at,
            elapsed,
            log,
            prober: None,
            output_info: OnceCell::new(),
        }
    }

    /// Enables [`output_info`](Self::output_info).
    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Probes the output file on first call and caches the answer.
    pub async fn output_info(&self) -> Result<&MediaInfo, ConverterError> {
        let output = self
            .output
            .as_deref()
            .ok_or_else(|| ConverterError::configuration("the pipeline has no output path"))?;
        let prober = self
            .prober
            .as_ref()
            .ok_or_else(|| ConverterError::probe_failed("no prober attached to this result"))?;

        self.output_info
            .get_or_try_init(|| prober.probe(output))
            .await
    }
}
