//! Mock converter for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{ConversionProgress, ConversionResult, Converter, ConverterError, RunOptions};
use crate::pipeline::Pipeline;
use crate::probe::{AudioStreamInfo, MediaInfo, VideoStreamInfo};

/// A recorded run for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    /// The built argument string.
    pub arguments: String,
    pub pipeline: Pipeline,
    /// Whether the run succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Runs never spawn anything. Each run builds the pipeline (so build errors
/// surface as they would for real), waits for the configured duration while
/// honouring cancellation, emits two progress events and records itself.
///
/// # Example
///
/// ```rust,ignore
/// use ffpipe_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_fail_on("broken.mp4").await;
///
/// let result = converter.convert(&pipeline).await?;
///
/// let runs = converter.recorded_runs().await;
/// assert_eq!(runs.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    runs: Arc<RwLock<Vec<RecordedRun>>>,
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Runs whose arguments contain this text fail.
    fail_on: Arc<RwLock<Option<String>>>,
    run_duration: Arc<RwLock<Duration>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            fail_on: Arc::new(RwLock::new(None)),
            run_duration: Arc::new(RwLock::new(Duration::from_millis(10))),
        }
    }

    /// Get all recorded runs.
    pub async fn recorded_runs(&self) -> Vec<RecordedRun> {
        self.runs.read().await.clone()
    }

    /// Get the number of runs performed.
    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Fail every run whose argument string contains `needle`.
    pub async fn set_fail_on(&self, needle: impl Into<String>) {
        *self.fail_on.write().await = Some(needle.into());
    }

    /// Set the simulated run duration.
    pub async fn set_run_duration(&self, duration: Duration) {
        *self.run_duration.write().await = duration;
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    /// A one-minute file with one 1080p video and one stereo audio stream.
    pub fn default_info(path: &Path) -> MediaInfo {
        let duration = Duration::from_secs(60);
        MediaInfo {
            path: path.to_path_buf(),
            format: "mov".to_string(),
            size_bytes: 10 * 1024 * 1024,
            duration,
            bit_rate: Some(1_400_000),
            video_streams: vec![VideoStreamInfo {
                index: 0,
                codec: "h264".to_string(),
                width: 1920,
                height: 1080,
                frame_rate: 25.0,
                ratio: Some("16:9".to_string()),
                duration,
                bit_rate: Some(1_200_000),
                pixel_format: Some("yuv420p".to_string()),
                default: true,
                forced: false,
                language: None,
                title: None,
            }],
            audio_streams: vec![AudioStreamInfo {
                index: 1,
                codec: "aac".to_string(),
                duration,
                bit_rate: Some(128_000),
                channels: Some(2),
                sample_rate: Some(48_000),
                default: true,
                forced: false,
                language: Some("eng".to_string()),
                title: None,
            }],
            subtitle_streams: Vec::new(),
        }
    }

    async fn record(&self, arguments: &str, pipeline: &Pipeline, success: bool) {
        self.runs.write().await.push(RecordedRun {
            arguments: arguments.to_string(),
            pipeline: pipeline.clone(),
            success,
        });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(info.clone());
        }

        Ok(Self::default_info(path))
    }

    async fn run(
        &self,
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let arguments = pipeline.build()?;

        if let Some(err) = self.take_error().await {
            self.record(&arguments, pipeline, false).await;
            return Err(err);
        }

        let started_at = Utc::now();
        let total = Duration::from_secs(60);
        let duration = *self.run_duration.read().await;

        if let Some(tx) = &options.progress_tx {
            let _ = tx.try_send(ConversionProgress {
                position: total / 2,
                total,
                speed: Some(1.0),
            });
        }

        tokio::select! {
            _ = options.cancel.cancelled() => {
                self.record(&arguments, pipeline, false).await;
                return Err(ConverterError::Cancelled);
            }
            _ = tokio::time::sleep(duration) => {}
        }

        let fail_on = self.fail_on.read().await.clone();
        if let Some(needle) = fail_on.filter(|n| arguments.contains(n.as_str())) {
            self.record(&arguments, pipeline, false).await;
            return Err(ConverterError::ConversionFailed {
                exit_code: Some(1),
                diagnostics: format!("{}: Invalid data found when processing input", needle),
                arguments,
            });
        }

        if let Some(tx) = &options.progress_tx {
            let _ = tx.try_send(ConversionProgress {
                position: total,
                total,
                speed: Some(1.0),
            });
        }

        self.record(&arguments, pipeline, true).await;
        Ok(ConversionResult::new(
            arguments,
            pipeline.output().map(Path::to_path_buf),
            started_at,
            Utc::now(),
            duration,
            String::new(),
        ))
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        match self.take_error().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
