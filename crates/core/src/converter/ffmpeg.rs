//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{timeout, Duration, Instant};
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::progress::ProgressTracker;
use super::run::{RunHandle, RunOptions, RunState};
use super::traits::Converter;
use super::types::ConversionResult;
use crate::pipeline::Pipeline;
use crate::probe::{MediaInfo, Prober};

/// FFmpeg-based converter implementation.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    config: ConverterConfig,
    prober: Prober,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let prober = Prober::new(config.ffprobe_path.clone());
        Self { config, prober }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    /// The full argument string a pipeline would be started with, global
    /// arguments from the configuration included.
    pub fn arguments(&self, pipeline: &Pipeline) -> Result<String, ConverterError> {
        let global = self.config.global_args().join(" ");
        let built = pipeline.build()?;
        Ok([global, built]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn supervisor(&self, pipeline: &Pipeline) -> Result<Supervisor, ConverterError> {
        let mut args = self.config.global_args();
        args.extend(pipeline.build_args()?);

        Ok(Supervisor {
            ffmpeg_path: self.config.ffmpeg_path.clone(),
            arguments: self.arguments(pipeline)?,
            args,
            output: pipeline.output().map(Path::to_path_buf),
            timeout: self.config.timeout(),
            cancel_grace: self.config.cancel_grace(),
            prober: self.prober.clone(),
        })
    }

    /// Builds the pipeline and starts supervising it in the background.
    ///
    /// Build errors are returned here, before anything is spawned. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, pipeline: &Pipeline, options: RunOptions) -> Result<RunHandle, ConverterError> {
        let supervisor = self.supervisor(pipeline)?;
        let arguments = supervisor.arguments.clone();
        let cancel = options.cancel.clone();
        let (state_tx, state_rx) = watch::channel(RunState::Idle);

        let task = tokio::spawn(supervisor.supervise(options, state_tx));
        Ok(RunHandle::new(arguments, state_rx, cancel, task))
    }

    async fn check_tool(path: &Path, not_found: ConverterError) -> Result<(), ConverterError> {
        let output = Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    not_found
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::configuration(format!(
                "{} -version exited with {:?}",
                path.display(),
                output.status.code()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        self.prober.probe(path).await
    }

    async fn run(
        &self,
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let (state_tx, _state_rx) = watch::channel(RunState::Idle);
        self.supervisor(pipeline)?
            .supervise(options, state_tx)
            .await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Self::check_tool(
            &self.config.ffmpeg_path,
            ConverterError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            },
        )
        .await?;

        Self::check_tool(
            &self.config.ffprobe_path,
            ConverterError::FfprobeNotFound {
                path: self.config.ffprobe_path.clone(),
            },
        )
        .await
    }
}

/// Everything one run needs, captured at start so later config or pipeline
/// changes cannot affect it.
struct Supervisor {
    ffmpeg_path: PathBuf,
    arguments: String,
    args: Vec<String>,
    output: Option<PathBuf>,
    timeout: Option<Duration>,
    cancel_grace: Duration,
    prober: Prober,
}

enum Outcome {
    Exited,
    Cancelled,
    TimedOut,
}

impl Supervisor {
    async fn supervise(
        self,
        options: RunOptions,
        state: watch::Sender<RunState>,
    ) -> Result<ConversionResult, ConverterError> {
        let result = self.execute(&options, &state).await;

        let final_state = match &result {
            Ok(_) => RunState::Succeeded,
            Err(e) if e.is_cancelled() => RunState::Cancelled,
            Err(_) => RunState::Failed,
        };
        state.send_replace(final_state);

        result
    }

    async fn execute(
        self,
        options: &RunOptions,
        state: &watch::Sender<RunState>,
    ) -> Result<ConversionResult, ConverterError> {
        state.send_replace(RunState::Starting);
        if options.cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        info!(arguments = %self.arguments, "Starting ffmpeg");
        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("ffmpeg stderr was not captured"))?;
        state.send_replace(RunState::Running);

        let mut lines = LineReader::new(stderr);
        let mut tracker = ProgressTracker::from_args(&self.args);
        let mut log = String::new();
        let deadline = self.timeout.map(|t| start + t);

        let outcome = loop {
            tokio::select! {
                _ = options.cancel.cancelled() => break Outcome::Cancelled,
                _ = sleep_until(deadline) => break Outcome::TimedOut,
                line = lines.next_line() => match line? {
                    Some(line) => {
                        debug!(target: "ffmpeg", "{}", line);
                        if let Some(progress) = tracker.feed(&line) {
                            if let Some(tx) = &options.progress_tx {
                                let _ = tx.try_send(progress);
                            }
                        }
                        log.push_str(&line);
                        log.push('\n');
                        if let Some(tx) = &options.output_tx {
                            // A full output channel must not hold off cancellation or the deadline.
                            let interrupted = tokio::select! {
                                _ = tx.send(line) => None,
                                _ = options.cancel.cancelled() => Some(Outcome::Cancelled),
                                _ = sleep_until(deadline) => Some(Outcome::TimedOut),
                            };
                            if let Some(outcome) = interrupted {
                                break outcome;
                            }
                        }
                    }
                    None => break Outcome::Exited,
                },
            }
        };

        match outcome {
            Outcome::Cancelled => {
                self.stop(&mut child).await;
                info!(arguments = %self.arguments, "ffmpeg run cancelled");
                return Err(ConverterError::Cancelled);
            }
            Outcome::TimedOut => {
                let timeout_secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(timeout_secs, "ffmpeg timed out, killing");
                let _ = child.kill().await;
                return Err(ConverterError::Timeout {
                    timeout_secs,
                    arguments: self.arguments,
                });
            }
            Outcome::Exited => {}
        }

        let status = child.wait().await?;
        let elapsed = start.elapsed();

        if let Some(err) = classify(&log, &self.arguments, status.code()) {
            warn!(exit_code = ?status.code(), error = %err, "ffmpeg run failed");
            return Err(err);
        }

        info!(elapsed_ms = elapsed.as_millis() as u64, "ffmpeg run finished");
        Ok(ConversionResult::new(
            self.arguments,
            self.output,
            started_at,
            Utc::now(),
            elapsed,
            log,
        )
        .with_prober(self.prober))
    }

    /// Asks ffmpeg to quit with `q`; kills it if it is still alive after the
    /// grace period.
    async fn stop(&self, child: &mut Child) {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.flush().await;
        }

        if timeout(self.cancel_grace, child.wait()).await.is_err() {
            warn!(
                grace_ms = self.cancel_grace.as_millis() as u64,
                "ffmpeg ignored quit request, killing"
            );
            let _ = child.kill().await;
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Splits a byte stream into lines on `\n` and `\r`.
///
/// ffmpeg rewrites its status line with carriage returns, so `\r` has to end
/// a line too. Empty lines are dropped. `next_line` is cancel safe.
struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            eof: false,
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            while let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line[..pos]).into_owned();
                if !text.is_empty() {
                    return Ok(Some(text));
                }
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buf);
                return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
            }

            let mut chunk = [0u8; 4096];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}
