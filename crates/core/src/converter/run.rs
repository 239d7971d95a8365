//! Run handle and options for supervised runs.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::types::{ConversionProgress, ConversionResult};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

/// Per-run hooks.
///
/// Progress is delivered with `try_send`: a slow consumer misses updates
/// instead of stalling the tool. Raw lines are delivered with `send` so none
/// are lost while the receiver is alive.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    pub output_tx: Option<mpsc::Sender<String>>,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            progress_tx: None,
            output_tx: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    pub fn with_progress(mut self, tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_output(mut self, tx: mpsc::Sender<String>) -> Self {
        self.output_tx = Some(tx);
        self
    }

    /// Ties the run to an external token. Cancelling it cancels this run only
    /// if nothing else shares the token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A started run.
///
/// Dropping the handle does not stop the run; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct RunHandle {
    arguments: String,
    state: watch::Receiver<RunState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<ConversionResult, ConverterError>>,
}

impl RunHandle {
    pub(crate) fn new(
        arguments: String,
        state: watch::Receiver<RunState>,
        cancel: CancellationToken,
        task: JoinHandle<Result<ConversionResult, ConverterError>>,
    ) -> Self {
        Self {
            arguments,
            state,
            cancel,
            task,
        }
    }

    /// The argument string the tool was started with.
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// A receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Requests cancellation. A no-op once the run has finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to finish.
    pub async fn wait(self) -> Result<ConversionResult, ConverterError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ConverterError::Cancelled),
            Err(e) => match e.try_into_panic() {
                Ok(payload) => Err(ConverterError::panicked(payload.as_ref())),
                Err(e) => Err(ConverterError::Io(std::io::Error::other(e.to_string()))),
            },
        }
    }
}
