//! Types for the conversion queue.

use serde::Serialize;
use std::sync::Arc;

use crate::converter::{ConversionResult, ConverterError};
use crate::pipeline::Pipeline;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue was disposed and accepts no more work.
    #[error("Queue has been disposed")]
    Disposed,
}

/// A pipeline that finished successfully.
#[derive(Debug)]
pub struct ConvertedItem {
    /// Sequence number assigned by `add`.
    pub number: u64,
    /// Items submitted so far.
    pub total: u64,
    /// Items finished so far, this one included.
    pub completed: u64,
    pub pipeline: Pipeline,
    pub result: ConversionResult,
}

/// A pipeline whose run failed or was cancelled.
#[derive(Debug)]
pub struct FailedItem {
    pub number: u64,
    pub total: u64,
    pub completed: u64,
    pub pipeline: Pipeline,
    pub error: ConverterError,
}

pub type ConvertedCallback = Arc<dyn Fn(ConvertedItem) + Send + Sync>;
pub type FailedCallback = Arc<dyn Fn(FailedItem) + Send + Sync>;

/// Snapshot of queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub running: bool,
    pub workers: usize,
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub active: u64,
    /// Submitted but not yet picked up by a worker.
    pub pending: u64,
}

impl QueueStatus {
    /// Finished items that succeeded.
    pub fn succeeded(&self) -> u64 {
        self.completed.saturating_sub(self.failed)
    }

    /// Submitted items that have not succeeded: failed, running or waiting.
    pub fn unsucceeded(&self) -> u64 {
        self.total.saturating_sub(self.succeeded())
    }
}
