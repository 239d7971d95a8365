//! Conversion queue: a worker pool that runs submitted pipelines.
//!
//! Serial mode runs one worker, parallel mode one per CPU (or
//! `max_workers`). Sequence numbers come from an atomic counter, so they are
//! unique and increasing across concurrent submitters; completion order
//! across parallel workers is not.

mod config;
mod runner;
mod types;

pub use config::{QueueConfig, QueueMode};
pub use runner::ConversionQueue;
pub use types::{
    ConvertedCallback, ConvertedItem, FailedCallback, FailedItem, QueueError, QueueStatus,
};
