//! Testing utilities.
//!
//! A [`MockConverter`] stands in for ffmpeg so queues and callers can be
//! exercised without the external tools installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffpipe_core::queue::{ConversionQueue, QueueConfig};
//! use ffpipe_core::testing::MockConverter;
//!
//! let converter = MockConverter::new();
//! let queue = ConversionQueue::new(converter.clone(), QueueConfig::parallel(4));
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedRun};
