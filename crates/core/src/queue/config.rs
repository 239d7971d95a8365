//! Configuration for the conversion queue.

use serde::{Deserialize, Serialize};

/// How many workers a queue runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// One worker; items finish in submission order.
    #[default]
    Serial,
    /// Several workers; completion order is not guaranteed.
    Parallel,
}

/// Configuration for the conversion queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub mode: QueueMode,

    /// Worker count in parallel mode. One per logical CPU when unset.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl QueueConfig {
    pub fn serial() -> Self {
        Self {
            mode: QueueMode::Serial,
            max_workers: None,
        }
    }

    /// Parallel mode with an explicit worker count.
    pub fn parallel(workers: usize) -> Self {
        Self {
            mode: QueueMode::Parallel,
            max_workers: Some(workers),
        }
    }

    /// Number of workers `start` spawns.
    pub fn worker_count(&self) -> usize {
        match self.mode {
            QueueMode::Serial => 1,
            QueueMode::Parallel => self.max_workers.unwrap_or_else(num_cpus::get).max(1),
        }
    }
}
