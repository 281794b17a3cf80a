// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants and settings.

use crate::error::{QueueError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Events pulled per read batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 125;

/// Milliseconds a read waits for data before returning an empty batch.
pub const DEFAULT_WAIT_MS: u64 = 5;

/// Unacknowledged events the in-memory queue holds before writers block.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Wait used by the single-event `take` on the facade.
pub const TAKE_WAIT_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadSettings {
    pub batch_size: usize,
    pub wait_ms: u64,
}

impl ReadSettings {
    /// Waits beyond `u64::MAX` milliseconds saturate.
    pub fn new(batch_size: usize, wait: Duration) -> Self {
        Self {
            batch_size,
            wait_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(QueueError::Config("batch_size must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            wait_ms: DEFAULT_WAIT_MS,
        }
    }
}

/// Settings for an [`AckedQueue`](crate::wrapped::AckedQueue) and its clients.
///
/// Every field is optional in the JSON form:
/// ```json
/// { "capacity": 4096, "read": { "batch_size": 250, "wait_ms": 50 } }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSettings {
    pub capacity: usize,
    pub read: ReadSettings,
}

impl QueueSettings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|e| QueueError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(QueueError::Config("capacity must be greater than zero".into()));
        }
        self.read.validate()
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            read: ReadSettings::default(),
        }
    }
}
