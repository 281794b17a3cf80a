// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::client::ConsumerId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The durable queue was closed; no further reads or writes are accepted.
    #[error("Queue is closed")]
    Closed,

    /// The consumer still holds an unacknowledged batch.
    #[error("Consumer {consumer} already has a batch in flight")]
    BatchInFlight { consumer: ConsumerId },

    /// Failure reported by the durable queue implementation, passed through as-is.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
