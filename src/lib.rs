// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! acked-queue: batching and acknowledgment coordination on top of a durable queue.
//!
//! The durable queue is a collaborator behind [`queue::DurableQueue`]. This crate
//! owns everything between it and the pipeline: read batches with a mutable
//! working set, write batches, per-consumer in-flight bookkeeping and the
//! size counters reported at batch boundaries.

pub mod config;
pub mod error;
pub mod event;
pub mod queue;
pub mod batch;
pub mod client;
pub mod metric;
pub mod telemetry;
pub mod wrapped;

pub use batch::{EventKey, ReadBatch, SharedReadBatch, WriteBatch};
pub use client::{ConsumerId, ReadClient, WriteClient};
pub use config::{QueueSettings, ReadSettings};
pub use error::{QueueError, Result};
pub use event::Event;
pub use queue::{BatchHandle, DurableQueue, MemoryQueue};
pub use wrapped::AckedQueue;

#[cfg(test)]
pub mod tests;
