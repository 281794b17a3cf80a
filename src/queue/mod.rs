// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable Queue collaborator contract.
//!
//! The storage engine behind the queue (pages, checkpoints, crash recovery) is
//! not part of this crate. Everything above it talks to these two traits only.
//!
//! # Contract
//! - `write` blocks while the queue is at capacity
//! - `read_batch` blocks up to `wait`, `Ok(None)` means nothing arrived
//! - closing a [`BatchHandle`] commits the ack point for all of its elements
//! - errors are terminal storage faults and are passed through untouched

pub mod memory;

pub use memory::{MemoryQueue, QueueStats};

use crate::error::Result;
use crate::event::Event;
use std::time::Duration;

/// Handle to a batch read from a durable queue.
pub trait BatchHandle<E>: Send {
    /// Events of the batch in queue order.
    fn elements(&self) -> &[E];

    /// Commit the acknowledgment point for the whole batch.
    fn close(&mut self) -> Result<()>;
}

pub type BoxedBatch<E> = Box<dyn BatchHandle<E>>;

pub trait DurableQueue: Send + Sync + 'static {
    type Event: Event;

    /// Append an event, blocking while the queue is full.
    fn write(&self, event: Self::Event) -> Result<()>;

    /// Append an event, waiting at most `timeout` for space.
    ///
    /// Returns `Ok(false)` if the event was not accepted in time.
    fn offer(&self, event: Self::Event, timeout: Duration) -> Result<bool>;

    /// Read up to `max_size` events, waiting at most `wait` for the first one.
    fn read_batch(&self, max_size: usize, wait: Duration) -> Result<Option<BoxedBatch<Self::Event>>>;

    /// Release queue resources. Further reads and writes fail.
    fn close(&self) -> Result<()>;
}
