// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory durable queue.
//!
//! Honors the full [`DurableQueue`] contract except persistence: events live
//! in memory only. Capacity counts unacknowledged events, so a consumer that
//! sits on an open batch keeps writers blocked until it acks.

use crate::error::{QueueError, Result};
use crate::event::Event;
use crate::queue::{BatchHandle, BoxedBatch, DurableQueue};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Counters describing what the queue has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub written: u64,
    pub acked_events: u64,
    pub acked_batches: u64,
    /// Events written but not yet acknowledged (queued + in flight).
    pub unacked: usize,
    /// Events waiting to be read.
    pub queued: usize,
    pub closed: bool,
}

struct State<E> {
    queued: VecDeque<E>,
    stats: QueueStats,
}

struct Shared<E> {
    state: Mutex<State<E>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<E> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, mut state: MutexGuard<'_, State<E>>, event: E) {
        state.queued.push_back(event);
        state.stats.written += 1;
        state.stats.unacked += 1;
        state.stats.queued = state.queued.len();
        drop(state);
        self.not_empty.notify_one();
    }

    fn ack(&self, count: usize) {
        let mut state = self.lock();
        state.stats.unacked = state.stats.unacked.saturating_sub(count);
        state.stats.acked_events += count as u64;
        state.stats.acked_batches += 1;
        drop(state);
        self.not_full.notify_all();
    }
}

/// Bounded in-memory queue; cheap to clone, clones share the same storage.
pub struct MemoryQueue<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for MemoryQueue<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Event> MemoryQueue<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queued: VecDeque::new(),
                    stats: QueueStats::default(),
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.lock().stats
    }

    /// Events still waiting to be read, in queue order.
    pub fn queued(&self) -> Vec<E> {
        self.shared.lock().queued.iter().cloned().collect()
    }
}

impl<E: Event> DurableQueue for MemoryQueue<E> {
    type Event = E;

    fn write(&self, event: E) -> Result<()> {
        let mut state = self.shared.lock();
        while state.stats.unacked >= self.shared.capacity && !state.stats.closed {
            state = self
                .shared
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.stats.closed {
            return Err(QueueError::Closed);
        }
        self.shared.push(state, event);
        Ok(())
    }

    fn offer(&self, event: E, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.stats.unacked >= self.shared.capacity && !state.stats.closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let (guard, _) = self
                .shared
                .not_full
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        if state.stats.closed {
            return Err(QueueError::Closed);
        }
        self.shared.push(state, event);
        Ok(true)
    }

    fn read_batch(&self, max_size: usize, wait: Duration) -> Result<Option<BoxedBatch<E>>> {
        let deadline = Instant::now() + wait;
        let mut state = self.shared.lock();
        while state.queued.is_empty() && !state.stats.closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let (guard, _) = self
                .shared
                .not_empty
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        if state.stats.closed {
            return Err(QueueError::Closed);
        }

        let take = max_size.max(1).min(state.queued.len());
        let elements: Vec<E> = state.queued.drain(..take).collect();
        state.stats.queued = state.queued.len();
        Ok(Some(Box::new(MemoryBatch {
            elements,
            shared: Arc::clone(&self.shared),
            acked: false,
        })))
    }

    fn close(&self) -> Result<()> {
        let mut state = self.shared.lock();
        if !state.stats.closed {
            state.stats.closed = true;
            tracing::debug!(
                "Memory queue closed with {} unacked events",
                state.stats.unacked
            );
        }
        drop(state);
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
        Ok(())
    }
}

struct MemoryBatch<E> {
    elements: Vec<E>,
    shared: Arc<Shared<E>>,
    acked: bool,
}

impl<E: Event> BatchHandle<E> for MemoryBatch<E> {
    fn elements(&self) -> &[E] {
        &self.elements
    }

    fn close(&mut self) -> Result<()> {
        if !self.acked {
            self.acked = true;
            self.shared.ack(self.elements.len());
        }
        Ok(())
    }
}
