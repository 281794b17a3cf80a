// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read Batch - Snapshot + Working Set
//!
//! Maintains the distinction between:
//! - **originals** = events pulled from the queue (fixed at snapshot)
//! - **generated** = events added by pipeline stages afterwards
//! - **cancelled** = events suppressed from iteration output
//!
//! Every event is identified by an [`EventKey`] the batch assigns when the
//! event joins it. Payload equality plays no part: two equal events read in
//! one snapshot are two events, both visited and both acked.
//!
//! # Semantics
//! - cancellation only affects what `each` yields, never the sizes
//! - `close` acks the whole queue batch, cancelled events included
//! - events merged during a pass are staged and join `generated` after it
//!
//! # Flow
//! 1. read_from() - snapshot from the durable queue
//! 2. each() / merge() / cancel() - pipeline processing
//! 3. close() - commit the ack point

use crate::error::Result;
use crate::event::Event;
use crate::queue::{BoxedBatch, DurableQueue};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identity of an event within one read batch.
///
/// Originals are keyed in snapshot order at read time; a generated event takes
/// the next free key when it is merged. Keys are only meaningful for the batch
/// that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EventKey(usize);

impl EventKey {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct ReadBatch<E: Event> {
    /// Originals (`..starting`) followed by generated, in key order.
    events: Vec<E>,
    starting: usize,
    cancelled: FxHashSet<EventKey>,

    /// Merged during a pass, appended to `events` once the pass ends.
    staged: Vec<E>,

    ack: Option<BoxedBatch<E>>,
    acknowledged: bool,
}

impl<E: Event> ReadBatch<E> {
    /// A batch with no events and nothing to acknowledge.
    pub fn empty() -> Self {
        Self {
            events: Vec::new(),
            starting: 0,
            cancelled: FxHashSet::default(),
            staged: Vec::new(),
            ack: None,
            acknowledged: false,
        }
    }

    /// Snapshot up to `max_size` events from `queue`, waiting at most `wait`.
    ///
    /// A timeout without data yields an empty batch, not an error.
    pub fn read_from<Q>(queue: &Q, max_size: usize, wait: Duration) -> Result<Self>
    where
        Q: DurableQueue<Event = E> + ?Sized,
    {
        let handle = queue.read_batch(max_size, wait)?;
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: Option<BoxedBatch<E>>) -> Self {
        let mut batch = Self::empty();
        if let Some(handle) = handle {
            batch.events = handle.elements().to_vec();
            batch.starting = batch.events.len();
            batch.ack = Some(handle);
        }
        batch
    }

    /// Add an event produced downstream and return its key.
    ///
    /// Accepts `E` or `Option<E>`; `None` is ignored. A merged value is always
    /// a new event, even if its payload equals one already in the batch.
    pub fn merge(&mut self, event: impl Into<Option<E>>) -> Option<EventKey> {
        let event = event.into()?;
        self.events.push(event);
        Some(EventKey(self.events.len() - 1))
    }

    /// Suppress an event from future iteration. Sizes are unaffected.
    ///
    /// Returns false if `key` was not issued by this batch.
    pub fn cancel(&mut self, key: EventKey) -> bool {
        if key.0 >= self.events.len() {
            return false;
        }
        self.cancelled.insert(key);
        true
    }

    /// Cancel every event whose payload matches `pred`. Returns how many
    /// events were newly cancelled.
    pub fn cancel_where<P>(&mut self, mut pred: P) -> usize
    where
        P: FnMut(&E) -> bool,
    {
        let mut count = 0;
        for (index, event) in self.events.iter().enumerate() {
            if pred(event) && self.cancelled.insert(EventKey(index)) {
                count += 1;
            }
        }
        count
    }

    /// Visit every non-cancelled original in snapshot order, then every
    /// non-cancelled generated event in insertion order.
    ///
    /// The visitor can merge and cancel through the [`PassScope`]. Merges are
    /// staged and only become visible to the next pass; cancels apply to
    /// events not yet visited in this one.
    pub fn each<F>(&mut self, mut visit: F)
    where
        F: FnMut(&E, &mut PassScope<'_, E>),
    {
        {
            let mut scope = PassScope {
                current: EventKey(0),
                known: self.events.len(),
                cancelled: &mut self.cancelled,
                staged: &mut self.staged,
            };
            for (index, event) in self.events.iter().enumerate() {
                let key = EventKey(index);
                if scope.cancelled.contains(&key) {
                    continue;
                }
                scope.current = key;
                visit(event, &mut scope);
            }
        }
        self.events.append(&mut self.staged);
    }

    /// Every event with its key in visiting order, cancelled ones included.
    pub fn iter(&self) -> impl Iterator<Item = (EventKey, &E)> {
        self.events
            .iter()
            .enumerate()
            .map(|(index, event)| (EventKey(index), event))
    }

    pub fn get(&self, key: EventKey) -> Option<&E> {
        self.events.get(key.0)
    }

    /// Events the next `each` would visit, in visiting order.
    pub fn events(&self) -> Vec<E> {
        self.iter()
            .filter(|(key, _)| !self.cancelled.contains(key))
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn originals(&self) -> &[E] {
        &self.events[..self.starting]
    }

    pub fn generated(&self) -> &[E] {
        &self.events[self.starting..]
    }

    pub fn is_cancelled(&self, key: EventKey) -> bool {
        self.cancelled.contains(&key)
    }

    pub fn size(&self) -> usize {
        self.filtered_size()
    }

    /// Originals plus generated, cancelled events included.
    pub fn filtered_size(&self) -> usize {
        self.events.len()
    }

    pub fn starting_size(&self) -> usize {
        self.starting
    }

    pub fn cancelled_size(&self) -> usize {
        self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_size() == 0
    }

    /// A queue-backed batch never carries a shutdown signal.
    pub fn shutdown_signal_received(&self) -> bool {
        false
    }

    /// A queue-backed batch never carries a flush signal.
    pub fn flush_signal_received(&self) -> bool {
        false
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Commit the ack point for every original, cancelled or not.
    ///
    /// No-op for empty batches and for batches already closed. If the queue
    /// rejects the ack the handle is kept, so the batch stays unacknowledged.
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.ack.as_mut() else {
            return Ok(());
        };
        handle.close()?;
        self.ack = None;
        self.acknowledged = true;
        Ok(())
    }
}

impl<E: Event> Default for ReadBatch<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E: Event> fmt::Debug for ReadBatch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadBatch")
            .field("starting_size", &self.starting_size())
            .field("filtered_size", &self.filtered_size())
            .field("cancelled_size", &self.cancelled_size())
            .field("acknowledged", &self.acknowledged)
            .finish()
    }
}

/// Mutations available to a visitor while [`ReadBatch::each`] is walking.
pub struct PassScope<'a, E: Event> {
    current: EventKey,
    /// Events in the batch when the pass started.
    known: usize,
    cancelled: &'a mut FxHashSet<EventKey>,
    staged: &'a mut Vec<E>,
}

impl<E: Event> PassScope<'_, E> {
    /// Key of the event being visited.
    pub fn current(&self) -> EventKey {
        self.current
    }

    /// Stage an event for `generated`; it is visited from the next pass on.
    pub fn merge(&mut self, event: impl Into<Option<E>>) -> Option<EventKey> {
        let event = event.into()?;
        self.staged.push(event);
        Some(EventKey(self.known + self.staged.len() - 1))
    }

    pub fn cancel(&mut self, key: EventKey) -> bool {
        if key.0 >= self.known + self.staged.len() {
            return false;
        }
        self.cancelled.insert(key);
        true
    }

    pub fn cancel_current(&mut self) {
        self.cancelled.insert(self.current);
    }

    pub fn is_cancelled(&self, key: EventKey) -> bool {
        self.cancelled.contains(&key)
    }
}

/// A read batch shared between its consumer and the in-flight registry.
///
/// Holding the guard while calling
/// [`ReadClient::current_inflight_batch`](crate::client::ReadClient::current_inflight_batch)
/// is fine. Release it before taking, closing or enumerating batches.
pub struct SharedReadBatch<E: Event>(Arc<Mutex<ReadBatch<E>>>);

impl<E: Event> SharedReadBatch<E> {
    pub fn new(batch: ReadBatch<E>) -> Self {
        Self(Arc::new(Mutex::new(batch)))
    }

    pub fn lock(&self) -> MutexGuard<'_, ReadBatch<E>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if both handles point at the same batch.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<E: Event> Clone for SharedReadBatch<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: Event> fmt::Debug for SharedReadBatch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Ok(batch) => fmt::Debug::fmt(&*batch, f),
            Err(_) => f.write_str("ReadBatch { <locked> }"),
        }
    }
}
