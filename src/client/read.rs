// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read Client - batch take/close coordination
//!
//! One coordination lock serializes taking batches, closing them and
//! enumerating the in-flight registry, and guards the batch dimensions. A
//! snapshot routine that enumerates in-flight batches therefore also blocks
//! new takes and closes.
//!
//! The registry itself sits behind its own lock. It is written only while the
//! coordination lock is held and is never held across a queue read, so a
//! consumer looking up its own slot does not wait behind another consumer's
//! blocking take.
//!
//! # Invariants
//! - at most one registered batch per consumer
//! - a batch leaves the registry only after its ack was committed
//! - lock order: coordination lock, registry lock, batch lock
//!
//! The registry assumes a single read client per queue. Several read clients
//! over one queue would each see only their own consumers.

use crate::batch::{ReadBatch, SharedReadBatch};
use crate::client::ConsumerId;
use crate::config::ReadSettings;
use crate::error::{QueueError, Result};
use crate::metric::{Counter, MetricSink};
use crate::queue::DurableQueue;
use std::collections::BTreeMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::Duration;

pub type InflightBatches<E> = BTreeMap<ConsumerId, SharedReadBatch<E>>;

#[derive(Default)]
struct MetricSinks {
    events: Option<Arc<dyn MetricSink>>,
    pipeline: Option<Arc<dyn MetricSink>>,
}

pub struct ReadClient<Q: DurableQueue> {
    queue: Arc<Q>,
    /// Coordination lock; the batch dimensions live under it.
    coordination: Mutex<ReadSettings>,
    inflight: RwLock<InflightBatches<Q::Event>>,
    sinks: RwLock<MetricSinks>,
}

impl<Q: DurableQueue> ReadClient<Q> {
    /// Read client with the default dimensions (125 events, 5 ms wait).
    pub fn new(queue: Arc<Q>) -> Self {
        Self::with_settings(queue, ReadSettings::default())
    }

    pub fn with_settings(queue: Arc<Q>, settings: ReadSettings) -> Self {
        Self {
            queue,
            coordination: Mutex::new(settings),
            inflight: RwLock::new(BTreeMap::new()),
            sinks: RwLock::new(MetricSinks::default()),
        }
    }

    fn coordinate(&self) -> MutexGuard<'_, ReadSettings> {
        self.coordination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn registry(&self) -> RwLockReadGuard<'_, InflightBatches<Q::Event>> {
        self.inflight.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers must hold the coordination lock.
    fn registry_mut(&self) -> RwLockWriteGuard<'_, InflightBatches<Q::Event>> {
        self.inflight.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_batch_dimensions(&self, batch_size: usize, wait: Duration) {
        *self.coordinate() = ReadSettings::new(batch_size, wait);
    }

    pub fn batch_dimensions(&self) -> ReadSettings {
        *self.coordinate()
    }

    pub fn set_events_metric(&self, sink: Arc<dyn MetricSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .events = Some(sink);
    }

    pub fn set_pipeline_metric(&self, sink: Arc<dyn MetricSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pipeline = Some(sink);
    }

    /// Pull the next batch for `consumer` and register it as in flight.
    ///
    /// Blocks up to the configured wait while holding the coordination lock.
    /// A timeout yields an empty batch, which must still be closed.
    ///
    /// Fails with [`QueueError::BatchInFlight`] without touching the queue if
    /// `consumer` has not closed its previous batch.
    pub fn take_batch(&self, consumer: ConsumerId) -> Result<SharedReadBatch<Q::Event>> {
        let dimensions = self.coordinate();
        if self.registry().contains_key(&consumer) {
            tracing::warn!("{} tried to take a batch while one is in flight", consumer);
            return Err(QueueError::BatchInFlight { consumer });
        }

        let batch = ReadBatch::read_from(self.queue.as_ref(), dimensions.batch_size, dimensions.wait())?;
        self.add_starting_metrics(&batch);

        tracing::trace!("{} took batch of {} events", consumer, batch.starting_size());
        let batch = SharedReadBatch::new(batch);
        self.registry_mut().insert(consumer, batch.clone());
        Ok(batch)
    }

    /// Acknowledge `batch` and drop it from the registry.
    ///
    /// If the ack fails the error is returned and the batch stays registered.
    pub fn close_batch(&self, consumer: ConsumerId, batch: &SharedReadBatch<Q::Event>) -> Result<()> {
        let _coordination = self.coordinate();
        batch.lock().close()?;

        let mut inflight = self.registry_mut();
        match inflight.get(&consumer) {
            Some(registered) if registered.ptr_eq(batch) => {
                inflight.remove(&consumer);
            }
            Some(_) => {
                tracing::warn!("{} closed a batch it does not own; registry left untouched", consumer);
            }
            None => {
                tracing::debug!("{} closed an unregistered batch", consumer);
            }
        }
        Ok(())
    }

    /// Run `visit` over the in-flight registry while holding the coordination
    /// lock. Takes and closes on other consumers wait until it returns.
    pub fn inflight_batches<R, F>(&self, visit: F) -> R
    where
        F: FnOnce(&InflightBatches<Q::Event>) -> R,
    {
        let _coordination = self.coordinate();
        let inflight = self.registry();
        visit(&inflight)
    }

    /// The batch `consumer` currently holds, or an empty unregistered batch.
    ///
    /// Only reads the registry, so it neither waits for a take in progress
    /// nor conflicts with the caller holding its own batch guard.
    pub fn current_inflight_batch(&self, consumer: ConsumerId) -> SharedReadBatch<Q::Event> {
        self.registry()
            .get(&consumer)
            .cloned()
            .unwrap_or_else(|| SharedReadBatch::new(ReadBatch::empty()))
    }

    /// Events of every in-flight batch that the pipeline would still emit.
    pub fn inflight_events(&self) -> Vec<Q::Event> {
        self.inflight_batches(|inflight| {
            inflight
                .values()
                .flat_map(|batch| batch.lock().events())
                .collect()
        })
    }

    fn add_starting_metrics(&self, batch: &ReadBatch<Q::Event>) {
        self.increment(Counter::In, batch.starting_size());
    }

    pub fn add_filtered_metrics(&self, batch: &ReadBatch<Q::Event>) {
        self.increment(Counter::Filtered, batch.filtered_size());
    }

    pub fn add_output_metrics(&self, batch: &ReadBatch<Q::Event>) {
        self.increment(Counter::Out, batch.filtered_size());
    }

    /// Both sinks or nothing.
    fn increment(&self, counter: Counter, amount: usize) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        if let (Some(events), Some(pipeline)) = (&sinks.events, &sinks.pipeline) {
            events.increment(counter, amount as u64);
            pipeline.increment(counter, amount as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::CounterSet;
    use crate::queue::MemoryQueue;

    fn client_with(events: &[u64]) -> (Arc<MemoryQueue<u64>>, ReadClient<MemoryQueue<u64>>) {
        let queue = Arc::new(MemoryQueue::new(64));
        for event in events {
            queue.write(*event).unwrap();
        }
        let client = ReadClient::new(Arc::clone(&queue));
        (queue, client)
    }

    #[test]
    fn test_default_dimensions() {
        let (_, client) = client_with(&[]);
        let dims = client.batch_dimensions();
        assert_eq!(dims.batch_size, 125);
        assert_eq!(dims.wait(), Duration::from_millis(5));
    }

    #[test]
    fn test_dimensions_bound_batch_size() {
        let (_, client) = client_with(&[1, 2, 3, 4, 5]);
        client.set_batch_dimensions(2, Duration::from_millis(1));

        let batch = client.take_batch(ConsumerId(1)).unwrap();
        assert_eq!(batch.lock().starting_size(), 2);
    }

    #[test]
    fn test_double_take_rejected_before_reading() {
        let (queue, client) = client_with(&[1, 2]);
        client.set_batch_dimensions(1, Duration::from_millis(1));

        let first = client.take_batch(ConsumerId(7)).unwrap();
        let err = client.take_batch(ConsumerId(7)).unwrap_err();
        assert_eq!(err, QueueError::BatchInFlight { consumer: ConsumerId(7) });

        // Second event is still queued
        assert_eq!(queue.queued(), vec![2]);
        assert!(client.current_inflight_batch(ConsumerId(7)).ptr_eq(&first));
    }

    #[test]
    fn test_close_of_foreign_batch_keeps_owner_registered() {
        let (_, client) = client_with(&[1, 2]);
        client.set_batch_dimensions(1, Duration::from_millis(1));

        let a = client.take_batch(ConsumerId(1)).unwrap();
        let b = client.take_batch(ConsumerId(2)).unwrap();
        client.close_batch(ConsumerId(1), &b).unwrap();

        assert!(b.lock().is_acknowledged());
        client.inflight_batches(|inflight| {
            assert_eq!(inflight.len(), 2);
            assert!(inflight[&ConsumerId(1)].ptr_eq(&a));
        });
    }

    #[test]
    fn test_metrics_need_both_sinks() {
        let (queue, client) = client_with(&[1, 2, 3]);
        let events = Arc::new(CounterSet::new());
        client.set_events_metric(events.clone());

        let batch = client.take_batch(ConsumerId(1)).unwrap();
        client.add_filtered_metrics(&batch.lock());
        assert_eq!(events.get(Counter::In), 0);
        assert_eq!(events.get(Counter::Filtered), 0);
        client.close_batch(ConsumerId(1), &batch).unwrap();

        let pipeline = Arc::new(CounterSet::new());
        client.set_pipeline_metric(pipeline.clone());
        queue.write(4).unwrap();
        queue.write(5).unwrap();

        let batch = client.take_batch(ConsumerId(1)).unwrap();
        batch.lock().merge(6u64);
        client.add_filtered_metrics(&batch.lock());
        client.add_output_metrics(&batch.lock());
        client.close_batch(ConsumerId(1), &batch).unwrap();

        for sink in [&events, &pipeline] {
            assert_eq!(sink.get(Counter::In), 2);
            assert_eq!(sink.get(Counter::Filtered), 3);
            assert_eq!(sink.get(Counter::Out), 3);
        }
    }
}
