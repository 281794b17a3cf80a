// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Acked Queue facade.
//!
//! Bundles a durable queue with single-event operations and hands out the
//! read and write clients that share it.

use crate::batch::ReadBatch;
use crate::client::{ReadClient, WriteClient};
use crate::config::{QueueSettings, ReadSettings, TAKE_WAIT_MS};
use crate::error::Result;
use crate::event::Event;
use crate::queue::{DurableQueue, MemoryQueue};
use std::sync::Arc;
use std::time::Duration;

pub struct AckedQueue<Q: DurableQueue> {
    queue: Arc<Q>,
    read_settings: ReadSettings,
}

impl<E: Event> AckedQueue<MemoryQueue<E>> {
    /// In-memory queue holding at most `capacity` unacknowledged events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::open(MemoryQueue::new(capacity))
    }

    pub fn from_settings(settings: &QueueSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::open(MemoryQueue::new(settings.capacity)).with_read_settings(settings.read))
    }
}

impl<Q: DurableQueue> AckedQueue<Q> {
    pub fn open(queue: Q) -> Self {
        Self {
            queue: Arc::new(queue),
            read_settings: ReadSettings::default(),
        }
    }

    /// Dimensions given to read clients created from now on.
    pub fn with_read_settings(mut self, settings: ReadSettings) -> Self {
        self.read_settings = settings;
        self
    }

    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Write `event`, blocking until the queue has room.
    pub fn push(&self, event: Q::Event) -> Result<()> {
        self.queue.write(event)
    }

    /// Write `event` if room frees up within `timeout`.
    pub fn offer(&self, event: Q::Event, timeout: Duration) -> Result<bool> {
        self.queue.offer(event, timeout)
    }

    /// Take a single event, waiting up to 200 ms.
    pub fn take(&self) -> Result<Option<Q::Event>> {
        self.poll(Duration::from_millis(TAKE_WAIT_MS))
    }

    /// Take a single event, waiting up to `wait`. The event is acknowledged
    /// before it is returned.
    pub fn poll(&self, wait: Duration) -> Result<Option<Q::Event>> {
        let mut batch = ReadBatch::read_from(self.queue.as_ref(), 1, wait)?;
        let event = batch.originals().first().cloned();
        batch.close()?;
        Ok(event)
    }

    pub fn write_client(&self) -> WriteClient<Q> {
        WriteClient::new(Arc::clone(&self.queue))
    }

    pub fn read_client(&self) -> ReadClient<Q> {
        ReadClient::with_settings(Arc::clone(&self.queue), self.read_settings)
    }

    pub fn close(&self) -> Result<()> {
        tracing::info!("Closing acked queue");
        self.queue.close()
    }
}

impl<Q: DurableQueue> Clone for AckedQueue<Q> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            read_settings: self.read_settings,
        }
    }
}
