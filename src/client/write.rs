// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Write Client - forwards producer output to the durable queue.

use crate::batch::WriteBatch;
use crate::error::Result;
use crate::queue::DurableQueue;
use std::sync::Arc;

pub struct WriteClient<Q: DurableQueue> {
    queue: Arc<Q>,
}

impl<Q: DurableQueue> WriteClient<Q> {
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }

    pub fn new_batch(&self) -> WriteBatch<Q::Event> {
        WriteBatch::new()
    }

    /// Write one event. Blocks while the queue is at capacity.
    pub fn push(&self, event: Q::Event) -> Result<()> {
        self.queue.write(event)
    }

    /// Write every event of `batch` in order.
    ///
    /// Not atomic: the first failure stops the flush, and the events written
    /// before it stay in the queue.
    pub fn push_batch(&self, batch: &WriteBatch<Q::Event>) -> Result<()> {
        for event in batch {
            self.push(event.clone())?;
        }
        Ok(())
    }
}

impl<Q: DurableQueue> Clone for WriteClient<Q> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::queue::MemoryQueue;

    #[test]
    fn test_push_batch_writes_in_order() {
        let queue = Arc::new(MemoryQueue::new(8));
        let client = WriteClient::new(Arc::clone(&queue));

        let mut batch = client.new_batch();
        batch.push("x");
        batch.push("y");
        client.push_batch(&batch).unwrap();

        assert_eq!(queue.queued(), vec!["x", "y"]);
    }

    #[test]
    fn test_push_batch_stops_at_first_failure() {
        let queue = Arc::new(MemoryQueue::new(8));
        let client = WriteClient::new(Arc::clone(&queue));
        queue.close().unwrap();

        let batch: WriteBatch<u64> = (0..3).collect();
        assert_eq!(client.push_batch(&batch), Err(QueueError::Closed));
        assert_eq!(queue.stats().written, 0);
    }
}
