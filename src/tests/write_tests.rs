// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::batch::{ReadBatch, WriteBatch};
use crate::client::WriteClient;
use crate::queue::{DurableQueue, MemoryQueue};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_flushed_batch_lands_in_push_order() {
    let queue = Arc::new(MemoryQueue::new(8));
    let client = WriteClient::new(Arc::clone(&queue));

    let mut batch = client.new_batch();
    batch.push("X");
    batch.push("Y");
    client.push_batch(&batch).unwrap();

    let read = ReadBatch::read_from(queue.as_ref(), 8, Duration::ZERO).unwrap();
    assert_eq!(read.events(), vec!["X", "Y"]);
}

#[test]
fn test_batch_can_be_flushed_twice() {
    let queue = Arc::new(MemoryQueue::new(8));
    let client = WriteClient::new(Arc::clone(&queue));

    let batch: WriteBatch<u64> = [1, 2].into_iter().collect();
    client.push_batch(&batch).unwrap();
    client.push_batch(&batch).unwrap();

    assert_eq!(queue.queued(), vec![1, 2, 1, 2]);
}

#[test]
fn test_push_blocks_until_ack_frees_room() {
    let queue = Arc::new(MemoryQueue::new(2));
    let client = WriteClient::new(Arc::clone(&queue));

    let producer = {
        let client = client.clone();
        thread::spawn(move || {
            let batch: WriteBatch<u64> = (0..4).collect();
            client.push_batch(&batch)
        })
    };

    let mut received = Vec::new();
    while received.len() < 4 {
        let mut batch = ReadBatch::read_from(queue.as_ref(), 2, Duration::from_millis(50)).unwrap();
        received.extend(batch.events());
        batch.close().unwrap();
    }

    producer.join().unwrap().unwrap();
    assert_eq!(received, vec![0, 1, 2, 3]);
    assert_eq!(queue.stats().unacked, 0);
}

#[test]
fn test_partial_flush_keeps_prefix() {
    let queue = Arc::new(MemoryQueue::new(2));
    let client = WriteClient::new(Arc::clone(&queue));

    let producer = {
        let client = client.clone();
        thread::spawn(move || {
            let batch: WriteBatch<u64> = (0..4).collect();
            client.push_batch(&batch)
        })
    };

    // Let the producer fill the queue and block on the third event
    while queue.stats().written < 2 {
        thread::sleep(Duration::from_millis(1));
    }
    queue.close().unwrap();

    assert!(producer.join().unwrap().is_err());
    assert_eq!(queue.queued(), vec![0, 1]);
}
