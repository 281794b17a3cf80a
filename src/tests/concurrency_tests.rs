// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::client::ConsumerId;
use crate::config::ReadSettings;
use crate::error::QueueError;
use crate::metric::{Counter, CounterSet};
use crate::queue::MemoryQueue;
use crate::wrapped::AckedQueue;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const PRODUCERS: u64 = 4;
const PER_PRODUCER: u64 = 500;

#[test]
fn test_every_event_delivered_and_acked_once() {
    let queue = AckedQueue::<MemoryQueue<u64>>::with_capacity(64)
        .with_read_settings(ReadSettings::new(16, Duration::from_millis(2)));
    let reader = Arc::new(queue.read_client());
    let counters = Arc::new(CounterSet::new());
    reader.set_events_metric(counters.clone());
    reader.set_pipeline_metric(Arc::new(CounterSet::new()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let writer = queue.write_client();
            thread::spawn(move || {
                let mut batch = writer.new_batch();
                for i in 0..PER_PRODUCER {
                    batch.push(p * PER_PRODUCER + i);
                }
                writer.push_batch(&batch)
            })
        })
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let consumers: Vec<_> = (0..3)
        .map(|c| {
            let reader = Arc::clone(&reader);
            let done = Arc::clone(&done);
            thread::spawn(move || -> Result<Vec<u64>, QueueError> {
                let me = ConsumerId(c);
                let mut seen = Vec::new();
                loop {
                    // Only an empty read that started after the producers finished means drained
                    let finishing = done.load(Ordering::SeqCst);
                    let batch = reader.take_batch(me)?;
                    let empty = {
                        let mut guard = batch.lock();
                        guard.each(|event, _| seen.push(*event));
                        reader.add_output_metrics(&guard);
                        guard.is_empty()
                    };
                    reader.close_batch(me, &batch)?;
                    if empty && finishing {
                        return Ok(seen);
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let mut all = Vec::new();
    for consumer in consumers {
        all.extend(consumer.join().unwrap().unwrap());
    }

    let total = PRODUCERS * PER_PRODUCER;
    let unique: BTreeSet<u64> = all.iter().copied().collect();
    assert_eq!(all.len() as u64, total);
    assert_eq!(unique.len() as u64, total);

    let stats = queue.queue().stats();
    assert_eq!(stats.acked_events, total);
    assert_eq!(stats.unacked, 0);
    assert_eq!(counters.get(Counter::In), total);
    assert_eq!(counters.get(Counter::Out), total);
    reader.inflight_batches(|inflight| assert!(inflight.is_empty()));
}

#[test]
fn test_inflight_enumeration_blocks_take() {
    let queue = AckedQueue::<MemoryQueue<u64>>::with_capacity(8)
        .with_read_settings(ReadSettings::new(4, Duration::from_millis(1)));
    for i in 0..4 {
        queue.push(i).unwrap();
    }
    let reader = Arc::new(queue.read_client());
    let held = reader.take_batch(ConsumerId(1)).unwrap();

    let entered = Arc::new(Barrier::new(2));
    let snapshot = {
        let reader = Arc::clone(&reader);
        let entered = Arc::clone(&entered);
        thread::spawn(move || {
            reader.inflight_batches(|inflight| {
                entered.wait();
                // Hold the coordination lock while another consumer tries to take
                thread::sleep(Duration::from_millis(50));
                inflight.keys().copied().collect::<Vec<_>>()
            })
        })
    };

    entered.wait();
    let started = std::time::Instant::now();
    let other = reader.take_batch(ConsumerId(2)).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));

    assert_eq!(snapshot.join().unwrap(), vec![ConsumerId(1)]);
    reader.close_batch(ConsumerId(2), &other).unwrap();
    reader.close_batch(ConsumerId(1), &held).unwrap();
    assert_eq!(queue.queue().stats().acked_events, 4);
}

#[test]
fn test_unclosed_batch_holds_back_writers() {
    let queue = AckedQueue::<MemoryQueue<u64>>::with_capacity(2)
        .with_read_settings(ReadSettings::new(2, Duration::from_millis(1)));
    queue.push(1).unwrap();
    queue.push(2).unwrap();

    let reader = queue.read_client();
    let batch = reader.take_batch(ConsumerId(1)).unwrap();
    assert!(!queue.offer(3, Duration::from_millis(10)).unwrap());

    reader.close_batch(ConsumerId(1), &batch).unwrap();
    assert!(queue.offer(3, Duration::from_millis(10)).unwrap());
}
