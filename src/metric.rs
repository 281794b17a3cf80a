// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Batch size counters.
//!
//! A read client reports to two optional sinks, one scoped to the events
//! namespace and one to the pipeline. Each receives `in` when a batch is
//! taken and `filtered` / `out` when the pipeline reaches those stages.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    In,
    Filtered,
    Out,
}

impl Counter {
    pub const ALL: [Counter; 3] = [Counter::In, Counter::Filtered, Counter::Out];

    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::In => "in",
            Counter::Filtered => "filtered",
            Counter::Out => "out",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MetricSink: Send + Sync {
    fn increment(&self, counter: Counter, amount: u64);
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct CounterSet {
    input: AtomicU64,
    filtered: AtomicU64,
    out: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    #[serde(rename = "in")]
    pub input: u64,
    pub filtered: u64,
    pub out: u64,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::In => &self.input,
            Counter::Filtered => &self.filtered,
            Counter::Out => &self.out,
        }
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.slot(counter).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            input: self.get(Counter::In),
            filtered: self.get(Counter::Filtered),
            out: self.get(Counter::Out),
        }
    }
}

impl MetricSink for CounterSet {
    fn increment(&self, counter: Counter, amount: u64) {
        self.slot(counter).fetch_add(amount, Ordering::Relaxed);
    }
}

/// Forwards increments to the global `metrics` recorder.
///
/// Counters are `acked_queue_events_{in,filtered,out}_total`, labelled with
/// the sink's `scope` (e.g. "events" or "pipeline").
#[derive(Debug, Clone)]
pub struct RecorderSink {
    scope: &'static str,
}

impl RecorderSink {
    pub fn new(scope: &'static str) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }
}

impl MetricSink for RecorderSink {
    fn increment(&self, counter: Counter, amount: u64) {
        match counter {
            Counter::In => {
                ::metrics::counter!("acked_queue_events_in_total", amount, "scope" => self.scope)
            }
            Counter::Filtered => {
                ::metrics::counter!("acked_queue_events_filtered_total", amount, "scope" => self.scope)
            }
            Counter::Out => {
                ::metrics::counter!("acked_queue_events_out_total", amount, "scope" => self.scope)
            }
        }
    }
}
