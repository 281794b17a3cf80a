// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read and write clients over a durable queue.

pub mod read;
pub mod write;

pub use read::{InflightBatches, ReadClient};
pub use write::WriteClient;

use std::fmt;

/// Identity of a consumer (usually one pipeline worker thread).
///
/// Passed explicitly instead of derived from the running thread, so the
/// in-flight registry can be driven and inspected without real threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}
