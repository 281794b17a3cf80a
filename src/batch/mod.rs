// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read and write batches.
//!
//! - [`ReadBatch`]: a snapshot pulled from the durable queue plus the working
//!   set built up by the pipeline; owns the ack handle
//! - [`WriteBatch`]: an ordered buffer a producer fills before flushing

pub mod read;
pub mod write;

pub use read::{EventKey, PassScope, ReadBatch, SharedReadBatch};
pub use write::WriteBatch;
