// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pipeline events as seen by the queue layer.
//!
//! The queue layer never looks inside an event. It only needs to:
//! - clone it (an event can sit in a batch and in the in-flight map at once)
//! - move it across consumer threads
//!
//! Events are not compared. Inside a read batch each event is known by the
//! [`EventKey`](crate::batch::EventKey) the batch gave it, so equal payloads
//! stay separate events.

use std::fmt::Debug;

/// Marker for anything that can travel through the queue.
pub trait Event: Clone + Debug + Send + Sync + 'static {}

impl<T> Event for T where T: Clone + Debug + Send + Sync + 'static {}
