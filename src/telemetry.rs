// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Process-wide logging and metrics setup for binaries embedding the queue.
//!
//! Library code only emits `tracing` events and `metrics` counters; nothing is
//! recorded until a binary calls one of the init functions here.

use crate::error::{QueueError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "acked_queue=info";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the tracing subscriber (fmt output, filter from `RUST_LOG`).
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| QueueError::Telemetry(e.to_string()))
}

/// Install the tracing subscriber plus a Prometheus recorder, and describe
/// the batch size counters reported by [`RecorderSink`](crate::metric::RecorderSink).
///
/// Fails if either global was already installed.
pub fn init_telemetry() -> Result<()> {
    init_tracing()?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| QueueError::Telemetry(e.to_string()))?;

    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already stored; keeping the first one");
    }

    ::metrics::describe_counter!("acked_queue_events_in_total", "Events pulled into read batches");
    ::metrics::describe_counter!("acked_queue_events_filtered_total", "Batch events after the filter stage");
    ::metrics::describe_counter!("acked_queue_events_out_total", "Batch events after the output stage");
    Ok(())
}

/// Prometheus text exposition of the batch counters, or a comment line if
/// [`init_telemetry`] has not run.
pub fn render_metrics() -> String {
    PROM_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_else(|| "# acked-queue recorder not installed".to_string())
}
