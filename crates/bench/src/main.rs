// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use acked_queue::metric::{CounterSet, RecorderSink};
use acked_queue::{telemetry, AckedQueue, ConsumerId, MemoryQueue, QueueSettings};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Derived events carry this bit so they never collide with produced ids.
const DERIVED_BIT: u64 = 1 << 63;

#[derive(Parser)]
#[command(name = "bench_pipeline")]
#[command(about = "Drive producers and consumers through an in-memory acked queue", long_about = None)]
struct Args {
    /// Producer threads
    #[arg(long, default_value_t = 4)]
    producers: u64,

    /// Consumer threads
    #[arg(long, default_value_t = 2)]
    consumers: u64,

    /// Events written by each producer
    #[arg(long, default_value_t = 100_000)]
    events: u64,

    /// Events per write batch
    #[arg(long, default_value_t = 250)]
    write_batch: usize,

    /// Cancel every Nth event in the filter stage (0 disables)
    #[arg(long, default_value_t = 10)]
    drop_every: u64,

    /// Derive a new event from every Nth event in the filter stage (0 disables)
    #[arg(long, default_value_t = 7)]
    derive_every: u64,

    /// JSON queue settings; defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Install the Prometheus recorder and print the scrape output at the end
    #[arg(long)]
    prometheus: bool,
}

fn load_settings(path: Option<&PathBuf>) -> Result<QueueSettings> {
    let Some(path) = path else {
        return Ok(QueueSettings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(QueueSettings::from_json_str(&raw)?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.prometheus {
        telemetry::init_telemetry()?;
    } else {
        telemetry::init_tracing()?;
    }

    let settings = load_settings(args.config.as_ref())?;
    tracing::info!("Starting pipeline bench with {:?}", settings);

    let queue = AckedQueue::<MemoryQueue<u64>>::from_settings(&settings)?;
    let reader = Arc::new(queue.read_client());
    let counters = Arc::new(CounterSet::new());
    if args.prometheus {
        reader.set_events_metric(Arc::new(RecorderSink::new("events")));
        reader.set_pipeline_metric(Arc::new(RecorderSink::new("pipeline")));
    } else {
        reader.set_events_metric(counters.clone());
        reader.set_pipeline_metric(Arc::new(CounterSet::new()));
    }

    let start = Instant::now();

    let producers: Vec<_> = (0..args.producers)
        .map(|p| {
            let writer = queue.write_client();
            let (events, chunk) = (args.events, args.write_batch.max(1));
            thread::spawn(move || -> acked_queue::Result<()> {
                let mut batch = writer.new_batch();
                for i in 0..events {
                    batch.push(p * events + i);
                    if batch.len() == chunk {
                        writer.push_batch(&batch)?;
                        batch = writer.new_batch();
                    }
                }
                writer.push_batch(&batch)
            })
        })
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let consumers: Vec<_> = (0..args.consumers)
        .map(|c| {
            let reader = Arc::clone(&reader);
            let done = Arc::clone(&done);
            let (drop_every, derive_every) = (args.drop_every, args.derive_every);
            thread::spawn(move || -> acked_queue::Result<u64> {
                let me = ConsumerId(c);
                let mut emitted = 0u64;
                loop {
                    let finishing = done.load(Ordering::SeqCst);
                    let batch = reader.take_batch(me)?;
                    let empty = {
                        let mut batch = batch.lock();
                        batch.each(|event, scope| {
                            if event & DERIVED_BIT != 0 {
                                return;
                            }
                            if drop_every > 0 && event % drop_every == 0 {
                                scope.cancel_current();
                            } else if derive_every > 0 && event % derive_every == 0 {
                                scope.merge(event | DERIVED_BIT);
                            }
                        });
                        reader.add_filtered_metrics(&batch);
                        batch.each(|_, _| emitted += 1);
                        reader.add_output_metrics(&batch);
                        batch.is_empty()
                    };
                    reader.close_batch(me, &batch)?;
                    if empty && finishing {
                        return Ok(emitted);
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer panicked"))??;
    }
    done.store(true, Ordering::SeqCst);

    let mut emitted = 0;
    for consumer in consumers {
        emitted += consumer
            .join()
            .map_err(|_| anyhow::anyhow!("consumer panicked"))??;
    }

    let seconds = start.elapsed().as_secs_f64();
    let written = args.producers * args.events;
    let stats = queue.queue().stats();
    queue.close()?;

    println!("--------------------------------------------------");
    println!("Pipeline bench complete");
    println!("   - Written:    {}", written);
    println!("   - Acked:      {} events in {} batches", stats.acked_events, stats.acked_batches);
    println!("   - Emitted:    {}", emitted);
    println!("   - Time:       {:.4} seconds", seconds);
    println!("   - Throughput: {:.2} events/s", written as f64 / seconds);
    if args.prometheus {
        println!("{}", telemetry::render_metrics());
    } else {
        println!("   - Counters:   {}", serde_json::to_string(&counters.snapshot())?);
    }
    println!("--------------------------------------------------");
    Ok(())
}
