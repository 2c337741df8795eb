//! Sharded worker pool feeding events into a [`DamageZoneService`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use damage_schema::DamageEvent;
use thiserror::Error;

use crate::hashing::shard_for;
use crate::service::DamageZoneService;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("ingest pipeline is closed")]
    Closed,
}

/// Event counts observed by the workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn stats(&self) -> IngestStats {
        IngestStats {
            applied: self.applied.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Applies events off the caller's thread.
///
/// Each worker owns one channel and events are routed by a stable hash of the
/// vehicle id, so events for one vehicle are applied in the order enqueued.
pub struct IngestPipeline {
    senders: Vec<Sender<DamageEvent>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl IngestPipeline {
    pub fn spawn(service: Arc<DamageZoneService>, workers: usize) -> Self {
        let workers = workers.max(1);
        let counters = Arc::new(Counters::default());
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for shard in 0..workers {
            let (sender, receiver) = unbounded::<DamageEvent>();
            let service = Arc::clone(&service);
            let counters = Arc::clone(&counters);
            handles.push(thread::spawn(move || {
                run_worker(shard, &service, &receiver, &counters)
            }));
            senders.push(sender);
        }

        tracing::debug!(target: "damage_zones::ingest", workers, "ingest.started");
        Self {
            senders,
            workers: handles,
            counters,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Queue an event without blocking.
    pub fn enqueue(&self, event: DamageEvent) -> Result<(), IngestError> {
        let shard = shard_for(event.vehicle.as_str(), self.senders.len());
        self.senders[shard]
            .send(event)
            .map_err(|_| IngestError::Closed)
    }

    pub fn stats(&self) -> IngestStats {
        self.counters.stats()
    }

    /// Close every queue, wait for pending events to drain and join the workers.
    pub fn shutdown(self) -> IngestStats {
        let Self {
            senders,
            workers,
            counters,
        } = self;
        drop(senders);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!(target: "damage_zones::ingest", "ingest.worker_panicked");
            }
        }
        let stats = counters.stats();
        tracing::debug!(
            target: "damage_zones::ingest",
            applied = stats.applied,
            dropped = stats.dropped,
            failed = stats.failed,
            "ingest.stopped"
        );
        stats
    }
}

fn run_worker(
    shard: usize,
    service: &DamageZoneService,
    receiver: &Receiver<DamageEvent>,
    counters: &Counters,
) {
    while let Ok(event) = receiver.recv() {
        match service.record_event(&event) {
            Ok(outcome) if outcome.is_dropped() => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                counters.applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "damage_zones::ingest",
                    shard,
                    vehicle = %event.vehicle,
                    error = %err,
                    "event.failed"
                );
            }
        }
    }
}
