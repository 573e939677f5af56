//! Benchmark profiles for the torus broker.
//!
//! - [`reference_grid`]: 128x128 grid, roughly half alive, fixed seed.
//! - [`local_broker`]: broker over `n` in-process workers.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use torus_broker::{Broker, BrokerConfig};
use torus_core::Grid;
use torus_worker::{LocalWorker, WorkerConfig, WorkerError, WorkerPool};

/// The 128x128 reference grid used across benchmarks.
pub fn reference_grid() -> Grid {
    torus_test_utils::lcg_grid(128, 128, 42)
}

/// A broker over `workers` in-process workers, plus their handles.
pub fn local_broker(workers: usize) -> Result<(Broker, Vec<Arc<LocalWorker>>), WorkerError> {
    let (pool, handles) = WorkerPool::spawn_local(workers, &WorkerConfig::default())?;
    Ok((Broker::new(BrokerConfig::default(), pool), handles))
}
