//! Torus: a partitioned Game of Life on a toroidal grid.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the torus sub-crates. A [`broker::Broker`] splits each generation across
//! a fixed pool of workers and answers client control requests while the
//! run is in progress.
//!
//! # Quick start
//!
//! ```rust
//! use torus::prelude::*;
//!
//! let (pool, _workers) = WorkerPool::spawn_local(2, &WorkerConfig::default()).unwrap();
//! let broker = Broker::new(BrokerConfig::default(), pool);
//!
//! // A blinker flips between horizontal and vertical every turn.
//! let blinker = Grid::from_cells(5, 5, &[Cell::new(1, 2), Cell::new(2, 2), Cell::new(3, 2)])
//!     .unwrap();
//! broker.submit_run(RunRequest::new(blinker.clone(), 2)).unwrap();
//!
//! let outcome = broker.await_result().unwrap().unwrap();
//! assert_eq!(outcome.terminate_turn, 2);
//! assert_eq!(*outcome.final_grid, blinker);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `torus-core` | Grid, Life rule, partitioning, stitching |
//! | [`worker`] | `torus-worker` | Worker endpoint trait, local workers, pools |
//! | [`broker`] | `torus-broker` | Broker, control protocol, run state |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Grid, Life rule, partitioning, and stitching (`torus-core`).
pub use torus_core as types;

/// Worker endpoints and pools (`torus-worker`).
///
/// [`worker::WorkerEndpoint`] is the seam for plugging in workers that
/// live in other processes; [`worker::LocalWorker`] runs in-process.
pub use torus_worker as worker;

/// The broker and its control protocol (`torus-broker`).
pub use torus_broker as broker;

/// Common imports for torus users.
///
/// ```rust
/// use torus::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use torus_core::{step, step_n, Cell, Grid, SessionId, ALIVE, DEAD};

    // Workers
    pub use torus_worker::{WorkerConfig, WorkerEndpoint, WorkerError, WorkerPool};

    // Broker
    pub use torus_broker::{
        Broker, BrokerConfig, BrokerState, PauseStatus, Progress, RunError, RunOutcome,
        RunRequest, RunState, Snapshot, SubmitError,
    };
}
