//! Broker for partitioned Game of Life runs.
//!
//! A [`Broker`] owns an ordered [`WorkerPool`](torus_worker::WorkerPool).
//! Each submitted run splits the grid into one row range per worker and
//! advances turn by turn: the current grid goes to every worker at once,
//! their rows are stitched back in partition order, and the result is
//! published together with its turn count. Clients can query progress,
//! take snapshots, pause, disconnect, or shut the whole system down while
//! a run is in progress.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod broker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod session;

mod dispatch;
mod run_loop;

pub use broker::{Broker, BrokerState, RunOutcome};
pub use config::{BrokerConfig, ConfigError, RunRequest};
pub use error::{RunError, SubmitError};
pub use metrics::TurnMetrics;
pub use session::{PauseStatus, Progress, RunState, Snapshot};
