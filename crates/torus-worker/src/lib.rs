//! Workers for the torus broker.
//!
//! A worker computes one generation of the Life rule for the row range it
//! is assigned, reading the full current grid. Workers hold no game state
//! between calls; the only state they keep is whether they have been told
//! to terminate.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod endpoint;
pub mod error;
pub mod local;
pub mod pool;

pub use endpoint::{GenerationRequest, WorkerEndpoint};
pub use error::WorkerError;
pub use local::{LocalWorker, WorkerConfig};
pub use pool::WorkerPool;
