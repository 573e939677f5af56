//! Core types for the torus distributed Life broker.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! grid data model, the row partitioner, stitching of partitioned results,
//! the Life rule itself, and the error types for each.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod id;
pub mod life;
pub mod partition;

pub use error::{GridError, PartitionError, StitchError};
pub use grid::{Cell, Grid, ALIVE, DEAD};
pub use id::SessionId;
pub use life::{next_rows, step, step_n};
pub use partition::{partition_rows, stitch, Partition, RowBlock};
