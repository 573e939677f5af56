//! Error types for the torus core model.
//!
//! Organized by subsystem: grid construction and row access, row
//! partitioning, and stitching worker output back into a full grid.

use std::error::Error;
use std::fmt;

/// Errors from constructing or reading a [`Grid`](crate::Grid).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// Width or height is zero.
    EmptyGrid {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
    /// The byte buffer does not hold exactly `width * height` cells.
    SizeMismatch {
        /// `width * height`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
    /// A row passed to [`Grid::from_rows`](crate::Grid::from_rows) has the
    /// wrong length.
    RaggedRow {
        /// Index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Length of the offending row.
        actual: usize,
    },
    /// A cell byte is neither `ALIVE` nor `DEAD`.
    InvalidCell {
        /// Row-major index of the cell.
        index: usize,
        /// The offending byte.
        value: u8,
    },
    /// Declared `(width, height)` disagree with the grid they describe.
    DimensionMismatch {
        /// Declared `(width, height)`.
        declared: (usize, usize),
        /// The grid's actual `(width, height)`.
        actual: (usize, usize),
    },
    /// A row range is inverted or extends past the grid height.
    RowRangeOutOfBounds {
        /// First row of the range.
        start: usize,
        /// One past the last row of the range.
        end: usize,
        /// Grid height.
        height: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { width, height } => {
                write!(f, "grid dimensions must be non-zero, got {width}x{height}")
            }
            Self::SizeMismatch { expected, actual } => {
                write!(f, "expected {expected} cells, got {actual}")
            }
            Self::RaggedRow {
                row,
                expected,
                actual,
            } => write!(f, "row {row} has {actual} cells, expected {expected}"),
            Self::InvalidCell { index, value } => {
                write!(f, "cell {index} has value {value}, expected 0 or 255")
            }
            Self::DimensionMismatch { declared, actual } => write!(
                f,
                "declared {}x{} but grid is {}x{}",
                declared.0, declared.1, actual.0, actual.1
            ),
            Self::RowRangeOutOfBounds { start, end, height } => {
                write!(f, "row range [{start}, {end}) is outside [0, {height})")
            }
        }
    }
}

impl Error for GridError {}

/// Errors from [`partition_rows`](crate::partition_rows).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// Zero workers were requested.
    NoWorkers,
    /// Fewer rows than workers: some worker would get an empty range.
    TooFewRows {
        /// Grid height.
        height: usize,
        /// Requested worker count.
        workers: usize,
    },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers => write!(f, "at least one worker is required"),
            Self::TooFewRows { height, workers } => {
                write!(f, "cannot split {height} rows across {workers} workers")
            }
        }
    }
}

impl Error for PartitionError {}

/// Errors from [`stitch`](crate::stitch).
///
/// Any of these means a worker returned output that does not match its
/// assignment. The stitched grid must not be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StitchError {
    /// The number of row blocks differs from the number of partitions.
    BlockCountMismatch {
        /// Number of partitions.
        expected: usize,
        /// Number of blocks received.
        actual: usize,
    },
    /// A block covers different rows than its partition.
    RangeMismatch {
        /// Partition ordinal.
        index: usize,
        /// Partition range `(start, end)`.
        expected: (usize, usize),
        /// Block range `(start, end)`.
        actual: (usize, usize),
    },
    /// A block's byte length does not equal `rows * width`.
    CellCountMismatch {
        /// Partition ordinal.
        index: usize,
        /// Expected byte count.
        expected: usize,
        /// Byte count received.
        actual: usize,
    },
    /// The stitched buffer failed grid validation.
    Grid(GridError),
}

impl fmt::Display for StitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockCountMismatch { expected, actual } => {
                write!(f, "expected {expected} row blocks, got {actual}")
            }
            Self::RangeMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "partition {index} covers rows [{}, {}) but block covers [{}, {})",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::CellCountMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "partition {index} block has {actual} cells, expected {expected}"
            ),
            Self::Grid(e) => write!(f, "stitched grid invalid: {e}"),
        }
    }
}

impl Error for StitchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for StitchError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_dimensions() {
        let e = PartitionError::TooFewRows {
            height: 2,
            workers: 4,
        };
        assert_eq!(e.to_string(), "cannot split 2 rows across 4 workers");
    }

    #[test]
    fn stitch_error_exposes_grid_source() {
        let e = StitchError::from(GridError::SizeMismatch {
            expected: 9,
            actual: 8,
        });
        assert!(e.source().is_some());
        assert!(e.to_string().contains("expected 9 cells"));
    }
}
