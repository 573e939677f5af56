//! The toroidal cell grid and alive-cell coordinates.

use std::fmt;

use crate::error::GridError;

/// Byte value of a live cell.
pub const ALIVE: u8 = 255;

/// Byte value of a dead cell.
pub const DEAD: u8 = 0;

/// Coordinate of a live cell: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Column index.
    pub x: usize,
    /// Row index.
    pub y: usize,
}

impl Cell {
    /// Create a cell at column `x`, row `y`.
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An immutable `height x width` grid of cells stored row-major.
///
/// Every byte is either [`ALIVE`] or [`DEAD`]; constructors reject
/// anything else. A new grid is produced for each generation, so a grid
/// can be shared read-only across worker threads behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// An all-dead grid.
    pub fn dead(width: usize, height: usize) -> Result<Self, GridError> {
        check_dims(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![DEAD; width * height],
        })
    }

    /// Build a grid from a row-major byte buffer.
    pub fn from_bytes(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        check_dims(width, height)?;
        let expected = width * height;
        if cells.len() != expected {
            return Err(GridError::SizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        if let Some((index, &value)) = cells
            .iter()
            .enumerate()
            .find(|(_, &v)| v != ALIVE && v != DEAD)
        {
            return Err(GridError::InvalidCell { index, value });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from a list of equal-length rows.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        check_dims(width, height)?;
        let mut cells = Vec::with_capacity(width * height);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    actual: r.len(),
                });
            }
            cells.extend_from_slice(r);
        }
        Self::from_bytes(width, height, cells)
    }

    /// A grid where exactly the listed cells are alive.
    ///
    /// Coordinates outside the grid wrap around, matching the torus.
    pub fn from_cells(width: usize, height: usize, alive: &[Cell]) -> Result<Self, GridError> {
        let mut grid = Self::dead(width, height)?;
        for cell in alive {
            let idx = (cell.y % height) * width + (cell.x % width);
            grid.cells[idx] = ALIVE;
        }
        Ok(grid)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major cell bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// The bytes of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.cells[start..start + self.width]
    }

    /// Iterate over rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks_exact(self.width)
    }

    /// Whether the cell at column `x`, row `y` is alive. Indices wrap.
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.cells[(y % self.height) * self.width + (x % self.width)] == ALIVE
    }

    /// Number of live cells.
    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == ALIVE).count()
    }

    /// Coordinates of every live cell in row-major order.
    pub fn alive_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == ALIVE)
            .map(|(i, _)| Cell::new(i % self.width, i / self.width))
            .collect()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}", self.width, self.height)?;
        for row in self.rows() {
            let line: String = row
                .iter()
                .map(|&c| if c == ALIVE { '#' } else { '.' })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn check_dims(width: usize, height: usize) -> Result<(), GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::EmptyGrid { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_grid_has_no_alive_cells() {
        let g = Grid::dead(4, 3).unwrap();
        assert_eq!(g.width(), 4);
        assert_eq!(g.height(), 3);
        assert_eq!(g.alive_count(), 0);
        assert!(g.alive_cells().is_empty());
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            Grid::dead(0, 3),
            Err(GridError::EmptyGrid {
                width: 0,
                height: 3
            })
        );
        assert!(Grid::from_rows::<Vec<u8>>(&[]).is_err());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = Grid::from_bytes(2, 2, vec![DEAD; 3]).unwrap_err();
        assert_eq!(
            err,
            GridError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn from_bytes_rejects_grey_cells() {
        let err = Grid::from_bytes(2, 1, vec![DEAD, 7]).unwrap_err();
        assert_eq!(err, GridError::InvalidCell { index: 1, value: 7 });
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows = vec![vec![DEAD, DEAD], vec![DEAD]];
        assert_eq!(
            Grid::from_rows(&rows),
            Err(GridError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn alive_cells_are_row_major_xy() {
        let g = Grid::from_rows(&[[DEAD, ALIVE, DEAD], [ALIVE, DEAD, ALIVE]]).unwrap();
        assert_eq!(
            g.alive_cells(),
            vec![Cell::new(1, 0), Cell::new(0, 1), Cell::new(2, 1)]
        );
        assert_eq!(g.alive_count(), 3);
    }

    #[test]
    fn from_cells_wraps_coordinates() {
        let g = Grid::from_cells(3, 3, &[Cell::new(4, 5)]).unwrap();
        assert!(g.is_alive(1, 2));
        assert_eq!(g.alive_count(), 1);
    }

    #[test]
    fn row_access_matches_layout() {
        let g = Grid::from_rows(&[[ALIVE, DEAD], [DEAD, ALIVE]]).unwrap();
        assert_eq!(g.row(1), &[DEAD, ALIVE]);
        assert_eq!(g.rows().count(), 2);
    }
}
