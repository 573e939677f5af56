//! The Life rule (B3/S23) on a torus.
//!
//! [`next_rows`] is the unit of work a worker performs: it reads the full
//! current grid (neighbours of a boundary row live in another partition)
//! and writes only its own rows. It touches no shared state, so any number
//! of workers may call it concurrently on one `Arc<Grid>`.

use crate::error::GridError;
use crate::grid::{Grid, ALIVE, DEAD};

/// Next-generation state of one cell given its current state and live
/// neighbour count.
#[inline]
pub fn rule(alive: bool, neighbours: u8) -> u8 {
    match (alive, neighbours) {
        (true, 2) | (true, 3) | (false, 3) => ALIVE,
        _ => DEAD,
    }
}

/// Compute the next generation for rows `[start, end)` of `grid`.
///
/// Returns `(end - start) * width` row-major bytes.
pub fn next_rows(grid: &Grid, start: usize, end: usize) -> Result<Vec<u8>, GridError> {
    let height = grid.height();
    let width = grid.width();
    if start > end || end > height {
        return Err(GridError::RowRangeOutOfBounds { start, end, height });
    }

    let cells = grid.as_bytes();
    let mut out = Vec::with_capacity((end - start) * width);
    for y in start..end {
        let above = (y + height - 1) % height;
        let below = (y + 1) % height;
        let (up, mid, down) = (above * width, y * width, below * width);
        for x in 0..width {
            let left = (x + width - 1) % width;
            let right = (x + 1) % width;
            // Indices repeat on grids narrower or shorter than 3; each of
            // the eight offsets still counts once.
            let neighbours = [
                up + left,
                up + x,
                up + right,
                mid + left,
                mid + right,
                down + left,
                down + x,
                down + right,
            ]
            .iter()
            .filter(|&&i| cells[i] == ALIVE)
            .count() as u8;
            out.push(rule(cells[mid + x] == ALIVE, neighbours));
        }
    }
    Ok(out)
}

/// Advance the whole grid by one generation.
pub fn step(grid: &Grid) -> Grid {
    let cells = match next_rows(grid, 0, grid.height()) {
        Ok(cells) => cells,
        Err(_) => unreachable!("full row range is always in bounds"),
    };
    match Grid::from_bytes(grid.width(), grid.height(), cells) {
        Ok(next) => next,
        Err(_) => unreachable!("next_rows only emits ALIVE or DEAD"),
    }
}

/// Advance the whole grid by `turns` generations.
pub fn step_n(grid: &Grid, turns: u64) -> Grid {
    let mut current = grid.clone();
    for _ in 0..turns {
        current = step(&current);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::partition::{partition_rows, stitch, RowBlock};
    use proptest::prelude::*;

    fn cells(width: usize, height: usize, alive: &[(usize, usize)]) -> Grid {
        let alive: Vec<Cell> = alive.iter().map(|&(x, y)| Cell::new(x, y)).collect();
        Grid::from_cells(width, height, &alive).unwrap()
    }

    #[test]
    fn rule_table() {
        assert_eq!(rule(true, 1), DEAD);
        assert_eq!(rule(true, 2), ALIVE);
        assert_eq!(rule(true, 3), ALIVE);
        assert_eq!(rule(true, 4), DEAD);
        assert_eq!(rule(false, 2), DEAD);
        assert_eq!(rule(false, 3), ALIVE);
        assert_eq!(rule(false, 6), DEAD);
    }

    #[test]
    fn lone_cell_dies() {
        let g = cells(3, 3, &[(1, 1)]);
        assert_eq!(step(&g).alive_count(), 0);
    }

    #[test]
    fn live_cell_with_two_or_three_neighbours_survives() {
        // On a 3x3 torus every cell neighbours every other cell.
        let two = cells(3, 3, &[(0, 0), (1, 0), (2, 0)]);
        let next = step(&two);
        assert!(next.is_alive(0, 0));
        assert!(next.is_alive(1, 0));
        assert!(next.is_alive(2, 0));

        let three = cells(3, 3, &[(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert!(step(&three).is_alive(0, 0));
    }

    #[test]
    fn dead_cell_with_three_neighbours_is_born() {
        let g = cells(3, 3, &[(0, 0), (1, 0), (2, 0)]);
        let next = step(&g);
        assert!(next.is_alive(1, 1));
        assert!(next.is_alive(2, 2));
    }

    #[test]
    fn block_is_still_life() {
        let g = cells(3, 3, &[(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(step_n(&g, 17), g);

        let wide = cells(6, 6, &[(2, 2), (3, 2), (2, 3), (3, 3)]);
        assert_eq!(step_n(&wide, 10), wide);
    }

    #[test]
    fn blinker_oscillates() {
        let horizontal = cells(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let vertical = cells(5, 5, &[(2, 1), (2, 2), (2, 3)]);
        assert_eq!(step(&horizontal), vertical);
        assert_eq!(step(&vertical), horizontal);
    }

    #[test]
    fn glider_wraps_around_the_torus() {
        let glider = cells(8, 8, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        // Four generations move it one cell diagonally; 32 bring it home.
        let moved = step_n(&glider, 4);
        assert_eq!(
            moved,
            cells(8, 8, &[(2, 1), (3, 2), (1, 3), (2, 3), (3, 3)])
        );
        assert_eq!(step_n(&glider, 32), glider);
    }

    #[test]
    fn wraparound_counts_opposite_edges() {
        // A vertical blinker straddling the top/bottom seam.
        let g = cells(5, 5, &[(2, 4), (2, 0), (2, 1)]);
        let next = step(&g);
        assert_eq!(next, cells(5, 5, &[(1, 0), (2, 0), (3, 0)]));
    }

    #[test]
    fn sub_range_reads_full_grid() {
        let g = cells(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let rows = next_rows(&g, 1, 2).unwrap();
        assert_eq!(rows, step(&g).row(1).to_vec());
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let g = Grid::dead(4, 4).unwrap();
        assert_eq!(
            next_rows(&g, 2, 5),
            Err(GridError::RowRangeOutOfBounds {
                start: 2,
                end: 5,
                height: 4
            })
        );
        assert!(next_rows(&g, 3, 2).is_err());
        assert_eq!(next_rows(&g, 2, 2).unwrap(), Vec::<u8>::new());
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1usize..24, 1usize..24).prop_flat_map(|(w, h)| {
            prop::collection::vec(any::<bool>(), w * h).prop_map(move |bits| {
                let bytes = bits.into_iter().map(|b| if b { ALIVE } else { DEAD }).collect();
                Grid::from_bytes(w, h, bytes).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn partitioned_step_matches_whole_step(grid in arb_grid(), workers_seed in 0usize..64) {
            let workers = workers_seed % grid.height() + 1;
            let parts = partition_rows(grid.height(), workers).unwrap();
            let blocks: Vec<RowBlock> = parts
                .iter()
                .map(|p| RowBlock {
                    start: p.start,
                    end: p.end,
                    width: grid.width(),
                    cells: next_rows(&grid, p.start, p.end).unwrap(),
                })
                .collect();
            let stitched = stitch(grid.width(), grid.height(), &parts, blocks).unwrap();
            prop_assert_eq!(stitched, step(&grid));
        }
    }
}
