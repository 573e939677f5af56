//! Test utilities for torus development.
//!
//! Provides reference grids ([`glider`], [`blinker`], [`lcg_grid`]) and
//! fault-injecting worker endpoints in [`fixtures`] for driving the
//! broker through pause, disconnect, and failure scenarios.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::thread;
use std::time::{Duration, Instant};

use torus_core::{Cell, Grid};

/// Build a grid from ASCII art: `#` is alive, anything else dead.
///
/// Panics on ragged or empty input.
pub fn grid_from_art(rows: &[&str]) -> Grid {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let mut alive = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), width, "ragged art row {y}");
        for (x, ch) in row.chars().enumerate() {
            if ch == '#' {
                alive.push(Cell::new(x, y));
            }
        }
    }
    Grid::from_cells(width, height, &alive).expect("art must be non-empty")
}

/// A glider in the top-left corner of a `width` x `height` torus.
pub fn glider(width: usize, height: usize) -> Grid {
    let cells = [
        Cell::new(1, 0),
        Cell::new(2, 1),
        Cell::new(0, 2),
        Cell::new(1, 2),
        Cell::new(2, 2),
    ];
    Grid::from_cells(width, height, &cells).expect("positive dimensions")
}

/// A horizontal blinker centred in a `width` x `height` torus.
pub fn blinker(width: usize, height: usize) -> Grid {
    let (cx, cy) = (width / 2, height / 2);
    let cells = [
        Cell::new(cx + width - 1, cy),
        Cell::new(cx, cy),
        Cell::new(cx + 1, cy),
    ];
    Grid::from_cells(width, height, &cells).expect("positive dimensions")
}

/// A deterministic pseudo-random grid, roughly half alive.
///
/// Uses a 64-bit linear congruential generator so fixtures are stable
/// across platforms and crate versions.
pub fn lcg_grid(width: usize, height: usize, seed: u64) -> Grid {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let mut alive = Vec::new();
    for y in 0..height {
        for x in 0..width {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            if state >> 63 == 1 {
                alive.push(Cell::new(x, y));
            }
        }
    }
    Grid::from_cells(width, height, &alive).expect("positive dimensions")
}

/// Poll `condition` every millisecond until it holds or `timeout` passes.
/// Returns whether the condition held.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torus_core::step;

    #[test]
    fn art_matches_cells() {
        let g = grid_from_art(&["....", ".##.", ".##.", "...."]);
        assert_eq!(g.width(), 4);
        assert_eq!(g.alive_count(), 4);
        assert!(g.is_alive(1, 1));
        assert!(!g.is_alive(0, 0));
    }

    #[test]
    fn blinker_oscillates() {
        let b = blinker(5, 5);
        assert_eq!(b.alive_count(), 3);
        assert_ne!(step(&b), b);
        assert_eq!(step(&step(&b)), b);
    }

    #[test]
    fn lcg_grid_is_deterministic() {
        let a = lcg_grid(16, 9, 7);
        assert_eq!(a, lcg_grid(16, 9, 7));
        assert_ne!(a, lcg_grid(16, 9, 8));
        let alive = a.alive_count();
        assert!(alive > 16 && alive < 128, "alive = {alive}");
    }

    #[test]
    fn wait_until_times_out() {
        assert!(wait_until(Duration::from_millis(5), || true));
        assert!(!wait_until(Duration::from_millis(5), || false));
    }
}
