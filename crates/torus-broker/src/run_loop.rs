//! The run loop.
//!
//! One thread per session owns the current grid and the dispatch lanes.
//! Each iteration checks the session at the turn boundary (parking while
//! paused), dispatches the grid to every lane, stitches the replies, and
//! publishes the new grid with its turn count in one step.
//!
//! A turn is either published whole or not at all: a worker or stitch
//! failure ends the run with the previous turn still visible.

use std::sync::Arc;
use std::time::Instant;

use torus_core::{stitch, Grid, Partition, SessionId};
use tracing::{debug, info, warn};

use crate::dispatch::DispatchLanes;
use crate::error::RunError;
use crate::metrics::TurnMetrics;
use crate::session::{Boundary, SessionStore};

/// State moved into the run thread.
pub(crate) struct RunLoop {
    id: SessionId,
    store: Arc<SessionStore>,
    lanes: DispatchLanes,
    partitions: Vec<Partition>,
    grid: Arc<Grid>,
    turns: u64,
}

/// Records [`RunError::LoopPanicked`] if the run thread unwinds before
/// reporting an outcome, so `await_result` callers are never stranded.
struct OutcomeGuard {
    id: SessionId,
    store: Arc<SessionStore>,
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        self.store.finish(self.id, Err(RunError::LoopPanicked));
    }
}

impl RunLoop {
    pub(crate) fn new(
        id: SessionId,
        store: Arc<SessionStore>,
        lanes: DispatchLanes,
        partitions: Vec<Partition>,
        grid: Arc<Grid>,
        turns: u64,
    ) -> Self {
        Self {
            id,
            store,
            lanes,
            partitions,
            grid,
            turns,
        }
    }

    /// Drive the session to completion and record its outcome.
    pub(crate) fn run(mut self) {
        let _guard = OutcomeGuard {
            id: self.id,
            store: Arc::clone(&self.store),
        };
        info!(
            session = %self.id,
            turns = self.turns,
            workers = self.lanes.len(),
            "run started"
        );

        let outcome = self.drive();
        match &outcome {
            Ok(completed) if *completed == self.turns => {
                info!(session = %self.id, completed, "run finished");
            }
            Ok(completed) => {
                info!(session = %self.id, completed, requested = self.turns, "run terminated early");
            }
            Err(e) => warn!(session = %self.id, error = %e, "run failed"),
        }
        self.store.finish(self.id, outcome);
    }

    fn drive(&mut self) -> Result<u64, RunError> {
        let mut completed = 0;
        while completed < self.turns {
            if self.store.wait_at_boundary(self.id) == Boundary::Stop {
                return Ok(completed);
            }
            self.execute_turn(completed + 1)?;
            completed += 1;
        }
        Ok(completed)
    }

    fn execute_turn(&mut self, turn: u64) -> Result<(), RunError> {
        let turn_start = Instant::now();

        let replies = self.lanes.dispatch(&self.grid)?;
        let dispatch_us = turn_start.elapsed().as_micros() as u64;

        let stitch_start = Instant::now();
        let next = stitch(
            self.grid.width(),
            self.grid.height(),
            &self.partitions,
            replies.blocks,
        )?;
        let stitch_us = stitch_start.elapsed().as_micros() as u64;

        let next = Arc::new(next);
        let metrics = TurnMetrics {
            turn,
            total_us: turn_start.elapsed().as_micros() as u64,
            dispatch_us,
            stitch_us,
            worker_us: replies.worker_us,
        };
        debug!(
            session = %self.id,
            turn,
            total_us = metrics.total_us,
            slowest_worker_us = metrics.slowest_worker_us(),
            "turn complete"
        );
        self.store.publish(self.id, Arc::clone(&next), turn, metrics);
        self.grid = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RunState;
    use torus_core::{partition_rows, step_n, ALIVE};
    use torus_worker::{WorkerConfig, WorkerPool};

    fn glider() -> Grid {
        let mut bytes = vec![0u8; 64];
        for (x, y) in [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
            bytes[y * 8 + x] = ALIVE;
        }
        Grid::from_bytes(8, 8, bytes).unwrap()
    }

    fn run_to_end(workers: usize, turns: u64) -> (Arc<SessionStore>, Grid) {
        let initial = glider();
        let (pool, _handles) = WorkerPool::spawn_local(workers, &WorkerConfig::default()).unwrap();
        let parts = partition_rows(8, workers).unwrap();
        let lanes = DispatchLanes::spawn(&pool, &parts, SessionId(1)).unwrap();
        let store = Arc::new(SessionStore::new());
        let grid = Arc::new(initial.clone());
        store.begin(SessionId(1), Arc::clone(&grid), turns);
        RunLoop::new(SessionId(1), Arc::clone(&store), lanes, parts, grid, turns).run();
        (store, initial)
    }

    #[test]
    fn runs_requested_turns() {
        let (store, initial) = run_to_end(3, 12);
        assert_eq!(store.state(), RunState::Terminated);
        let (grid, outcome) = store.await_outcome().unwrap();
        assert_eq!(outcome, Ok(12));
        assert_eq!(*grid, step_n(&initial, 12));
        assert_eq!(store.last_metrics().unwrap().turn, 12);
        assert_eq!(store.last_metrics().unwrap().worker_us.len(), 3);
    }

    #[test]
    fn zero_turns_returns_initial_grid() {
        let (store, initial) = run_to_end(2, 0);
        let (grid, outcome) = store.await_outcome().unwrap();
        assert_eq!(outcome, Ok(0));
        assert_eq!(*grid, initial);
        assert!(store.last_metrics().is_none());
    }

    #[test]
    fn terminate_before_start_stops_at_zero() {
        let (pool, _handles) = WorkerPool::spawn_local(1, &WorkerConfig::default()).unwrap();
        let parts = partition_rows(8, 1).unwrap();
        let lanes = DispatchLanes::spawn(&pool, &parts, SessionId(4)).unwrap();
        let store = Arc::new(SessionStore::new());
        let grid = Arc::new(glider());
        store.begin(SessionId(4), Arc::clone(&grid), 50);
        store.request_terminate();
        RunLoop::new(SessionId(4), Arc::clone(&store), lanes, parts, grid, 50).run();
        assert_eq!(store.await_outcome().unwrap().1, Ok(0));
    }
}
