//! User-facing [`Broker`] API and shutdown state machine.
//!
//! # Architecture
//!
//! ```text
//! Client thread(s)           Run thread                Dispatch lanes (N)
//!     |                          |                           |
//!     |--submit_run()----------->| spawned per session       |
//!     |                          | wait_at_boundary()        |
//!     |                          |--LaneTask(grid)---------->| compute_next_generation()
//!     |                          |<--LaneReply(rows)---------|
//!     |                          | stitch()                  |
//!     |                          | store.publish()           |
//!     |                          |                           |
//!     |--query_progress()/snapshot()--> SessionStore (Mutex)  |
//!     |--pause_or_resume()/disconnect_client()--> flags + Condvar
//!     |--await_result()--------> blocks on SessionStore Condvar
//! ```
//!
//! Every control method takes `&self`, so a broker can be shared between
//! client threads behind an `Arc`. Sessions are sequential: a new run is
//! accepted only once the previous one has finished or been told to stop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use torus_core::{Cell, Grid, SessionId};
use torus_worker::WorkerPool;
use tracing::{info, warn};

use crate::config::{BrokerConfig, RunRequest};
use crate::dispatch::DispatchLanes;
use crate::error::{RunError, SubmitError};
use crate::metrics::TurnMetrics;
use crate::run_loop::RunLoop;
use crate::session::{PauseStatus, Progress, RunState, SessionStore, Snapshot};

/// Lifecycle of the broker itself, independent of any run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerState {
    /// Accepting runs and control requests.
    Serving,
    /// A full shutdown was requested; waiting out the grace period.
    ShuttingDown,
    /// The grace period has elapsed.
    Stopped,
}

/// Final result of a run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// The grid after `terminate_turn` turns.
    pub final_grid: Arc<Grid>,
    /// Live cells of `final_grid`, row-major.
    pub alive_cells: Vec<Cell>,
    /// Turns completed: the requested count, or the last turn completed
    /// before termination was observed.
    pub terminate_turn: u64,
}

// ── Lifecycle ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Serving,
    ShuttingDown { stop_at: Instant },
}

struct Lifecycle {
    phase: Mutex<Phase>,
    changed: Condvar,
}

impl Lifecycle {
    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> BrokerState {
        match *self.lock() {
            Phase::Serving => BrokerState::Serving,
            Phase::ShuttingDown { stop_at } if Instant::now() < stop_at => {
                BrokerState::ShuttingDown
            }
            Phase::ShuttingDown { .. } => BrokerState::Stopped,
        }
    }
}

// ── Broker ─────────────────────────────────────────────────────────

/// Coordinates runs across a fixed worker pool and answers client
/// control requests.
pub struct Broker {
    config: BrokerConfig,
    pool: WorkerPool,
    store: Arc<SessionStore>,
    run_thread: Mutex<Option<JoinHandle<()>>>,
    next_session: AtomicU64,
    lifecycle: Lifecycle,
}

impl Broker {
    /// Create a broker over an ordered worker pool.
    ///
    /// An empty pool is accepted here; every submission will then fail
    /// with [`ConfigError::NoWorkers`](crate::ConfigError::NoWorkers).
    pub fn new(config: BrokerConfig, pool: WorkerPool) -> Self {
        info!(workers = pool.len(), "broker serving");
        Self {
            config,
            pool,
            store: Arc::new(SessionStore::new()),
            run_thread: Mutex::new(None),
            next_session: AtomicU64::new(1),
            lifecycle: Lifecycle {
                phase: Mutex::new(Phase::Serving),
                changed: Condvar::new(),
            },
        }
    }

    /// Start a run.
    ///
    /// Validates the request, computes the partition plan, installs a
    /// fresh session at turn 0, and starts its run thread. Fails with
    /// [`SubmitError::SessionActive`] while the previous run is running
    /// or paused; a previous run that has finished or been told to stop
    /// is joined first.
    pub fn submit_run(&self, request: RunRequest) -> Result<SessionId, SubmitError> {
        if self.lifecycle.state() != BrokerState::Serving {
            return Err(SubmitError::ShuttingDown);
        }
        let partitions = request.plan(self.pool.len())?;

        let mut slot = self
            .run_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Shutdown flips the phase under this lock; re-check so a session
        // is never installed after shutdown has already looked for one.
        if self.lifecycle.state() != BrokerState::Serving {
            return Err(SubmitError::ShuttingDown);
        }
        if let Some(session) = self.store.blocking_session() {
            return Err(SubmitError::SessionActive { session });
        }
        if let Some(previous) = slot.take() {
            let _ = previous.join();
        }

        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let lanes = DispatchLanes::spawn(&self.pool, &partitions, id).map_err(|e| {
            SubmitError::ThreadSpawnFailed {
                reason: e.to_string(),
            }
        })?;

        let grid = Arc::new(request.grid);
        self.store.begin(id, Arc::clone(&grid), request.turns);
        let run = RunLoop::new(
            id,
            Arc::clone(&self.store),
            lanes,
            partitions,
            grid,
            request.turns,
        );
        let handle = match thread::Builder::new()
            .name(format!("torus-run-{id}"))
            .spawn(move || run.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                self.store.discard(id);
                return Err(SubmitError::ThreadSpawnFailed {
                    reason: e.to_string(),
                });
            }
        };
        *slot = Some(handle);

        info!(
            session = %id,
            width = request.width,
            height = request.height,
            turns = request.turns,
            "run submitted"
        );
        Ok(id)
    }

    /// Completed turns and live-cell count, from the same turn.
    pub fn query_progress(&self) -> Option<Progress> {
        self.store.progress()
    }

    /// The current grid and its turn count.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.store.snapshot()
    }

    /// Toggle pause. Takes effect at the next turn boundary; a turn in
    /// flight always completes.
    pub fn pause_or_resume(&self) -> Option<PauseStatus> {
        let status = self.store.toggle_pause()?;
        info!(paused = status.paused, turn = status.turn, "pause toggled");
        Some(status)
    }

    /// Stop the current run after the turn in flight. Workers and the
    /// broker keep serving.
    pub fn disconnect_client(&self) {
        if let Some(session) = self.store.request_terminate() {
            info!(session = %session, "client disconnected, terminating run");
        }
    }

    /// Stop the current run, tell every worker to terminate, and stop the
    /// broker after [`BrokerConfig::shutdown_grace_ms`].
    ///
    /// Worker failures are logged and otherwise ignored. Calling this more
    /// than once has no further effect.
    pub fn shutdown_everything(&self) {
        let session = {
            // Held across the phase change and the terminate request so no
            // submission can install a session in between.
            let _slot = self
                .run_thread
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            {
                let mut phase = self.lifecycle.lock();
                if *phase != Phase::Serving {
                    return;
                }
                *phase = Phase::ShuttingDown {
                    stop_at: Instant::now() + Duration::from_millis(self.config.shutdown_grace_ms),
                };
            }
            self.store.request_terminate()
        };
        self.lifecycle.changed.notify_all();

        info!(
            session = session.map(|s| s.0),
            grace_ms = self.config.shutdown_grace_ms,
            "full shutdown requested"
        );
        for (index, worker) in self.pool.iter().enumerate() {
            if let Err(e) = worker.terminate_self() {
                warn!(worker = index, label = worker.label(), error = %e, "worker terminate failed");
            }
        }
    }

    /// Block until the current run reaches Terminated or Failed.
    ///
    /// Returns `Ok(None)` if no run was ever submitted.
    pub fn await_result(&self) -> Result<Option<RunOutcome>, RunError> {
        match self.store.await_outcome() {
            None => Ok(None),
            Some((grid, Ok(terminate_turn))) => Ok(Some(RunOutcome {
                alive_cells: grid.alive_cells(),
                final_grid: grid,
                terminate_turn,
            })),
            Some((_, Err(e))) => Err(e),
        }
    }

    /// State of the current run session.
    pub fn state(&self) -> RunState {
        self.store.state()
    }

    /// Turn count requested for the current session.
    pub fn requested_turns(&self) -> Option<u64> {
        self.store.requested_turns()
    }

    /// State of the broker.
    pub fn broker_state(&self) -> BrokerState {
        self.lifecycle.state()
    }

    /// Block until the broker is [`BrokerState::Stopped`], then join the
    /// run thread. Blocks indefinitely if no shutdown is ever requested.
    pub fn wait_for_shutdown(&self) {
        let mut phase = self.lifecycle.lock();
        loop {
            match *phase {
                Phase::Serving => {
                    phase = self
                        .lifecycle
                        .changed
                        .wait(phase)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Phase::ShuttingDown { stop_at } => {
                    let now = Instant::now();
                    if now >= stop_at {
                        break;
                    }
                    phase = self
                        .lifecycle
                        .changed
                        .wait_timeout(phase, stop_at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        drop(phase);
        self.join_run_thread();
        info!("broker stopped");
    }

    /// Timing for the most recently published turn.
    pub fn last_turn_metrics(&self) -> Option<TurnMetrics> {
        self.store.last_metrics()
    }

    fn join_run_thread(&self) {
        let handle = self
            .run_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.store.request_terminate();
        self.join_run_thread();
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("pool", &self.pool)
            .field("state", &self.state())
            .field("broker_state", &self.broker_state())
            .finish()
    }
}
