//! Shared session state.
//!
//! One [`SessionStore`] is shared between the broker (which answers
//! control requests) and the run loop (which publishes turns). Every
//! field a client can observe lives behind a single mutex, so a reader
//! always sees a grid and turn count from the same turn. The grid itself
//! is an `Arc<Grid>` swapped wholesale on publish; readers clone the
//! `Arc` and never hold the lock while looking at cells.
//!
//! The condvar wakes two kinds of waiter: the run loop parked at a turn
//! boundary while paused, and callers of `await_outcome`.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use torus_core::{Grid, SessionId};

use crate::error::RunError;
use crate::metrics::TurnMetrics;

// ── Public views ───────────────────────────────────────────────────

/// Lifecycle of the current run session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No run has been submitted.
    Idle,
    /// Turns are being computed.
    Running,
    /// The run loop is (or will be) parked at the next turn boundary.
    Paused,
    /// Termination was requested; the in-flight turn is finishing.
    Terminating,
    /// The run completed or was terminated; a final result is available.
    Terminated,
    /// A worker or stitch failure abandoned the run.
    Failed,
}

/// Answer to a progress query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Turns fully completed so far.
    pub completed_turns: u64,
    /// Live cells in the grid for `completed_turns`.
    pub alive_cell_count: usize,
}

/// A consistent copy of the current grid.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// The grid after `completed_turns` turns.
    pub grid: Arc<Grid>,
    /// Turns fully completed when the snapshot was taken.
    pub completed_turns: u64,
}

/// Answer to a pause/resume toggle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauseStatus {
    /// Whether the session is paused after this toggle.
    pub paused: bool,
    /// When pausing, the turn that will not start until resumed
    /// (`completed + 1`); when resuming, the turns completed so far.
    pub turn: u64,
    /// Text for the client to display: the turn number when pausing,
    /// `"Continuing"` when resuming.
    pub display_text: String,
}

/// What the run loop should do at a turn boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Boundary {
    /// Start the next turn.
    Proceed,
    /// Termination was requested; stop after the completed turns.
    Stop,
}

// ── SessionStore ───────────────────────────────────────────────────

struct RunSession {
    id: SessionId,
    requested_turns: u64,
    grid: Arc<Grid>,
    completed_turns: u64,
    alive_count: usize,
    paused: bool,
    terminate_requested: bool,
    outcome: Option<Result<u64, RunError>>,
    last_metrics: Option<TurnMetrics>,
}

impl RunSession {
    fn state(&self) -> RunState {
        match &self.outcome {
            Some(Ok(_)) => RunState::Terminated,
            Some(Err(_)) => RunState::Failed,
            None if self.terminate_requested => RunState::Terminating,
            None if self.paused => RunState::Paused,
            None => RunState::Running,
        }
    }
}

/// The current session, or `None` before the first run.
pub(crate) struct SessionStore {
    current: Mutex<Option<RunSession>>,
    changed: Condvar,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(None),
            changed: Condvar::new(),
        }
    }

    // A panic while holding the lock cannot leave a half-written session:
    // every mutation assigns whole fields. Recover the guard.
    fn lock(&self) -> MutexGuard<'_, Option<RunSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any previous session with a fresh one at turn 0.
    pub(crate) fn begin(&self, id: SessionId, grid: Arc<Grid>, requested_turns: u64) {
        let alive_count = grid.alive_count();
        *self.lock() = Some(RunSession {
            id,
            requested_turns,
            grid,
            completed_turns: 0,
            alive_count,
            paused: false,
            terminate_requested: false,
            outcome: None,
            last_metrics: None,
        });
        self.changed.notify_all();
    }

    /// Drop session `id` if it is still current. Used when the run loop
    /// for a freshly begun session never started.
    pub(crate) fn discard(&self, id: SessionId) {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(|s| s.id == id) {
            *guard = None;
        }
        drop(guard);
        self.changed.notify_all();
    }

    /// Publish the grid for `completed_turns`. Grid, turn count and alive
    /// count change together under one lock.
    pub(crate) fn publish(
        &self,
        id: SessionId,
        grid: Arc<Grid>,
        completed_turns: u64,
        metrics: TurnMetrics,
    ) {
        let alive_count = grid.alive_count();
        let mut guard = self.lock();
        if let Some(session) = guard.as_mut().filter(|s| s.id == id) {
            session.grid = grid;
            session.completed_turns = completed_turns;
            session.alive_count = alive_count;
            session.last_metrics = Some(metrics);
        }
    }

    /// Block while session `id` is paused, then report whether the next
    /// turn may start. A superseded session always stops.
    pub(crate) fn wait_at_boundary(&self, id: SessionId) -> Boundary {
        let mut guard = self.lock();
        loop {
            match guard.as_ref() {
                Some(s) if s.id == id && !s.terminate_requested => {
                    if !s.paused {
                        return Boundary::Proceed;
                    }
                }
                _ => return Boundary::Stop,
            }
            guard = self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Record the outcome of session `id`. Only the first call counts.
    pub(crate) fn finish(&self, id: SessionId, outcome: Result<u64, RunError>) {
        let mut guard = self.lock();
        if let Some(session) = guard.as_mut().filter(|s| s.id == id) {
            if session.outcome.is_none() {
                session.outcome = Some(outcome);
            }
        }
        drop(guard);
        self.changed.notify_all();
    }

    pub(crate) fn progress(&self) -> Option<Progress> {
        self.lock().as_ref().map(|s| Progress {
            completed_turns: s.completed_turns,
            alive_cell_count: s.alive_count,
        })
    }

    pub(crate) fn snapshot(&self) -> Option<Snapshot> {
        self.lock().as_ref().map(|s| Snapshot {
            grid: Arc::clone(&s.grid),
            completed_turns: s.completed_turns,
        })
    }

    /// Flip the pause flag and wake the run loop.
    pub(crate) fn toggle_pause(&self) -> Option<PauseStatus> {
        let mut guard = self.lock();
        let session = guard.as_mut()?;
        session.paused = !session.paused;
        let status = if session.paused {
            let turn = session.completed_turns + 1;
            PauseStatus {
                paused: true,
                turn,
                display_text: turn.to_string(),
            }
        } else {
            PauseStatus {
                paused: false,
                turn: session.completed_turns,
                display_text: "Continuing".to_string(),
            }
        };
        drop(guard);
        self.changed.notify_all();
        Some(status)
    }

    /// Ask the current session to stop at the next turn boundary. Returns
    /// the session id if one was still running.
    pub(crate) fn request_terminate(&self) -> Option<SessionId> {
        let mut guard = self.lock();
        let session = guard.as_mut().filter(|s| s.outcome.is_none())?;
        session.terminate_requested = true;
        let id = session.id;
        drop(guard);
        self.changed.notify_all();
        Some(id)
    }

    pub(crate) fn state(&self) -> RunState {
        self.lock().as_ref().map_or(RunState::Idle, RunSession::state)
    }

    /// The session that blocks a new submission: one that is running or
    /// paused and has not been asked to terminate.
    pub(crate) fn blocking_session(&self) -> Option<SessionId> {
        self.lock()
            .as_ref()
            .filter(|s| matches!(s.state(), RunState::Running | RunState::Paused))
            .map(|s| s.id)
    }

    pub(crate) fn requested_turns(&self) -> Option<u64> {
        self.lock().as_ref().map(|s| s.requested_turns)
    }

    pub(crate) fn last_metrics(&self) -> Option<TurnMetrics> {
        self.lock().as_ref().and_then(|s| s.last_metrics.clone())
    }

    /// Block until the current session has an outcome. Returns the final
    /// grid with the outcome, or `None` if no session exists.
    pub(crate) fn await_outcome(&self) -> Option<(Arc<Grid>, Result<u64, RunError>)> {
        let mut guard = self.lock();
        loop {
            let session = guard.as_ref()?;
            if let Some(outcome) = &session.outcome {
                return Some((Arc::clone(&session.grid), outcome.clone()));
            }
            guard = self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
