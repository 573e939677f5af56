//! Worker endpoints for broker testing.
//!
//! All of these compute rows in the calling thread via
//! [`GenerationRequest::compute`]; they differ only in how they get in the
//! way:
//!
//! - [`GatedWorker`] blocks every call until a shared [`Gate`] lets it through.
//! - [`FailingWorker`] fails exactly one call and refuses to terminate.
//! - [`ShortRowsWorker`] drops the last row of its block.
//! - [`CountingWorker`] records how many calls and terminates it saw.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use torus_core::RowBlock;
use torus_worker::{GenerationRequest, WorkerEndpoint, WorkerError};

fn compute(label: &str, request: &GenerationRequest) -> Result<RowBlock, WorkerError> {
    request.compute().map_err(|e| WorkerError::Rejected {
        worker: label.to_string(),
        reason: e.to_string(),
    })
}

// ── Gate ───────────────────────────────────────────────────────────

#[derive(Default)]
struct GateState {
    permits: usize,
    open: bool,
    calls: usize,
}

/// Shared permit counter for [`GatedWorker`]s.
///
/// Each worker call consumes one permit, blocking until one is released.
/// Once [`open`](Gate::open) is called every call passes immediately.
#[derive(Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let `n` more calls through.
    pub fn release(&self, n: usize) {
        self.state.lock().unwrap().permits += n;
        self.changed.notify_all();
    }

    /// Let every current and future call through.
    pub fn open(&self) {
        self.state.lock().unwrap().open = true;
        self.changed.notify_all();
    }

    /// Calls that have entered the gate, including blocked ones.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Block until at least `n` calls have entered, or `timeout` passes.
    pub fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.calls < n {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.changed.wait_timeout(state, deadline - now).unwrap().0;
        }
        true
    }

    fn enter(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        self.changed.notify_all();
        while !state.open && state.permits == 0 {
            state = self.changed.wait(state).unwrap();
        }
        if !state.open {
            state.permits -= 1;
        }
    }
}

// ── GatedWorker ────────────────────────────────────────────────────

/// Blocks each call on a shared [`Gate`], then computes normally.
pub struct GatedWorker {
    label: String,
    gate: Arc<Gate>,
}

impl GatedWorker {
    pub fn new(label: impl Into<String>, gate: Arc<Gate>) -> Self {
        Self {
            label: label.into(),
            gate,
        }
    }
}

impl WorkerEndpoint for GatedWorker {
    fn label(&self) -> &str {
        &self.label
    }

    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError> {
        self.gate.enter();
        compute(&self.label, request)
    }

    fn terminate_self(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}

// ── FailingWorker ──────────────────────────────────────────────────

/// Fails call number `fail_on` (1-based) with
/// [`WorkerError::Unavailable`]; every other call succeeds.
///
/// `terminate_self` always fails, for exercising best-effort shutdown.
pub struct FailingWorker {
    label: String,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FailingWorker {
    pub fn new(label: impl Into<String>, fail_on: usize) -> Self {
        Self {
            label: label.into(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WorkerEndpoint for FailingWorker {
    fn label(&self) -> &str {
        &self.label
    }

    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(WorkerError::Unavailable {
                worker: self.label.clone(),
            });
        }
        compute(&self.label, request)
    }

    fn terminate_self(&self) -> Result<(), WorkerError> {
        Err(WorkerError::Unavailable {
            worker: self.label.clone(),
        })
    }
}

// ── ShortRowsWorker ────────────────────────────────────────────────

/// Returns a block whose cells are one row short of its claimed range.
pub struct ShortRowsWorker {
    label: String,
}

impl ShortRowsWorker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl WorkerEndpoint for ShortRowsWorker {
    fn label(&self) -> &str {
        &self.label
    }

    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError> {
        let mut block = compute(&self.label, request)?;
        let keep = block.cells.len().saturating_sub(block.width);
        block.cells.truncate(keep);
        Ok(block)
    }

    fn terminate_self(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}

// ── CountingWorker ─────────────────────────────────────────────────

/// Computes normally and counts calls and terminate requests.
pub struct CountingWorker {
    label: String,
    calls: AtomicUsize,
    terminated: AtomicBool,
}

impl CountingWorker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            calls: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl WorkerEndpoint for CountingWorker {
    fn label(&self) -> &str {
        &self.label
    }

    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        compute(&self.label, request)
    }

    fn terminate_self(&self) -> Result<(), WorkerError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use torus_core::{partition_rows, Grid};

    fn request(height: usize) -> GenerationRequest {
        let grid = Arc::new(Grid::dead(4, height).unwrap());
        let part = partition_rows(height, 1).unwrap()[0];
        GenerationRequest::new(grid, &part)
    }

    #[test]
    fn gate_counts_and_releases() {
        let gate = Gate::new();
        let worker = Arc::new(GatedWorker::new("g", Arc::clone(&gate)));
        let call = {
            let worker = Arc::clone(&worker);
            thread::spawn(move || worker.compute_next_generation(&request(3)))
        };
        assert!(gate.wait_for_calls(1, Duration::from_secs(5)));
        assert!(!call.is_finished());
        gate.release(1);
        assert!(call.join().unwrap().is_ok());
    }

    #[test]
    fn open_gate_passes_everything() {
        let gate = Gate::new();
        gate.open();
        let worker = GatedWorker::new("g", Arc::clone(&gate));
        for _ in 0..3 {
            worker.compute_next_generation(&request(2)).unwrap();
        }
        assert_eq!(gate.calls(), 3);
    }

    #[test]
    fn failing_worker_fails_once() {
        let worker = FailingWorker::new("f", 2);
        assert!(worker.compute_next_generation(&request(2)).is_ok());
        assert!(worker.compute_next_generation(&request(2)).is_err());
        assert!(worker.compute_next_generation(&request(2)).is_ok());
        assert_eq!(worker.calls(), 3);
        assert!(worker.terminate_self().is_err());
    }

    #[test]
    fn short_rows_drops_last_row() {
        let block = ShortRowsWorker::new("s")
            .compute_next_generation(&request(3))
            .unwrap();
        assert_eq!(block.row_count(), 3);
        assert_eq!(block.cells.len(), 8);
    }

    #[test]
    fn counting_worker_counts() {
        let worker = CountingWorker::new("c");
        worker.compute_next_generation(&request(2)).unwrap();
        worker.terminate_self().unwrap();
        assert_eq!(worker.calls(), 1);
        assert!(worker.terminated());
    }
}
