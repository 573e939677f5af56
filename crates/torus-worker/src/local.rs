//! In-process worker with its own listener thread.
//!
//! A [`LocalWorker`] behaves like a remote worker process: calls are
//! queued on a crossbeam channel and served one at a time by a listener
//! thread that owns no game state. `terminate_self` acknowledges
//! immediately and arms a close timer; the listener keeps serving until
//! the timer fires, serves whatever calls are already queued, then exits
//! and drops its receiver, after which every call fails with
//! [`WorkerError::Unavailable`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use torus_core::RowBlock;
use tracing::{debug, info};

use crate::endpoint::{GenerationRequest, WorkerEndpoint};
use crate::error::WorkerError;

/// Configuration for a [`LocalWorker`].
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Delay between acknowledging `terminate_self` and closing the
    /// listener, in milliseconds. Default: 25.
    pub close_grace_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { close_grace_ms: 25 }
    }
}

/// A call queued for the listener thread.
enum WorkerCall {
    Compute {
        request: GenerationRequest,
        reply: Sender<Result<RowBlock, WorkerError>>,
    },
    Terminate {
        reply: Sender<()>,
    },
}

/// Client handle to an in-process worker.
pub struct LocalWorker {
    label: String,
    call_tx: Sender<WorkerCall>,
    closed: Arc<AtomicBool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl LocalWorker {
    /// Start a worker listener thread.
    pub fn spawn(label: impl Into<String>, config: WorkerConfig) -> Result<Self, WorkerError> {
        let label = label.into();
        let (call_tx, call_rx) = crossbeam_channel::unbounded();
        let closed = Arc::new(AtomicBool::new(false));

        let listener_label = label.clone();
        let listener_closed = Arc::clone(&closed);
        let grace = Duration::from_millis(config.close_grace_ms);
        let listener = thread::Builder::new()
            .name(format!("torus-worker-{label}"))
            .spawn(move || {
                listen(&listener_label, call_rx, grace);
                listener_closed.store(true, Ordering::Release);
            })
            .map_err(|e| WorkerError::SpawnFailed {
                worker: label.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            label,
            call_tx,
            closed,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Whether the listener has exited.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Block until the listener thread exits.
    ///
    /// Returns immediately if it was already joined. Only returns once
    /// `terminate_self` has been called and its grace period has elapsed.
    pub fn join(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn unavailable(&self) -> WorkerError {
        WorkerError::Unavailable {
            worker: self.label.clone(),
        }
    }

    fn disconnected(&self) -> WorkerError {
        WorkerError::Disconnected {
            worker: self.label.clone(),
        }
    }
}

impl WorkerEndpoint for LocalWorker {
    fn label(&self) -> &str {
        &self.label
    }

    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.call_tx
            .send(WorkerCall::Compute {
                request: request.clone(),
                reply: reply_tx,
            })
            .map_err(|_| self.unavailable())?;
        reply_rx.recv().map_err(|_| self.disconnected())?
    }

    fn terminate_self(&self) -> Result<(), WorkerError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.call_tx
            .send(WorkerCall::Terminate { reply: reply_tx })
            .map_err(|_| self.unavailable())?;
        reply_rx.recv().map_err(|_| self.disconnected())
    }
}

impl Drop for LocalWorker {
    fn drop(&mut self) {
        // The listener exits once every sender is gone; ours is the last.
        let (closed_tx, _) = crossbeam_channel::bounded(0);
        self.call_tx = closed_tx;
        self.join();
    }
}

/// Listener loop. Serves calls until the close timer fires or every
/// client handle is dropped. Calls already queued when the timer fires
/// are still served before the receiver is dropped.
fn listen(label: &str, call_rx: Receiver<WorkerCall>, grace: Duration) {
    let mut close_at: Receiver<Instant> = crossbeam_channel::never();
    let mut closing = false;
    loop {
        crossbeam_channel::select! {
            recv(call_rx) -> call => match call {
                Ok(call) => {
                    if serve(label, call, closing, grace) {
                        close_at = crossbeam_channel::after(grace);
                        closing = true;
                    }
                }
                Err(_) => break,
            },
            recv(close_at) -> _ => {
                for _ in 0..call_rx.len() {
                    match call_rx.try_recv() {
                        Ok(call) => {
                            serve(label, call, true, grace);
                        }
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    info!(worker = label, "listener closed");
}

/// Serve one call. Returns true if it was the first terminate request.
fn serve(label: &str, call: WorkerCall, closing: bool, grace: Duration) -> bool {
    match call {
        WorkerCall::Compute { request, reply } => {
            let result = request
                .compute()
                .map_err(|e| WorkerError::rejected(label, e));
            debug!(
                worker = label,
                start = request.start,
                end = request.end,
                ok = result.is_ok(),
                "computed rows"
            );
            // Best-effort reply; the caller may have given up.
            let _ = reply.send(result);
            false
        }
        WorkerCall::Terminate { reply } => {
            if !closing {
                info!(worker = label, grace_ms = grace.as_millis() as u64, "terminate requested");
            }
            let _ = reply.send(());
            !closing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torus_core::{partition_rows, step, Cell, Grid};

    fn blinker() -> Arc<Grid> {
        Arc::new(
            Grid::from_cells(5, 5, &[Cell::new(1, 2), Cell::new(2, 2), Cell::new(3, 2)]).unwrap(),
        )
    }

    fn quick() -> WorkerConfig {
        WorkerConfig { close_grace_ms: 5 }
    }

    #[test]
    fn computes_assigned_rows() {
        let worker = LocalWorker::spawn("w0", quick()).unwrap();
        let grid = blinker();
        let parts = partition_rows(5, 2).unwrap();
        let block = worker
            .compute_next_generation(&GenerationRequest::new(Arc::clone(&grid), &parts[0]))
            .unwrap();
        assert_eq!((block.start, block.end, block.width), (0, 2, 5));
        assert_eq!(block.cells, step(&grid).as_bytes()[..10].to_vec());
    }

    #[test]
    fn bad_request_is_rejected_not_fatal() {
        let worker = LocalWorker::spawn("w0", quick()).unwrap();
        let grid = blinker();
        let mut req = GenerationRequest::new(Arc::clone(&grid), &partition_rows(5, 1).unwrap()[0]);
        req.end = 9;
        assert!(matches!(
            worker.compute_next_generation(&req),
            Err(WorkerError::Rejected { .. })
        ));
        // Still serving.
        req.end = 5;
        assert!(worker.compute_next_generation(&req).is_ok());
    }

    #[test]
    fn terminate_closes_after_grace() {
        let worker = LocalWorker::spawn("w0", WorkerConfig { close_grace_ms: 20 }).unwrap();
        worker.terminate_self().unwrap();
        assert!(!worker.is_closed());

        // Calls made inside the grace window are still served.
        let grid = blinker();
        let req = GenerationRequest::new(grid, &partition_rows(5, 1).unwrap()[0]);
        assert!(worker.compute_next_generation(&req).is_ok());

        worker.join();
        assert!(worker.is_closed());
        assert_eq!(
            worker.compute_next_generation(&req),
            Err(WorkerError::Unavailable {
                worker: "w0".into()
            })
        );
        assert!(worker.terminate_self().is_err());
    }

    #[test]
    fn calls_queued_at_close_are_served() {
        let worker = LocalWorker::spawn("w0", WorkerConfig { close_grace_ms: 0 }).unwrap();
        let big = Arc::new(Grid::dead(600, 600).unwrap());
        let big_req = GenerationRequest::new(big, &partition_rows(600, 1).unwrap()[0]);
        let small_req = GenerationRequest::new(blinker(), &partition_rows(5, 1).unwrap()[0]);

        // Queue everything up front: while the large call is computing the
        // zero-grace timer fires, so the small call and the timer are both
        // ready when the listener next selects.
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let (big_tx, big_rx) = crossbeam_channel::bounded(1);
        let (small_tx, small_rx) = crossbeam_channel::bounded(1);
        worker
            .call_tx
            .send(WorkerCall::Terminate { reply: ack_tx })
            .unwrap();
        worker
            .call_tx
            .send(WorkerCall::Compute {
                request: big_req,
                reply: big_tx,
            })
            .unwrap();
        worker
            .call_tx
            .send(WorkerCall::Compute {
                request: small_req,
                reply: small_tx,
            })
            .unwrap();

        ack_rx.recv().unwrap();
        assert!(big_rx.recv().unwrap().is_ok());
        assert!(small_rx.recv().unwrap().is_ok());
        worker.join();
        assert!(worker.is_closed());
    }

    #[test]
    fn drop_joins_listener() {
        let worker = LocalWorker::spawn("w0", quick()).unwrap();
        let closed = Arc::clone(&worker.closed);
        drop(worker);
        assert!(closed.load(Ordering::Acquire));
    }
}
