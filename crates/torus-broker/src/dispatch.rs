//! Per-run dispatch lanes.
//!
//! A run owns one lane per worker. Each lane is a thread bound to one
//! endpoint and one partition: it receives a [`LaneTask`] carrying the
//! current grid, makes the blocking worker call, and sends a
//! [`LaneReply`] back on the task's bounded(1) reply channel. Lanes let
//! all N calls of a turn proceed at once while the run loop waits on the
//! replies in partition order.
//!
//! Dropping [`DispatchLanes`] closes every task channel and joins the
//! lane threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use torus_core::{Grid, Partition, RowBlock, SessionId};
use torus_worker::{GenerationRequest, WorkerEndpoint, WorkerError, WorkerPool};

use crate::error::RunError;

struct LaneTask {
    grid: Arc<Grid>,
    reply: Sender<LaneReply>,
}

struct LaneReply {
    result: Result<RowBlock, WorkerError>,
    elapsed_us: u64,
}

struct Lane {
    label: String,
    task_tx: Option<Sender<LaneTask>>,
    handle: Option<JoinHandle<()>>,
}

/// Row blocks for one turn, in partition order, with per-worker timings.
pub(crate) struct TurnReplies {
    pub(crate) blocks: Vec<RowBlock>,
    pub(crate) worker_us: Vec<u64>,
}

/// The lane threads for one run.
pub(crate) struct DispatchLanes {
    lanes: Vec<Lane>,
}

impl DispatchLanes {
    /// Start one lane per `(endpoint, partition)` pair.
    ///
    /// `partitions[i]` is bound to `pool.get(i)`. On spawn failure the
    /// lanes already started are shut down before the error is returned.
    pub(crate) fn spawn(
        pool: &WorkerPool,
        partitions: &[Partition],
        session: SessionId,
    ) -> std::io::Result<Self> {
        let mut lanes = Self {
            lanes: Vec::with_capacity(partitions.len()),
        };
        for (endpoint, partition) in pool.iter().zip(partitions) {
            let (task_tx, task_rx) = crossbeam_channel::unbounded();
            let endpoint = Arc::clone(endpoint);
            let partition = *partition;
            let label = endpoint.label().to_string();
            let handle = thread::Builder::new()
                .name(format!("torus-lane-{session}-{}", partition.index))
                .spawn(move || lane_loop(endpoint, partition, task_rx))?;
            lanes.lanes.push(Lane {
                label,
                task_tx: Some(task_tx),
                handle: Some(handle),
            });
        }
        Ok(lanes)
    }

    /// Number of lanes.
    pub(crate) fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Run one turn: send `grid` to every lane, then wait for all replies.
    ///
    /// Every reply is collected before returning, so no call of this turn
    /// is still running afterwards. If any call failed, the lowest-indexed
    /// failure is reported.
    pub(crate) fn dispatch(&self, grid: &Arc<Grid>) -> Result<TurnReplies, RunError> {
        let mut pending: Vec<Option<Receiver<LaneReply>>> = Vec::with_capacity(self.lanes.len());
        for lane in &self.lanes {
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            let sent = lane.task_tx.as_ref().is_some_and(|tx| {
                tx.send(LaneTask {
                    grid: Arc::clone(grid),
                    reply: reply_tx,
                })
                .is_ok()
            });
            pending.push(sent.then_some(reply_rx));
        }

        let mut blocks = Vec::with_capacity(self.lanes.len());
        let mut worker_us = Vec::with_capacity(self.lanes.len());
        let mut first_error: Option<RunError> = None;
        for (index, (lane, reply_rx)) in self.lanes.iter().zip(pending).enumerate() {
            let reply = reply_rx.and_then(|rx| rx.recv().ok());
            let result = match reply {
                Some(reply) => {
                    worker_us.push(reply.elapsed_us);
                    reply.result
                }
                None => {
                    worker_us.push(0);
                    Err(WorkerError::Disconnected {
                        worker: lane.label.clone(),
                    })
                }
            };
            match result {
                Ok(block) => blocks.push(block),
                Err(source) => {
                    if first_error.is_none() {
                        first_error = Some(RunError::Worker {
                            index,
                            label: lane.label.clone(),
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(TurnReplies { blocks, worker_us }),
        }
    }
}

impl Drop for DispatchLanes {
    fn drop(&mut self) {
        for lane in &mut self.lanes {
            lane.task_tx.take();
        }
        for lane in &mut self.lanes {
            if let Some(handle) = lane.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

fn lane_loop(endpoint: Arc<dyn WorkerEndpoint>, partition: Partition, task_rx: Receiver<LaneTask>) {
    while let Ok(task) = task_rx.recv() {
        let request = GenerationRequest::new(task.grid, &partition);
        let started = Instant::now();
        let result = endpoint.compute_next_generation(&request);
        let elapsed_us = started.elapsed().as_micros() as u64;
        let _ = task.reply.send(LaneReply { result, elapsed_us });
    }
}
