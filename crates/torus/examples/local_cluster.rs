//! Run a glider across a 64x64 torus on four in-process workers while a
//! client thread polls progress, pauses, resumes, and finally shuts the
//! whole system down.
//!
//! ```sh
//! cargo run -p torus --example local_cluster
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use torus::prelude::*;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (pool, workers) = WorkerPool::spawn_local(4, &WorkerConfig::default())?;
    let broker = Arc::new(Broker::new(
        BrokerConfig {
            shutdown_grace_ms: 200,
        },
        pool,
    ));

    let glider = Grid::from_cells(
        64,
        64,
        &[
            Cell::new(1, 0),
            Cell::new(2, 1),
            Cell::new(0, 2),
            Cell::new(1, 2),
            Cell::new(2, 2),
        ],
    )?;
    let session = broker.submit_run(RunRequest::new(glider, 100_000))?;
    info!(%session, "submitted");

    let client = {
        let broker = Arc::clone(&broker);
        thread::spawn(move || {
            for _ in 0..4 {
                thread::sleep(Duration::from_millis(200));
                if let Some(p) = broker.query_progress() {
                    info!(turn = p.completed_turns, alive = p.alive_cell_count, "progress");
                }
            }
            if let Some(status) = broker.pause_or_resume() {
                info!(text = %status.display_text, "paused");
            }
            thread::sleep(Duration::from_millis(300));
            if let Some(snap) = broker.snapshot() {
                info!(turn = snap.completed_turns, "snapshot while paused:\n{:?}", snap.grid);
            }
            if let Some(status) = broker.pause_or_resume() {
                info!(text = %status.display_text, "resumed");
            }
            thread::sleep(Duration::from_millis(200));
            broker.shutdown_everything();
        })
    };

    let outcome = broker.await_result()?;
    if let Some(outcome) = outcome {
        info!(
            turn = outcome.terminate_turn,
            alive = outcome.alive_cells.len(),
            "final result"
        );
        for cell in &outcome.alive_cells {
            info!(%cell, "alive");
        }
    }
    if let Some(metrics) = broker.last_turn_metrics() {
        info!(
            turn = metrics.turn,
            total_us = metrics.total_us,
            slowest_worker_us = metrics.slowest_worker_us(),
            "last turn timing"
        );
    }

    client.join().map_err(|_| "client thread panicked")?;
    broker.wait_for_shutdown();
    for worker in &workers {
        worker.join();
    }
    info!("all workers closed");
    Ok(())
}
