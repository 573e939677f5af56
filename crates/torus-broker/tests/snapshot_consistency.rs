//! Integration test: concurrent readers always see a consistent turn.
//!
//! Reader threads hammer `snapshot` and `query_progress` while a run is
//! in progress. Every grid they observe must equal the reference grid for
//! the turn count it was reported with, and every alive count must match
//! the reference for its turn.

use std::thread;

use torus_broker::{Broker, BrokerConfig, RunRequest, RunState};
use torus_core::{step, Grid};
use torus_test_utils::lcg_grid;
use torus_worker::{WorkerConfig, WorkerPool};

const TURNS: u64 = 150;

fn reference_turns(initial: &Grid, turns: u64) -> Vec<Grid> {
    let mut grids = Vec::with_capacity(turns as usize + 1);
    grids.push(initial.clone());
    for _ in 0..turns {
        let next = step(grids.last().unwrap());
        grids.push(next);
    }
    grids
}

#[test]
fn readers_never_observe_a_torn_turn() {
    let (pool, _handles) = WorkerPool::spawn_local(3, &WorkerConfig::default()).unwrap();
    let broker = Broker::new(BrokerConfig::default(), pool);
    let initial = lcg_grid(24, 18, 42);
    let reference = reference_turns(&initial, TURNS);

    broker
        .submit_run(RunRequest::new(initial, TURNS))
        .unwrap();

    thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                let mut last_turn = 0;
                loop {
                    let snap = broker.snapshot().unwrap();
                    let turn = snap.completed_turns;
                    assert!(turn >= last_turn, "turns went backwards");
                    assert_eq!(*snap.grid, reference[turn as usize], "turn {turn}");
                    last_turn = turn;

                    let progress = broker.query_progress().unwrap();
                    assert_eq!(
                        progress.alive_cell_count,
                        reference[progress.completed_turns as usize].alive_count()
                    );

                    if broker.state() == RunState::Terminated {
                        break;
                    }
                }
            });
        }
    });

    let outcome = broker.await_result().unwrap().unwrap();
    assert_eq!(outcome.terminate_turn, TURNS);
    assert_eq!(*outcome.final_grid, reference[TURNS as usize]);
}
