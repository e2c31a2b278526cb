//! worker.rs - Back-to-back round driver
//!
//! Runs rounds forever with a short pause in between. The only way out is
//! the shutdown hook, which is honoured between rounds: a round that has
//! started always finishes and drains its buffer.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::round::ScanRound;

/// Requests a clean stop of a running [`Worker`]
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // send_replace never fails, even with no receiver left
        self.tx.send_replace(true);
    }
}

/// Receiving side handed to [`Worker::run`]
pub type ShutdownSignal = watch::Receiver<bool>;

pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
}

pub struct Worker {
    rounds: Arc<dyn ScanRound>,
    round_delay: Duration,
    next_round: u64,
    state: WorkerState,
}

impl Worker {
    pub fn new(rounds: Arc<dyn ScanRound>, round_delay: Duration) -> Self {
        Worker {
            rounds,
            round_delay,
            next_round: 1,
            state: WorkerState::Running,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Number the next round will get
    pub fn next_round(&self) -> u64 {
        self.next_round
    }

    /// Run rounds until `shutdown` fires or its handle is dropped.
    /// Returns the number of rounds run.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> u64 {
        let mut completed = 0;

        while self.state == WorkerState::Running {
            if *shutdown.borrow_and_update() {
                break;
            }

            let round = self.next_round;
            self.next_round += 1;

            info!("🔁 Round {}", round);
            let report = self.rounds.run_round(round).await;
            completed += 1;
            debug!(
                "Round {} done: claimed={} resolved={} early_flushes={}",
                round, report.claimed, report.resolved, report.early_flushes
            );

            tokio::select! {
                _ = tokio::time::sleep(self.round_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown handle dropped, stopping worker");
                        self.state = WorkerState::Stopped;
                    }
                }
            }
        }

        self.state = WorkerState::Stopped;
        info!("Worker stopped after {} rounds", completed);
        completed
    }
}
