//! Repeats sweeps at a fixed interval, forever.

use crate::fleet::Sweep;
use crate::progress::ScanResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Sweeping,
    Waiting,
}

/// Source of the pause between sweeps.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sweeping/Waiting state machine. A failed sweep is logged and the loop
/// moves on to Waiting as usual.
pub struct SweepLoop {
    sweeper: Arc<dyn Sweep>,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
    state: LoopState,
    sweeps_completed: u64,
    sweeps_failed: u64,
}

impl SweepLoop {
    pub fn new(sweeper: Arc<dyn Sweep>, interval: Duration) -> Self {
        Self::with_sleeper(sweeper, Arc::new(TokioSleeper), interval)
    }

    pub fn with_sleeper(
        sweeper: Arc<dyn Sweep>,
        sleeper: Arc<dyn Sleeper>,
        interval: Duration,
    ) -> Self {
        Self {
            sweeper,
            sleeper,
            interval,
            state: LoopState::Sweeping,
            sweeps_completed: 0,
            sweeps_failed: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps_completed
    }

    pub fn sweeps_failed(&self) -> u64 {
        self.sweeps_failed
    }

    /// Perform the current state's action and transition.
    ///
    /// Returns the sweep result when a sweep just finished successfully.
    pub async fn step(&mut self) -> Option<ScanResult> {
        match self.state {
            LoopState::Sweeping => {
                let outcome = self.run_sweep().await;
                self.state = LoopState::Waiting;
                outcome
            }
            LoopState::Waiting => {
                self.sleeper.sleep(self.interval).await;
                self.state = LoopState::Sweeping;
                None
            }
        }
    }

    /// Run `cycles` full sweep + wait rounds.
    pub async fn run_cycles(&mut self, cycles: usize) -> Vec<Option<ScanResult>> {
        let mut outcomes = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            if self.state == LoopState::Waiting {
                self.step().await;
            }
            outcomes.push(self.step().await);
            self.step().await;
        }
        outcomes
    }

    /// Loop until the process is stopped.
    pub async fn run(&mut self) {
        info!("Starting continuous container abuse detection...");
        loop {
            self.step().await;
        }
    }

    async fn run_sweep(&mut self) -> Option<ScanResult> {
        let sweeper = Arc::clone(&self.sweeper);

        // Own task, so a panic inside the sweep cannot end the loop.
        match tokio::spawn(async move { sweeper.sweep().await }).await {
            Ok(result) => {
                self.sweeps_completed += 1;
                info!(
                    "Completed scan. Waiting {} seconds before next scan...",
                    self.interval.as_secs()
                );
                Some(result)
            }
            Err(e) => {
                self.sweeps_failed += 1;
                error!("Error in scan cycle: {}", e);
                None
            }
        }
    }
}
