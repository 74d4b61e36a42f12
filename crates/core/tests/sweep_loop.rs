//! Scheduler loop failure isolation.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sedar_core::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Panics on the listed call numbers, succeeds otherwise.
struct FlakySweep {
    calls: AtomicUsize,
    panic_on: Vec<usize>,
}

#[async_trait]
impl Sweep for FlakySweep {
    async fn sweep(&self) -> ScanResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on.contains(&call) {
            panic!("sweep {} exploded", call);
        }
        ScanResult::default()
    }
}

#[derive(Default)]
struct InstantSleeper {
    naps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps.lock().push(duration);
    }
}

#[tokio::test]
async fn test_failed_sweep_does_not_stop_loop() {
    let sweep = Arc::new(FlakySweep {
        calls: AtomicUsize::new(0),
        panic_on: vec![1, 3],
    });
    let sleeper = Arc::new(InstantSleeper::default());
    let mut sweep_loop =
        SweepLoop::with_sleeper(sweep.clone(), sleeper.clone(), Duration::from_secs(180));

    let outcomes = sweep_loop.run_cycles(4).await;

    assert_eq!(sweep.calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        outcomes.iter().map(Option::is_some).collect::<Vec<_>>(),
        vec![false, true, false, true]
    );
    assert_eq!(sweep_loop.sweeps_failed(), 2);
    assert_eq!(sweep_loop.sweeps_completed(), 2);
    // Waiting always follows a sweep, failed or not.
    assert_eq!(sleeper.naps.lock().len(), 4);
}

#[tokio::test]
async fn test_failed_sweep_transitions_to_waiting() {
    let sweep = Arc::new(FlakySweep {
        calls: AtomicUsize::new(0),
        panic_on: vec![1],
    });
    let mut sweep_loop = SweepLoop::with_sleeper(
        sweep,
        Arc::new(InstantSleeper::default()),
        Duration::from_secs(1),
    );

    assert!(sweep_loop.step().await.is_none());
    assert_eq!(sweep_loop.state(), LoopState::Waiting);
}

#[tokio::test]
async fn test_run_keeps_polling_until_cancelled() {
    let sweep = Arc::new(FlakySweep {
        calls: AtomicUsize::new(0),
        panic_on: vec![],
    });
    let mut sweep_loop = SweepLoop::new(sweep.clone(), Duration::from_millis(5));

    let stopped = tokio::time::timeout(Duration::from_millis(100), sweep_loop.run()).await;

    assert!(stopped.is_err(), "run() has no terminal state");
    assert!(sweep.calls.load(Ordering::SeqCst) >= 2);
}
