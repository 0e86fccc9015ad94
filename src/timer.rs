//! Cancelable single-shot countdown
//!
//! A `CountdownTimer` counts down whole seconds on the tokio clock. It reports
//! every decrement except the last through `on_tick`, then calls `on_complete`
//! exactly once at zero. `cancel` is the only way to stop it early, and
//! dropping the timer cancels it.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Snapshot of a running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct CountdownTimer {
    task: Option<JoinHandle<()>>,
    remaining: Arc<AtomicU32>,
    started_at: Option<DateTime<Utc>>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `duration_secs`
    ///
    /// A countdown still owned by this value is aborted first.
    pub fn start<T, C>(&mut self, duration_secs: u32, mut on_tick: T, on_complete: C)
    where
        T: FnMut(u32) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.cancel();

        let remaining = Arc::new(AtomicU32::new(duration_secs));
        self.remaining = Arc::clone(&remaining);
        self.started_at = Some(Utc::now());

        debug!("Countdown started: {}s", duration_secs);

        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut left = duration_secs;

            while left > 0 {
                ticker.tick().await;
                left -= 1;
                remaining.store(left, Ordering::SeqCst);

                if left > 0 {
                    on_tick(left);
                }
            }

            on_complete();
        }));
    }

    /// Stop future ticks and completion; safe before start and after completion
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Countdown cancelled at {}s", self.remaining());
            }
            task.abort();
        }
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> Option<TimerState> {
        if !self.is_running() {
            return None;
        }

        self.started_at.map(|started_at| TimerState {
            remaining_seconds: self.remaining(),
            started_at,
        })
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
