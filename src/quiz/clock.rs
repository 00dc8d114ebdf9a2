// src/quiz/clock.rs

use tokio::task::JoinHandle;

/// Owns the countdown for one session's current question.
///
/// At most one live countdown exists per clock: arming a new one cancels
/// the previous one first. Each armed countdown carries a generation
/// number, and the expiry callback compares generations before acting, so
/// a cancellation that races with the task's wakeup still wins.
#[derive(Debug, Default)]
pub struct SessionClock {
    generation: u64,
    deadline_epoch_ms: Option<i64>,
    handle: Option<JoinHandle<()>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any previous countdown and reserves the next generation.
    /// The caller spawns the expiry task with the returned generation and
    /// attaches its handle.
    pub fn prepare(&mut self, deadline_epoch_ms: i64) -> u64 {
        self.cancel();
        self.generation += 1;
        self.deadline_epoch_ms = Some(deadline_epoch_ms);
        self.generation
    }

    pub fn attach(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    /// Idempotent. Bumping the generation makes an already-woken expiry
    /// task a no-op even when the abort arrives too late.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.deadline_epoch_ms = None;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remaining whole seconds on the armed countdown. Reaches exactly 0
    /// at the deadline and never goes below it.
    pub fn remaining_seconds(&self, now_ms: i64) -> Option<i64> {
        self.deadline_epoch_ms
            .map(|deadline| ((deadline - now_ms).max(0) + 999) / 1000)
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
