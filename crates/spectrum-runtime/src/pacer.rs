//! Wall-clock frame pacing.
//!
//! The machine produces one frame every 20 ms (50 Hz PAL). The pacer
//! keeps a "next frame due" deadline: the presentation tick starts a
//! frame once the deadline passes, and each started frame pushes the
//! deadline forward by one interval so steady-state pacing never drifts
//! with tick jitter.
//!
//! When a completed frame finds the deadline already in the past (a slow
//! frame, or the consumer was stalled), the next frame starts
//! back-to-back and the deadline rebases to now + interval — the machine
//! catches up without ever skipping engine execution, then immediately
//! returns to steady pacing. Consecutive back-to-back frames are capped
//! by policy so a long stall cannot turn into an unbounded burst.

use std::time::{Duration, Instant};

/// One PAL frame at 50 Hz.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// Default cap on consecutive catch-up frames.
pub const DEFAULT_MAX_CATCH_UP: u32 = 4;

/// Deadline tracker for the frame loop.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    next_due: Instant,
    max_catch_up: u32,
    catch_up_run: u32,
}

impl FramePacer {
    #[must_use]
    pub fn new(interval: Duration, max_catch_up: u32, now: Instant) -> Self {
        Self {
            interval,
            next_due: now,
            max_catch_up,
            catch_up_run: 0,
        }
    }

    /// Re-arm the deadline at `now` (called when the session starts or
    /// resumes from pause, so paused time is not "owed").
    pub fn restart(&mut self, now: Instant) {
        self.next_due = now;
        self.catch_up_run = 0;
    }

    /// Whether a scheduled frame should start at `now`.
    #[must_use]
    pub fn frame_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Record a scheduled frame start: the deadline advances by one
    /// interval and any catch-up burst ends.
    pub fn frame_started(&mut self) {
        self.next_due += self.interval;
        self.catch_up_run = 0;
    }

    /// Record a frame completion at `now`. Returns `true` when the next
    /// frame should start immediately (catch-up); in that case the
    /// deadline rebases so the back-to-back frame still gets a full time
    /// allocation.
    pub fn frame_completed(&mut self, now: Instant) -> bool {
        if now > self.next_due && self.catch_up_run < self.max_catch_up {
            self.catch_up_run += 1;
            self.next_due = now + self.interval;
            return true;
        }
        if now <= self.next_due {
            self.catch_up_run = 0;
        }
        false
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
