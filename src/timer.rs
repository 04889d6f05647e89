//! Retransmission timing: the polled deadline and the RTT-driven timeout.
//!
//! The client runs single-threaded, so there is no callback timer.  One
//! [`RetransmitTimer`] tracks the deadline for the oldest outstanding
//! segment as an explicit [`Instant`] and the session loop polls
//! [`expired`](RetransmitTimer::expired) once per iteration.
//!
//! [`RttEstimator`] keeps the full RTT sample record (it doubles as the
//! input for the end-of-session report) and derives the active timeout:
//! fixed until enough samples exist, then a multiple of the recent mean.

use std::time::{Duration, Instant};

/// Samples needed before the timeout adapts, and the width of the
/// moving-average window.
pub const ADAPTIVE_SAMPLE_WINDOW: usize = 10;

/// Multiplier applied to the mean of the recent samples.
pub const ADAPTIVE_MULTIPLIER: u32 = 5;

// ---------------------------------------------------------------------------
// RetransmitTimer
// ---------------------------------------------------------------------------

/// Deadline for the oldest in-flight segment, checked by polling.
///
/// Armed whenever segments are outstanding and no deadline is set; stopped
/// and re-armed whenever the window base moves (the oldest segment changed).
#[derive(Debug, Default)]
pub struct RetransmitTimer {
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer to fire `timeout` after `now`.
    pub fn start(&mut self, now: Instant, timeout: Duration) {
        self.deadline = Some(now + timeout);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` when the timer is armed and `now` has reached the deadline.
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

// ---------------------------------------------------------------------------
// RttEstimator
// ---------------------------------------------------------------------------

/// Rolling RTT record that recomputes the retransmission timeout.
#[derive(Debug)]
pub struct RttEstimator {
    samples: Vec<Duration>,
    initial_timeout: Duration,
}

impl RttEstimator {
    pub fn new(initial_timeout: Duration) -> Self {
        Self {
            samples: Vec::new(),
            initial_timeout,
        }
    }

    /// Append one measurement (one per newly acknowledged segment).
    pub fn record(&mut self, sample: Duration) {
        self.samples.push(sample);
    }

    /// The active timeout: the fixed initial value until
    /// [`ADAPTIVE_SAMPLE_WINDOW`] samples exist, afterwards
    /// [`ADAPTIVE_MULTIPLIER`] × mean of the most recent samples.
    pub fn timeout(&self) -> Duration {
        if self.samples.len() < ADAPTIVE_SAMPLE_WINDOW {
            return self.initial_timeout;
        }
        let recent = &self.samples[self.samples.len() - ADAPTIVE_SAMPLE_WINDOW..];
        let mean = recent.iter().sum::<Duration>() / ADAPTIVE_SAMPLE_WINDOW as u32;
        mean * ADAPTIVE_MULTIPLIER
    }

    /// Every sample recorded this session, oldest first.
    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }
}
