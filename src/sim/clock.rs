//! Fixed timestep accumulator
//!
//! Frame callbacks arrive at whatever rate the host timer manages. The
//! simulation only ever advances in uniform steps, so each tick drains the
//! wall time elapsed since the last one in `step_ms` chunks.

use serde::{Deserialize, Serialize};

/// What to do when a tick finds a large backlog of simulated time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CatchUpPolicy {
    /// Replay every missed step before returning, however many there are
    #[default]
    Unbounded,
    /// Replay at most `max_steps` per tick and drop the rest of the backlog
    Clamp { max_steps: u64 },
}

/// Snapshot of the two clocks, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    pub last_frame_time: f64,
    pub last_simulated_time: f64,
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Steps issued to the simulation
    pub steps: u64,
    /// Steps skipped because the catch-up cap was hit
    pub dropped_steps: u64,
}

/// Accumulates wall time and drains it in fixed steps
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: f64,
    step_ms: f64,
    policy: CatchUpPolicy,
    last_frame_time: f64,
    simulated_steps: u64,
    dropped_steps: u64,
}

impl FrameClock {
    /// Start both clocks at `now` (milliseconds)
    ///
    /// # Panics
    ///
    /// If `step_ms` is not a positive number. Settings are validated before a
    /// session ever builds a clock.
    pub fn new(now: f64, step_ms: f64, policy: CatchUpPolicy) -> Self {
        assert!(step_ms.is_finite() && step_ms > 0.0, "fixed step must be positive, got {step_ms}");
        Self {
            origin: now,
            step_ms,
            policy,
            last_frame_time: now,
            simulated_steps: 0,
            dropped_steps: 0,
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    /// The fixed step as passed to the simulation
    pub fn step_seconds(&self) -> f32 {
        (self.step_ms / 1000.0) as f32
    }

    pub fn policy(&self) -> CatchUpPolicy {
        self.policy
    }

    /// Total steps issued since the clock started
    pub fn simulated_steps(&self) -> u64 {
        self.simulated_steps
    }

    /// Total steps dropped by the catch-up cap
    pub fn dropped_steps(&self) -> u64 {
        self.dropped_steps
    }

    pub fn state(&self) -> ClockState {
        ClockState {
            last_frame_time: self.last_frame_time,
            last_simulated_time: self.last_simulated_time(),
        }
    }

    // Derived from the step count so repeated addition never drifts.
    fn last_simulated_time(&self) -> f64 {
        self.origin + (self.simulated_steps + self.dropped_steps) as f64 * self.step_ms
    }

    /// Steps needed for simulated time to reach the last frame time
    pub fn pending_steps(&self) -> u64 {
        let behind = self.last_frame_time - self.last_simulated_time();
        if behind <= 0.0 {
            0
        } else {
            (behind / self.step_ms).ceil() as u64
        }
    }

    /// Record a frame at `now` and run `step` until simulated time catches up.
    ///
    /// A `now` earlier than the previous frame leaves both clocks where they
    /// are. The first error from `step` aborts the tick and is returned.
    pub fn advance<E, F>(&mut self, now: f64, mut step: F) -> Result<TickReport, E>
    where
        F: FnMut(f32) -> Result<(), E>,
    {
        self.last_frame_time = self.last_frame_time.max(now);
        let dt = self.step_seconds();
        let mut report = TickReport::default();

        while self.last_simulated_time() < self.last_frame_time {
            if let CatchUpPolicy::Clamp { max_steps } = self.policy {
                if report.steps >= max_steps {
                    let backlog = self.pending_steps();
                    self.dropped_steps += backlog;
                    report.dropped_steps = backlog;
                    log::warn!(
                        "Catch-up capped at {} steps, dropped {} steps ({:.1} ms)",
                        max_steps,
                        backlog,
                        backlog as f64 * self.step_ms
                    );
                    break;
                }
            }

            step(dt)?;
            self.simulated_steps += 1;
            report.steps += 1;
        }

        Ok(report)
    }
}
