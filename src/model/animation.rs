//! Looping spin of the record disc shown in the song carousel
//!
//! Sampled at render time from the elapsed wall clock, so it never holds up
//! anything else. Started when the carousel is on screen, stopped while a
//! song is being viewed.

use std::time::Instant;

use crate::config::{SPIN_DEGREES_PER_PERIOD, SPIN_PERIOD};

#[derive(Clone, Debug, Default)]
pub struct SpinAnimation {
    started: Option<Instant>,
    /// Angle reached before the last stop, resumed on the next start.
    held_degrees: f32,
}

impl SpinAnimation {
    pub fn start(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    pub fn stop(&mut self, now: Instant) {
        if self.started.is_some() {
            self.held_degrees = self.degrees_at(now);
            self.started = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Current angle in `[0, 360)`.
    pub fn degrees_at(&self, now: Instant) -> f32 {
        let Some(started) = self.started else {
            return self.held_degrees;
        };
        let period = SPIN_PERIOD.as_secs_f32();
        let phase = (now.saturating_duration_since(started).as_secs_f32() % period) / period;
        (self.held_degrees + phase * SPIN_DEGREES_PER_PERIOD).rem_euclid(360.0)
    }
}
