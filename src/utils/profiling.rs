use std::time::{Duration, Instant};

use log::debug;

/// Timing and counts recorded for the most recent update.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub integrator_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub solver_time: Duration,
    pub sleeping_time: Duration,
    pub total_time: Duration,

    pub collision_steps: u32,
    pub body_count: usize,
    pub active_body_count: usize,
    pub body_pair_count: usize,
    pub manifold_count: usize,
    pub constraint_count: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Writes the profile to the `debug` log.
    pub fn report(&self) {
        let total_us = self.total_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }
        let share = |d: Duration| d.as_micros() as f32 / total_us * 100.0;

        debug!(
            "physics step: {:.2} ms over {} collision steps, bodies {}/{} active, pairs {}, manifolds {}, constraints {}",
            self.total_time.as_secs_f32() * 1000.0,
            self.collision_steps,
            self.active_body_count,
            self.body_count,
            self.body_pair_count,
            self.manifold_count,
            self.constraint_count,
        );
        debug!(
            "  integrate {:.1}%  broad {:.1}%  narrow {:.1}%  solve {:.1}%  sleep {:.1}%",
            share(self.integrator_time),
            share(self.broad_phase_time),
            share(self.narrow_phase_time),
            share(self.solver_time),
            share(self.sleeping_time),
        );
    }
}

/// Adds the lifetime of the guard to a duration slot.
pub struct StageTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> StageTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for StageTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}
