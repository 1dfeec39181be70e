use log::debug;

use crate::{
    config::SimulationTuning,
    core::{body::Body, types::BodyId},
};

/// Puts resting bodies to sleep after they stayed slow for long enough.
#[derive(Debug, Clone, Copy)]
pub struct SleepManager {
    pub velocity_threshold: f32,
    pub time_before_sleep: f32,
}

impl SleepManager {
    pub fn new(tuning: &SimulationTuning) -> Self {
        Self {
            velocity_threshold: tuning.sleep_velocity_threshold,
            time_before_sleep: tuning.time_before_sleep,
        }
    }

    /// Whether the body moves slowly enough to count as resting.
    pub fn is_resting(&self, body: &Body) -> bool {
        let limit = self.velocity_threshold * self.velocity_threshold;
        body.linear_velocity.length_squared() < limit && body.angular_velocity.length_squared() < limit
    }

    /// Advances sleep timers by `elapsed` seconds and returns the bodies that fell asleep.
    pub fn update_sleeping<'a>(
        &self,
        bodies: impl Iterator<Item = &'a mut Body>,
        elapsed: f32,
    ) -> Vec<BodyId> {
        let mut fell_asleep = Vec::new();
        for body in bodies {
            if !body.is_active() || !body.is_dynamic() {
                continue;
            }
            if !body.allow_sleeping || !self.is_resting(body) {
                body.sleep_timer = 0.0;
                continue;
            }
            body.sleep_timer += elapsed;
            if body.sleep_timer >= self.time_before_sleep {
                body.is_active = false;
                body.reset_motion();
                fell_asleep.push(body.id);
            }
        }
        if !fell_asleep.is_empty() {
            debug!("{} bodies went to sleep", fell_asleep.len());
        }
        fell_asleep
    }

    /// Wakes a body and restarts its sleep timer.
    pub fn wake(body: &mut Body) -> bool {
        if body.is_static() || !body.is_added() {
            return false;
        }
        body.sleep_timer = 0.0;
        let was_asleep = !body.is_active;
        body.is_active = true;
        was_asleep
    }
}
