use glam::Vec3;
use rayon::prelude::*;

use crate::{
    config::SimulationTuning,
    core::body::Body,
    dynamics::job_system::JobSystem,
    utils::math::angular_velocity_to_quat,
};

/// Semi-implicit Euler integrator for the active bodies of a system.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub dt: f32,
    pub gravity: Vec3,
    pub max_linear_velocity: f32,
}

impl Integrator {
    pub fn new(dt: f32, gravity: Vec3, tuning: &SimulationTuning) -> Self {
        Self {
            dt,
            gravity,
            max_linear_velocity: tuning.max_linear_velocity,
        }
    }

    /// Applies gravity, accumulated force, damping, the speed clamp and DOF locks.
    pub fn integrate_velocity(&self, body: &mut Body) {
        if !body.is_active() || !body.is_dynamic() {
            return;
        }
        let dt = self.dt;

        let acceleration = self.gravity * body.gravity_factor + body.force() / body.mass;
        body.linear_velocity += acceleration * dt;

        body.linear_velocity *= (1.0 - body.linear_damping * dt).max(0.0);
        body.angular_velocity *= (1.0 - body.angular_damping * dt).max(0.0);

        let speed_sq = body.linear_velocity.length_squared();
        if speed_sq > self.max_linear_velocity * self.max_linear_velocity {
            body.linear_velocity *= self.max_linear_velocity / speed_sq.sqrt();
        }

        body.linear_velocity *= body.allowed_dofs.translation_mask();
        body.angular_velocity *= body.allowed_dofs.rotation_mask();
    }

    /// Moves active dynamic and kinematic bodies along their velocities.
    pub fn integrate_position(&self, body: &mut Body) {
        if !body.is_active() || body.is_static() {
            return;
        }
        let dt = self.dt;

        body.position += body.linear_velocity * dt;

        let delta = angular_velocity_to_quat(body.angular_velocity, dt);
        body.rotation = (delta * body.rotation).normalize();
    }

    pub fn integrate_velocities(&self, bodies: &mut [Option<Body>], jobs: &JobSystem) {
        let min_len = jobs.min_chunk(bodies.len());
        jobs.install(|| {
            bodies
                .par_iter_mut()
                .with_min_len(min_len)
                .flatten()
                .for_each(|body| self.integrate_velocity(body));
        });
    }

    pub fn integrate_positions(&self, bodies: &mut [Option<Body>], jobs: &JobSystem) {
        let min_len = jobs.min_chunk(bodies.len());
        jobs.install(|| {
            bodies
                .par_iter_mut()
                .with_min_len(min_len)
                .flatten()
                .for_each(|body| self.integrate_position(body));
        });
    }

    /// Pulls a swept body back to `fraction` of this step's motion and removes the
    /// velocity that drives it into the surface with normal `normal` (body → obstacle).
    pub fn stop_at_time_of_impact(
        &self,
        body: &mut Body,
        fraction: f32,
        normal: Vec3,
        restitution: f32,
        tuning: &SimulationTuning,
    ) {
        let fraction = fraction.clamp(0.0, 1.0);
        body.position -= body.linear_velocity * self.dt * (1.0 - fraction);

        let approach = body.linear_velocity.dot(normal);
        if approach > 0.0 {
            let bounce = if approach > tuning.min_velocity_for_restitution {
                restitution
            } else {
                0.0
            };
            body.linear_velocity -= normal * approach * (1.0 + bounce);
        }
    }
}
