//! Configuration defaults and tunable settings for the simulation core.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default gravity vector applied in the physics system (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default maximum number of bodies a system may hold.
pub const DEFAULT_MAX_BODIES: u32 = 10240;

/// Default maximum number of candidate body pairs per collision step.
pub const DEFAULT_MAX_BODY_PAIRS: u32 = 65536;

/// Default maximum number of contact constraints per collision step.
pub const DEFAULT_MAX_CONTACT_CONSTRAINTS: u32 = 10240;

/// Stripe count for body wake-up queues when `num_body_mutexes` is 0.
pub const DEFAULT_NUM_BODY_MUTEXES: u32 = 64;

/// Default job queue capacity of the job system.
pub const DEFAULT_MAX_JOBS: u32 = 2048;

/// Default barrier capacity of the job system.
pub const DEFAULT_MAX_BARRIERS: u32 = 8;

/// Default convex radius for box shapes.
pub const DEFAULT_CONVEX_RADIUS: f32 = 0.05;

/// Density used to derive body mass from shape volume (kg/m³).
pub const DEFAULT_DENSITY: f32 = 1000.0;

/// Default friction coefficient for new bodies.
pub const DEFAULT_FRICTION: f32 = 0.2;

/// Default restitution for new bodies.
pub const DEFAULT_RESTITUTION: f32 = 0.0;

/// Default linear damping applied to dynamic bodies (1/s).
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.05;

/// Default angular damping applied to dynamic bodies (1/s).
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.05;

/// Solver and stepping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationTuning {
    /// Velocity solver iterations per collision step.
    pub num_velocity_steps: u32,
    /// Position projection iterations per collision step.
    pub num_position_steps: u32,
    /// Fraction of penetration corrected per position iteration.
    pub baumgarte: f32,
    /// Penetration allowed before position correction kicks in.
    pub penetration_slop: f32,
    /// Separation below which contacts are generated ahead of time.
    pub speculative_contact_distance: f32,
    /// Approach speed below which restitution is ignored.
    pub min_velocity_for_restitution: f32,
    /// Padding added to broad-phase bounds so small motions skip updates.
    pub broad_phase_margin: f32,
    /// Linear-cast bodies are swept once they move further than this
    /// fraction of their inner radius in one collision step.
    pub linear_cast_threshold: f32,
    /// Speed clamp for dynamic bodies.
    pub max_linear_velocity: f32,
    /// Speed below which a body counts as resting.
    pub sleep_velocity_threshold: f32,
    /// Seconds a body must rest before it is put to sleep.
    pub time_before_sleep: f32,
    /// Density used when body settings leave it unspecified.
    pub default_density: f32,
}

impl Default for SimulationTuning {
    fn default() -> Self {
        Self {
            num_velocity_steps: 10,
            num_position_steps: 2,
            baumgarte: 0.2,
            penetration_slop: 0.02,
            speculative_contact_distance: 0.02,
            min_velocity_for_restitution: 1.0,
            broad_phase_margin: 0.05,
            linear_cast_threshold: 0.75,
            max_linear_velocity: 500.0,
            sleep_velocity_threshold: 0.03,
            time_before_sleep: 0.5,
            default_density: DEFAULT_DENSITY,
        }
    }
}

/// Capacity ceilings and world parameters for a [`PhysicsSystem`](crate::PhysicsSystem).
///
/// Zero capacities select the engine defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSystemSettings {
    pub max_bodies: u32,
    pub num_body_mutexes: u32,
    pub max_body_pairs: u32,
    pub max_contact_constraints: u32,
    /// Persistent manifold capacity; 0 uses `max_body_pairs`.
    pub max_manifold_cache_entries: u32,
    pub gravity: Vec3,
    pub tuning: SimulationTuning,
}

impl Default for PhysicsSystemSettings {
    fn default() -> Self {
        Self {
            max_bodies: DEFAULT_MAX_BODIES,
            num_body_mutexes: 0,
            max_body_pairs: DEFAULT_MAX_BODY_PAIRS,
            max_contact_constraints: DEFAULT_MAX_CONTACT_CONSTRAINTS,
            max_manifold_cache_entries: 0,
            gravity: Vec3::from_slice(&DEFAULT_GRAVITY),
            tuning: SimulationTuning::default(),
        }
    }
}

impl PhysicsSystemSettings {
    pub fn with_max_bodies(mut self, max_bodies: u32) -> Self {
        self.max_bodies = max_bodies;
        self
    }

    pub fn with_max_body_pairs(mut self, max_body_pairs: u32) -> Self {
        self.max_body_pairs = max_body_pairs;
        self
    }

    pub fn with_max_contact_constraints(mut self, max_contact_constraints: u32) -> Self {
        self.max_contact_constraints = max_contact_constraints;
        self
    }

    pub fn with_num_body_mutexes(mut self, num_body_mutexes: u32) -> Self {
        self.num_body_mutexes = num_body_mutexes;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_tuning(mut self, tuning: SimulationTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Replaces zero capacities with defaults.
    pub fn resolved(mut self) -> Self {
        if self.max_bodies == 0 {
            self.max_bodies = DEFAULT_MAX_BODIES;
        }
        if self.max_body_pairs == 0 {
            self.max_body_pairs = DEFAULT_MAX_BODY_PAIRS;
        }
        if self.max_contact_constraints == 0 {
            self.max_contact_constraints = DEFAULT_MAX_CONTACT_CONSTRAINTS;
        }
        if self.num_body_mutexes == 0 {
            self.num_body_mutexes = DEFAULT_NUM_BODY_MUTEXES;
        }
        if self.max_manifold_cache_entries == 0 {
            self.max_manifold_cache_entries = self.max_body_pairs;
        }
        self
    }
}

/// Thread pool parameters for a [`JobSystem`](crate::JobSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemSettings {
    pub max_jobs: u32,
    pub max_barriers: u32,
    /// Worker count; zero or negative uses the available hardware concurrency.
    pub num_threads: i32,
}

impl Default for JobSystemSettings {
    fn default() -> Self {
        Self {
            max_jobs: DEFAULT_MAX_JOBS,
            max_barriers: DEFAULT_MAX_BARRIERS,
            num_threads: -1,
        }
    }
}

impl JobSystemSettings {
    pub fn new(max_jobs: u32, max_barriers: u32, num_threads: i32) -> Self {
        Self {
            max_jobs,
            max_barriers,
            num_threads,
        }
    }

    pub fn resolved(mut self) -> Self {
        if self.max_jobs == 0 {
            self.max_jobs = DEFAULT_MAX_JOBS;
        }
        if self.max_barriers == 0 {
            self.max_barriers = DEFAULT_MAX_BARRIERS;
        }
        if self.num_threads <= 0 {
            self.num_threads = std::thread::available_parallelism()
                .map(|n| n.get() as i32)
                .unwrap_or(1);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacities_resolve_to_defaults() {
        let settings = PhysicsSystemSettings {
            max_bodies: 0,
            max_body_pairs: 0,
            max_contact_constraints: 0,
            ..Default::default()
        }
        .resolved();
        assert_eq!(settings.max_bodies, DEFAULT_MAX_BODIES);
        assert_eq!(settings.max_body_pairs, DEFAULT_MAX_BODY_PAIRS);
        assert_eq!(settings.max_contact_constraints, DEFAULT_MAX_CONTACT_CONSTRAINTS);
        assert_eq!(settings.num_body_mutexes, DEFAULT_NUM_BODY_MUTEXES);
        assert_eq!(settings.max_manifold_cache_entries, DEFAULT_MAX_BODY_PAIRS);
    }

    #[test]
    fn job_settings_pick_hardware_concurrency() {
        let settings = JobSystemSettings::new(0, 0, -1).resolved();
        assert_eq!(settings.max_jobs, DEFAULT_MAX_JOBS);
        assert_eq!(settings.max_barriers, DEFAULT_MAX_BARRIERS);
        assert!(settings.num_threads >= 1);
    }
}
