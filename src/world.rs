use std::{sync::Arc, time::Instant};

use glam::Vec3;
use log::{debug, warn};

use crate::{
    collision::layers::{
        BroadPhaseLayerInterface, ObjectLayerPairFilter, ObjectVsBroadPhaseLayerFilter,
        MAX_BROAD_PHASE_LAYERS,
    },
    config::PhysicsSystemSettings,
    core::{
        shape::ShapeRegistry,
        types::{ObjectLayer, UpdateError},
    },
    dynamics::{integrator::Integrator, job_system::JobSystem, sleeping::SleepManager, solver::ContactSolver},
    error::{PhysicsError, Result},
    utils::{
        logging::{warn_if_capacity_exceeded, ScopedTimer},
        profiling::{StageTimer, StepProfile},
    },
};

mod body_interface;
mod body_store;
mod collision_manager;

pub use body_interface::BodyInterface;
pub use body_store::BodyStore;

use collision_manager::{CollisionFilters, CollisionManager};

/// Everything needed to build a [`PhysicsSystem`].
///
/// The shape registry and the three layer filters are shared collaborators; they
/// must all be present and agree on the object layer count.
#[derive(Clone, Default)]
pub struct PhysicsSystemConfig {
    pub settings: PhysicsSystemSettings,
    pub shape_registry: Option<Arc<ShapeRegistry>>,
    pub broad_phase_layer_interface: Option<Arc<dyn BroadPhaseLayerInterface>>,
    pub object_vs_broad_phase_layer_filter: Option<Arc<dyn ObjectVsBroadPhaseLayerFilter>>,
    pub object_layer_pair_filter: Option<Arc<dyn ObjectLayerPairFilter>>,
}

impl PhysicsSystemConfig {
    pub fn new(settings: PhysicsSystemSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn with_shape_registry(mut self, registry: Arc<ShapeRegistry>) -> Self {
        self.shape_registry = Some(registry);
        self
    }

    pub fn with_broad_phase_layer_interface(mut self, layers: Arc<dyn BroadPhaseLayerInterface>) -> Self {
        self.broad_phase_layer_interface = Some(layers);
        self
    }

    pub fn with_object_vs_broad_phase_layer_filter(
        mut self,
        filter: Arc<dyn ObjectVsBroadPhaseLayerFilter>,
    ) -> Self {
        self.object_vs_broad_phase_layer_filter = Some(filter);
        self
    }

    pub fn with_object_layer_pair_filter(mut self, filter: Arc<dyn ObjectLayerPairFilter>) -> Self {
        self.object_layer_pair_filter = Some(filter);
        self
    }
}

/// Central simulation container: bodies, broad-phase and the fixed-step stepper.
pub struct PhysicsSystem {
    settings: PhysicsSystemSettings,
    shapes: Arc<ShapeRegistry>,
    filters: CollisionFilters,
    bodies: BodyStore,
    collision: CollisionManager,
    solver: ContactSolver,
    sleep: SleepManager,
    profile: StepProfile,
}

impl PhysicsSystem {
    pub fn new(config: PhysicsSystemConfig) -> Result<Self> {
        let shapes = config
            .shape_registry
            .ok_or(PhysicsError::MissingCollaborator("shape registry"))?;
        let broad_phase_layers = config
            .broad_phase_layer_interface
            .ok_or(PhysicsError::MissingCollaborator("broad-phase layer interface"))?;
        let object_vs_broad_phase = config
            .object_vs_broad_phase_layer_filter
            .ok_or(PhysicsError::MissingCollaborator("object vs broad-phase layer filter"))?;
        let object_pairs = config
            .object_layer_pair_filter
            .ok_or(PhysicsError::MissingCollaborator("object layer pair filter"))?;

        Self::validate_layers(broad_phase_layers.as_ref(), object_pairs.as_ref())?;

        let settings = config.settings.resolved();
        let tuning = settings.tuning;
        let collision = CollisionManager::new(
            broad_phase_layers.num_broad_phase_layers(),
            tuning.broad_phase_margin,
            settings.max_manifold_cache_entries as usize,
            settings.num_body_mutexes,
        );
        debug!(
            "physics system created: {} bodies, {} pairs, {} constraints, {} broad-phase layers",
            settings.max_bodies,
            settings.max_body_pairs,
            settings.max_contact_constraints,
            broad_phase_layers.num_broad_phase_layers()
        );

        Ok(Self {
            bodies: BodyStore::new(settings.max_bodies),
            collision,
            solver: ContactSolver::new(&tuning),
            sleep: SleepManager::new(&tuning),
            profile: StepProfile::default(),
            filters: CollisionFilters {
                broad_phase_layers,
                object_vs_broad_phase,
                object_pairs,
            },
            shapes,
            settings,
        })
    }

    fn validate_layers(
        broad_phase_layers: &dyn BroadPhaseLayerInterface,
        object_pairs: &dyn ObjectLayerPairFilter,
    ) -> Result<()> {
        let num_object_layers = broad_phase_layers.num_object_layers();
        let num_broad_phase_layers = broad_phase_layers.num_broad_phase_layers();
        if num_object_layers == 0
            || num_broad_phase_layers == 0
            || num_broad_phase_layers > MAX_BROAD_PHASE_LAYERS
        {
            return Err(PhysicsError::InvalidLayerCount);
        }
        if object_pairs.num_object_layers() != num_object_layers {
            return Err(PhysicsError::LayerCountMismatch {
                expected: num_object_layers,
                found: object_pairs.num_object_layers(),
            });
        }
        for layer in (0..num_object_layers).map(ObjectLayer) {
            let bp_layer = broad_phase_layers
                .broad_phase_layer(layer)
                .ok_or(PhysicsError::UnmappedObjectLayer(layer))?;
            if bp_layer.0 as u32 >= num_broad_phase_layers {
                return Err(PhysicsError::InvalidBroadPhaseLayer(bp_layer));
            }
        }
        Ok(())
    }

    /// Façade for creating, removing and editing bodies.
    pub fn body_interface(&mut self) -> BodyInterface<'_> {
        BodyInterface::new(self)
    }

    pub fn bodies(&self) -> &BodyStore {
        &self.bodies
    }

    pub fn settings(&self) -> &PhysicsSystemSettings {
        &self.settings
    }

    pub fn shape_registry(&self) -> &Arc<ShapeRegistry> {
        &self.shapes
    }

    pub fn gravity(&self) -> Vec3 {
        self.settings.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.settings.gravity = gravity;
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn num_active_bodies(&self) -> usize {
        self.bodies.num_active()
    }

    pub fn max_bodies(&self) -> u32 {
        self.settings.max_bodies
    }

    /// Profile of the most recent [`update`](Self::update).
    pub fn last_step_profile(&self) -> &StepProfile {
        &self.profile
    }

    /// Rebuilds the broad-phase trees; call after adding many bodies at once.
    pub fn optimize_broad_phase(&mut self) {
        let _timer = ScopedTimer::new("broadphase::optimize");
        self.collision.broadphase.optimize();
    }

    /// Advances the simulation by `delta_time` seconds split into `collision_steps`
    /// sub-steps. Returns the capacity limits that were hit, if any.
    pub fn update(&mut self, delta_time: f32, collision_steps: u32, jobs: &JobSystem) -> UpdateError {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            warn!("ignoring physics update with delta time {delta_time}");
            return UpdateError::empty();
        }
        let _timer = ScopedTimer::new("physics::update");
        let started = Instant::now();
        let steps = collision_steps.max(1);
        let dt = delta_time / steps as f32;

        let mut profile = StepProfile {
            collision_steps: steps,
            ..Default::default()
        };
        let mut errors = UpdateError::empty();
        for _ in 0..steps {
            errors |= self.collision_step(dt, jobs, &mut profile);
        }

        self.bodies.clear_forces();
        {
            let _timer = ScopedTimer::new("sleeping::update");
            let _stage = StageTimer::new(&mut profile.sleeping_time);
            self.sleep
                .update_sleeping(self.bodies.arena_mut().iter_mut(), delta_time);
        }

        profile.body_count = self.bodies.len();
        profile.active_body_count = self.bodies.num_active();
        profile.total_time = started.elapsed();
        profile.report();
        warn_if_capacity_exceeded(errors, profile.body_pair_count, profile.constraint_count);
        self.profile = profile;
        errors
    }

    fn collision_step(&mut self, dt: f32, jobs: &JobSystem, profile: &mut StepProfile) -> UpdateError {
        let tuning = self.settings.tuning;
        let integrator = Integrator::new(dt, self.settings.gravity, &tuning);
        let mut errors = UpdateError::empty();

        {
            let _timer = ScopedTimer::new("integrator::velocities");
            let _stage = StageTimer::new(&mut profile.integrator_time);
            integrator.integrate_velocities(self.bodies.arena_mut().slots_mut(), jobs);
        }

        let active = self.bodies.active_ids();
        let mut pairs = {
            let _timer = ScopedTimer::new("broadphase::pairs");
            let _stage = StageTimer::new(&mut profile.broad_phase_time);
            self.collision
                .find_body_pairs(self.bodies.arena(), &active, &self.filters, dt, &tuning, jobs)
        };
        profile.body_pair_count = profile.body_pair_count.max(pairs.len());
        if pairs.len() > self.settings.max_body_pairs as usize {
            errors |= UpdateError::BODY_PAIR_CACHE_FULL;
            pairs.truncate(self.settings.max_body_pairs as usize);
        }

        let mut manifolds = {
            let _timer = ScopedTimer::new("narrowphase::manifolds");
            let _stage = StageTimer::new(&mut profile.narrow_phase_time);
            self.collision
                .generate_manifolds(self.bodies.arena(), &pairs, &self.sleep, &tuning, jobs)
        };
        for id in self.collision.drain_wake_requests() {
            if let Ok(body) = self.bodies.get_mut(id) {
                if SleepManager::wake(body) {
                    debug!("body {id} woken by contact");
                }
            }
        }
        profile.manifold_count = profile.manifold_count.max(manifolds.len());
        if manifolds.len() > self.collision.manifold_cache.capacity() {
            errors |= UpdateError::MANIFOLD_CACHE_FULL;
        }
        profile.constraint_count = profile.constraint_count.max(manifolds.len());
        if manifolds.len() > self.settings.max_contact_constraints as usize {
            errors |= UpdateError::CONTACT_CONSTRAINT_FULL;
            manifolds.truncate(self.settings.max_contact_constraints as usize);
        }

        {
            let _timer = ScopedTimer::new("solver::contacts");
            let _stage = StageTimer::new(&mut profile.solver_time);
            let mut constraints =
                self.solver
                    .prepare(self.bodies.arena(), &manifolds, &self.collision.manifold_cache, dt);
            self.solver.warm_start(self.bodies.arena_mut(), &constraints);
            self.solver
                .solve_velocities(self.bodies.arena_mut(), &mut constraints);

            let sweeps = self.collision.sweep_linear_cast_bodies(
                self.bodies.arena(),
                &active,
                &self.filters,
                dt,
                &tuning,
                jobs,
            );
            integrator.integrate_positions(self.bodies.arena_mut().slots_mut(), jobs);
            for hit in sweeps {
                if let Ok(body) = self.bodies.get_mut(hit.body) {
                    integrator.stop_at_time_of_impact(body, hit.fraction, hit.normal, hit.restitution, &tuning);
                }
            }

            self.solver.solve_positions(self.bodies.arena_mut(), &constraints);
            if !self
                .solver
                .store_impulses(&constraints, &mut self.collision.manifold_cache)
            {
                errors |= UpdateError::MANIFOLD_CACHE_FULL;
            }
        }

        self.collision.refresh_bounds(self.bodies.arena());
        errors
    }
}

impl Drop for PhysicsSystem {
    fn drop(&mut self) {
        self.bodies.release_all(&self.shapes);
    }
}
