#![allow(dead_code)]

use std::sync::Arc;

use strata_physics::*;

pub const NON_MOVING: ObjectLayer = ObjectLayer(0);
pub const MOVING: ObjectLayer = ObjectLayer(1);
pub const DT: f32 = 1.0 / 60.0;

pub struct Scene {
    pub system: PhysicsSystem,
    pub shapes: Arc<ShapeRegistry>,
}

pub fn layer_tables(moving_hits_static: bool) -> (BroadPhaseLayerTable, ObjectLayerPairFilterTable) {
    let mut bp = BroadPhaseLayerTable::new(2, 2).unwrap();
    bp.map(NON_MOVING, BroadPhaseLayer(0)).unwrap();
    bp.map(MOVING, BroadPhaseLayer(1)).unwrap();

    let mut pairs = ObjectLayerPairFilterTable::new(2).unwrap();
    pairs.enable_collision(MOVING, MOVING).unwrap();
    if moving_hits_static {
        pairs.enable_collision(MOVING, NON_MOVING).unwrap();
    }
    (bp, pairs)
}

pub fn config_with(settings: PhysicsSystemSettings, moving_hits_static: bool) -> PhysicsSystemConfig {
    let (bp, pairs) = layer_tables(moving_hits_static);
    let combined = ObjectVsBroadPhaseLayerFilterTable::new(&bp, &pairs).unwrap();
    PhysicsSystemConfig::new(settings)
        .with_shape_registry(Arc::new(ShapeRegistry::new()))
        .with_broad_phase_layer_interface(Arc::new(bp))
        .with_object_vs_broad_phase_layer_filter(Arc::new(combined))
        .with_object_layer_pair_filter(Arc::new(pairs))
}

pub fn scene_with(settings: PhysicsSystemSettings) -> Scene {
    let config = config_with(settings, true);
    let shapes = config.shape_registry.clone().unwrap();
    Scene {
        system: PhysicsSystem::new(config).unwrap(),
        shapes,
    }
}

pub fn scene() -> Scene {
    scene_with(PhysicsSystemSettings::default())
}

pub fn jobs(threads: i32) -> JobSystem {
    JobSystem::new(JobSystemSettings::new(0, 0, threads)).unwrap()
}

impl Scene {
    /// Static slab whose top face sits at y = 0.
    pub fn add_floor(&mut self) -> BodyId {
        let shape = self
            .shapes
            .create_box(Vec3::new(100.0, 1.0, 100.0), 0.05)
            .unwrap();
        let settings = BodyCreationSettings::new(
            shape,
            Vec3::new(0.0, -1.0, 0.0),
            Quat::IDENTITY,
            MotionType::Static,
            NON_MOVING,
        );
        self.system
            .body_interface()
            .create_and_add_body(&settings, Activation::DontActivate)
            .unwrap()
    }

    pub fn ball_settings(&self, radius: f32, position: Vec3) -> BodyCreationSettings {
        let shape = self.shapes.create_sphere(radius).unwrap();
        BodyCreationSettings::new(shape, position, Quat::IDENTITY, MotionType::Dynamic, MOVING)
    }

    pub fn add_ball(&mut self, radius: f32, position: Vec3) -> BodyId {
        let settings = self.ball_settings(radius, position);
        self.add(settings, Activation::Activate)
    }

    pub fn add(&mut self, settings: BodyCreationSettings, activation: Activation) -> BodyId {
        self.system
            .body_interface()
            .create_and_add_body(&settings, activation)
            .unwrap()
    }

    pub fn run(&mut self, jobs: &JobSystem, frames: usize) -> UpdateError {
        let mut errors = UpdateError::empty();
        for _ in 0..frames {
            errors |= self.system.update(DT, 1, jobs);
        }
        errors
    }

    pub fn position(&mut self, id: BodyId) -> Vec3 {
        self.system.body_interface().position(id).unwrap()
    }
}
