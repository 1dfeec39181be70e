//! Strata – a rigid-body simulation core for Rust.
//!
//! Bodies are created through a [`BodyInterface`] obtained from a
//! [`PhysicsSystem`], which is assembled from a shared [`ShapeRegistry`] and
//! three layer filters. Each call to [`PhysicsSystem::update`] runs a fixed
//! number of collision steps on a [`JobSystem`] worker pool and reports any
//! capacity limits that were hit as [`UpdateError`] flags.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3, Vec4};

pub use collision::{
    broadphase::BroadPhase,
    contact::ContactManifold,
    layers::{
        BroadPhaseLayerInterface, BroadPhaseLayerTable, ObjectLayerPairFilter,
        ObjectLayerPairFilterTable, ObjectVsBroadPhaseLayerFilter,
        ObjectVsBroadPhaseLayerFilterTable,
    },
};
pub use config::{JobSystemSettings, PhysicsSystemSettings, SimulationTuning};
pub use core::{
    body::{Body, BodyCreationSettings},
    shape::{Shape, ShapeHandle, ShapeRegistry},
    types::{
        Activation, AllowedDofs, BodyId, BroadPhaseLayer, MotionQuality, MotionType, ObjectLayer,
        UpdateError,
    },
};
pub use dynamics::job_system::JobSystem;
pub use error::{PhysicsError, Result};
pub use utils::{
    math::{combine_rotations, quat_identity},
    profiling::StepProfile,
};
pub use world::{BodyInterface, PhysicsSystem, PhysicsSystemConfig};
