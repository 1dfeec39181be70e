//! Collision detection modules: layer filtering, broad-phase, narrow-phase and contacts.

pub mod broadphase;
pub mod contact;
pub mod layers;
pub mod narrowphase;

pub use broadphase::BroadPhase;
pub use contact::{CachedImpulse, ContactManifold, ContactPoint, ManifoldCache};
pub use layers::{
    BroadPhaseLayerInterface, BroadPhaseLayerTable, ObjectLayerPairFilter,
    ObjectLayerPairFilterTable, ObjectVsBroadPhaseLayerFilter, ObjectVsBroadPhaseLayerFilterTable,
};
pub use narrowphase::{NarrowPhase, Pose};
