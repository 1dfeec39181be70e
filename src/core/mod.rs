//! Core types describing bodies, shapes and shared identifiers.

pub mod aabb;
pub mod body;
pub mod shape;
pub mod types;

pub use aabb::Aabb;
pub use body::{Body, BodyCreationSettings};
pub use shape::{Shape, ShapeHandle, ShapeRegistry};
pub use types::{
    Activation, AllowedDofs, BodyId, BroadPhaseLayer, MotionQuality, MotionType, ObjectLayer,
    UpdateError,
};
