//! Error types for the simulation core.
//!
//! Capacity exhaustion during an update is not an error; it is reported through
//! [`UpdateError`](crate::core::types::UpdateError) flags instead.

use thiserror::Error;

use crate::core::{
    shape::ShapeHandle,
    types::{BodyId, BroadPhaseLayer, ObjectLayer},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("body {0} does not exist")]
    UnknownBody(BodyId),

    #[error("body {0} is still added to the simulation; remove it before destroying")]
    BodyStillAdded(BodyId),

    #[error("shape {handle:?} is still referenced by {references} bodies")]
    ShapeInUse { handle: ShapeHandle, references: u32 },

    #[error("shape {0:?} does not exist")]
    UnknownShape(ShapeHandle),

    #[error("invalid shape geometry: {0}")]
    InvalidShape(String),

    #[error("layer tables need at least one object layer and one broad-phase layer")]
    InvalidLayerCount,

    #[error("{0} is outside the configured object layer range")]
    InvalidObjectLayer(ObjectLayer),

    #[error("{0} is outside the configured broad-phase layer range")]
    InvalidBroadPhaseLayer(BroadPhaseLayer),

    #[error("{0} has no broad-phase layer mapping")]
    UnmappedObjectLayer(ObjectLayer),

    #[error("layer tables disagree on object layer count ({expected} vs {found})")]
    LayerCountMismatch { expected: u32, found: u32 },

    #[error("physics system configuration is missing the {0}")]
    MissingCollaborator(&'static str),

    #[error("body capacity of {0} reached")]
    TooManyBodies(u32),

    #[error("job system could not start: {0}")]
    JobSystemInit(String),
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
