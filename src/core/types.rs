use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::utils::allocator::ArenaId;

/// Common math types re-exported for convenience.
pub use glam::{Quat, Vec3, Vec4};

const BODY_INDEX_BITS: u32 = 24;
const BODY_INDEX_MASK: u32 = (1 << BODY_INDEX_BITS) - 1;

/// Opaque body handle: 24-bit slot index plus an 8-bit sequence number.
///
/// The sequence number changes every time a slot is reused, so an id that
/// outlived its body never resolves to a different live body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(u32);

impl BodyId {
    pub const INVALID: BodyId = BodyId(u32::MAX);

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn sequence(&self) -> u8 {
        (self.0 >> BODY_INDEX_BITS) as u8
    }

    pub fn is_invalid(&self) -> bool {
        *self == Self::INVALID
    }
}

impl ArenaId for BodyId {
    fn from_parts(index: u32, generation: u8) -> Self {
        Self(((generation as u32) << BODY_INDEX_BITS) | (index & BODY_INDEX_MASK))
    }

    fn index(&self) -> usize {
        (self.0 & BODY_INDEX_MASK) as usize
    }

    fn generation(&self) -> u8 {
        self.sequence()
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", ArenaId::index(self), self.sequence())
    }
}

/// Application-defined collision classification of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectLayer(pub u32);

impl fmt::Display for ObjectLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object layer {}", self.0)
    }
}

/// Coarse grouping of object layers; each one owns a broad-phase tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BroadPhaseLayer(pub u8);

impl fmt::Display for BroadPhaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broad-phase layer {}", self.0)
    }
}

/// How a body moves in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionType {
    /// Never moves; infinite mass.
    Static,
    /// Moved by its velocity or by direct transform changes, never by forces.
    Kinematic,
    /// Fully simulated.
    Dynamic,
}

/// Collision detection quality for moving bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotionQuality {
    #[default]
    Discrete,
    /// Sweeps fast bodies along their displacement so they cannot tunnel.
    LinearCast,
}

/// Whether an operation should wake the body it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Activate,
    DontActivate,
}

bitflags! {
    /// Degrees of freedom a body may move in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AllowedDofs: u8 {
        const TRANSLATION_X = 0b000001;
        const TRANSLATION_Y = 0b000010;
        const TRANSLATION_Z = 0b000100;
        const ROTATION_X = 0b001000;
        const ROTATION_Y = 0b010000;
        const ROTATION_Z = 0b100000;
        const ALL = 0b111111;
        const PLANE_2D = Self::TRANSLATION_X.bits() | Self::TRANSLATION_Y.bits() | Self::ROTATION_Z.bits();
    }
}

impl Default for AllowedDofs {
    fn default() -> Self {
        AllowedDofs::ALL
    }
}

impl AllowedDofs {
    /// Component mask applied to linear velocity.
    pub fn translation_mask(&self) -> Vec3 {
        Vec3::new(
            self.contains(Self::TRANSLATION_X) as u8 as f32,
            self.contains(Self::TRANSLATION_Y) as u8 as f32,
            self.contains(Self::TRANSLATION_Z) as u8 as f32,
        )
    }

    /// Component mask applied to angular velocity.
    pub fn rotation_mask(&self) -> Vec3 {
        Vec3::new(
            self.contains(Self::ROTATION_X) as u8 as f32,
            self.contains(Self::ROTATION_Y) as u8 as f32,
            self.contains(Self::ROTATION_Z) as u8 as f32,
        )
    }
}

bitflags! {
    /// Capacity-exhaustion conditions raised during an update.
    ///
    /// An empty set means the step ran without capacity pressure. The bit
    /// values match the integer codes used by native engines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UpdateError: u32 {
        const MANIFOLD_CACHE_FULL = 1 << 0;
        const BODY_PAIR_CACHE_FULL = 1 << 1;
        const CONTACT_CONSTRAINT_FULL = 1 << 2;
    }
}

impl UpdateError {
    pub const NONE: UpdateError = UpdateError::empty();
}
