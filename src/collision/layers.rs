//! Object-layer / broad-phase-layer collision filtering.
//!
//! Three filters cooperate during a collision step:
//!
//! * a [`BroadPhaseLayerInterface`] decides which broad-phase tree a body lives in,
//! * an [`ObjectVsBroadPhaseLayerFilter`] prunes whole trees before they are queried,
//! * an [`ObjectLayerPairFilter`] makes the final per-pair decision.
//!
//! The table implementations are filled in during setup and then frozen behind an
//! `Arc`, after which they are read-only and may be shared between systems.

use crate::{
    core::types::{BroadPhaseLayer, ObjectLayer},
    error::{PhysicsError, Result},
};

/// Broad-phase layers are addressed by a `u8`.
pub const MAX_BROAD_PHASE_LAYERS: u32 = u8::MAX as u32 + 1;

/// Maps object layers onto broad-phase layers.
pub trait BroadPhaseLayerInterface: Send + Sync {
    fn num_object_layers(&self) -> u32;
    fn num_broad_phase_layers(&self) -> u32;
    fn broad_phase_layer(&self, layer: ObjectLayer) -> Option<BroadPhaseLayer>;
}

/// Decides whether two object layers may collide.
pub trait ObjectLayerPairFilter: Send + Sync {
    fn num_object_layers(&self) -> u32;
    fn should_collide(&self, layer_a: ObjectLayer, layer_b: ObjectLayer) -> bool;
}

/// Decides whether an object layer may collide with anything in a broad-phase layer.
pub trait ObjectVsBroadPhaseLayerFilter: Send + Sync {
    fn should_collide(&self, layer: ObjectLayer, broad_phase_layer: BroadPhaseLayer) -> bool;
}

/// Table-based [`BroadPhaseLayerInterface`].
#[derive(Debug, Clone)]
pub struct BroadPhaseLayerTable {
    mapping: Vec<Option<BroadPhaseLayer>>,
    num_broad_phase_layers: u32,
}

impl BroadPhaseLayerTable {
    pub fn new(num_object_layers: u32, num_broad_phase_layers: u32) -> Result<Self> {
        if num_object_layers == 0
            || num_broad_phase_layers == 0
            || num_broad_phase_layers > MAX_BROAD_PHASE_LAYERS
        {
            return Err(PhysicsError::InvalidLayerCount);
        }
        Ok(Self {
            mapping: vec![None; num_object_layers as usize],
            num_broad_phase_layers,
        })
    }

    /// Assigns an object layer to a broad-phase layer; the last assignment wins.
    pub fn map(&mut self, layer: ObjectLayer, broad_phase_layer: BroadPhaseLayer) -> Result<()> {
        if broad_phase_layer.0 as u32 >= self.num_broad_phase_layers {
            return Err(PhysicsError::InvalidBroadPhaseLayer(broad_phase_layer));
        }
        let slot = self
            .mapping
            .get_mut(layer.0 as usize)
            .ok_or(PhysicsError::InvalidObjectLayer(layer))?;
        *slot = Some(broad_phase_layer);
        Ok(())
    }

    /// Fails with the first object layer that has no mapping.
    pub fn validate(&self) -> Result<()> {
        match self.mapping.iter().position(Option::is_none) {
            Some(index) => Err(PhysicsError::UnmappedObjectLayer(ObjectLayer(index as u32))),
            None => Ok(()),
        }
    }
}

impl BroadPhaseLayerInterface for BroadPhaseLayerTable {
    fn num_object_layers(&self) -> u32 {
        self.mapping.len() as u32
    }

    fn num_broad_phase_layers(&self) -> u32 {
        self.num_broad_phase_layers
    }

    fn broad_phase_layer(&self, layer: ObjectLayer) -> Option<BroadPhaseLayer> {
        self.mapping.get(layer.0 as usize).copied().flatten()
    }
}

/// Symmetric boolean matrix over object layers; every pair starts disabled.
#[derive(Debug, Clone)]
pub struct ObjectLayerPairFilterTable {
    num_object_layers: u32,
    bits: Vec<bool>,
}

impl ObjectLayerPairFilterTable {
    pub fn new(num_object_layers: u32) -> Result<Self> {
        if num_object_layers == 0 {
            return Err(PhysicsError::InvalidLayerCount);
        }
        let n = num_object_layers as usize;
        Ok(Self {
            num_object_layers,
            bits: vec![false; n * n],
        })
    }

    pub fn enable_collision(&mut self, layer_a: ObjectLayer, layer_b: ObjectLayer) -> Result<()> {
        self.set(layer_a, layer_b, true)
    }

    pub fn disable_collision(&mut self, layer_a: ObjectLayer, layer_b: ObjectLayer) -> Result<()> {
        self.set(layer_a, layer_b, false)
    }

    fn set(&mut self, layer_a: ObjectLayer, layer_b: ObjectLayer, value: bool) -> Result<()> {
        let a = self.checked(layer_a)?;
        let b = self.checked(layer_b)?;
        let n = self.num_object_layers as usize;
        self.bits[a * n + b] = value;
        self.bits[b * n + a] = value;
        Ok(())
    }

    fn checked(&self, layer: ObjectLayer) -> Result<usize> {
        if layer.0 < self.num_object_layers {
            Ok(layer.0 as usize)
        } else {
            Err(PhysicsError::InvalidObjectLayer(layer))
        }
    }
}

impl ObjectLayerPairFilter for ObjectLayerPairFilterTable {
    fn num_object_layers(&self) -> u32 {
        self.num_object_layers
    }

    fn should_collide(&self, layer_a: ObjectLayer, layer_b: ObjectLayer) -> bool {
        let n = self.num_object_layers;
        if layer_a.0 >= n || layer_b.0 >= n {
            return false;
        }
        let n = n as usize;
        self.bits[layer_a.0 as usize * n + layer_b.0 as usize]
    }
}

/// [`ObjectVsBroadPhaseLayerFilter`] derived from a layer table and a pair filter.
///
/// An object layer collides with a broad-phase layer when it collides with at
/// least one object layer mapped into it. The answers are precomputed.
#[derive(Debug, Clone)]
pub struct ObjectVsBroadPhaseLayerFilterTable {
    num_object_layers: u32,
    num_broad_phase_layers: u32,
    bits: Vec<bool>,
}

impl ObjectVsBroadPhaseLayerFilterTable {
    pub fn new(
        broad_phase_layers: &dyn BroadPhaseLayerInterface,
        pair_filter: &dyn ObjectLayerPairFilter,
    ) -> Result<Self> {
        let num_object_layers = broad_phase_layers.num_object_layers();
        let num_broad_phase_layers = broad_phase_layers.num_broad_phase_layers();
        if num_object_layers == 0
            || num_broad_phase_layers == 0
            || num_broad_phase_layers > MAX_BROAD_PHASE_LAYERS
        {
            return Err(PhysicsError::InvalidLayerCount);
        }
        if pair_filter.num_object_layers() != num_object_layers {
            return Err(PhysicsError::LayerCountMismatch {
                expected: num_object_layers,
                found: pair_filter.num_object_layers(),
            });
        }

        let stride = num_broad_phase_layers as usize;
        let mut bits = vec![false; num_object_layers as usize * stride];
        for target in 0..num_object_layers {
            let target = ObjectLayer(target);
            let bp = broad_phase_layers
                .broad_phase_layer(target)
                .ok_or(PhysicsError::UnmappedObjectLayer(target))?;
            if bp.0 as usize >= stride {
                return Err(PhysicsError::InvalidBroadPhaseLayer(bp));
            }
            for source in 0..num_object_layers {
                if pair_filter.should_collide(ObjectLayer(source), target) {
                    bits[source as usize * stride + bp.0 as usize] = true;
                }
            }
        }

        Ok(Self {
            num_object_layers,
            num_broad_phase_layers,
            bits,
        })
    }
}

impl ObjectVsBroadPhaseLayerFilter for ObjectVsBroadPhaseLayerFilterTable {
    fn should_collide(&self, layer: ObjectLayer, broad_phase_layer: BroadPhaseLayer) -> bool {
        if layer.0 >= self.num_object_layers || broad_phase_layer.0 as u32 >= self.num_broad_phase_layers {
            return false;
        }
        self.bits
            .get(layer.0 as usize * self.num_broad_phase_layers as usize + broad_phase_layer.0 as usize)
            .copied()
            .unwrap_or(false)
    }
}
