//! Collision shapes and the registry that owns them.

use std::f32::consts::PI;

use glam::{Mat3, Quat, Vec3};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use crate::{
    config::DEFAULT_CONVEX_RADIUS,
    error::{PhysicsError, Result},
    utils::allocator::{Arena, ArenaId, GenerationalId},
};

/// Primitive collision geometry, centered on the body origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Box with rounded edges; the convex radius is carved out of the half extent.
    Box { half_extent: Vec3, convex_radius: f32 },
    Sphere { radius: f32 },
    /// Capsule along the local Y axis.
    Capsule { half_height: f32, radius: f32 },
}

impl Shape {
    pub fn cuboid(half_extent: Vec3) -> Self {
        let convex_radius = DEFAULT_CONVEX_RADIUS.min(half_extent.min_element());
        Shape::Box {
            half_extent,
            convex_radius,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match *self {
            Shape::Box {
                half_extent,
                convex_radius,
            } => {
                if !half_extent.to_array().into_iter().all(positive) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "box half extent must be positive, got {half_extent}"
                    )));
                }
                if !convex_radius.is_finite()
                    || convex_radius < 0.0
                    || convex_radius > half_extent.min_element()
                {
                    return Err(PhysicsError::InvalidShape(format!(
                        "convex radius {convex_radius} must lie in [0, {}]",
                        half_extent.min_element()
                    )));
                }
            }
            Shape::Sphere { radius } => {
                if !positive(radius) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "sphere radius must be positive, got {radius}"
                    )));
                }
            }
            Shape::Capsule {
                half_height,
                radius,
            } => {
                if !positive(radius) || !half_height.is_finite() || half_height < 0.0 {
                    return Err(PhysicsError::InvalidShape(format!(
                        "capsule needs positive radius and non-negative half height, got ({half_height}, {radius})"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        match *self {
            Shape::Box { half_extent, .. } => 8.0 * half_extent.x * half_extent.y * half_extent.z,
            Shape::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Shape::Capsule {
                half_height,
                radius,
            } => PI * radius * radius * (2.0 * half_height) + 4.0 / 3.0 * PI * radius.powi(3),
        }
    }

    /// Radius of the largest sphere around the origin that fits inside the shape.
    pub fn inner_radius(&self) -> f32 {
        match *self {
            Shape::Box { half_extent, .. } => half_extent.min_element(),
            Shape::Sphere { radius } => radius,
            Shape::Capsule { radius, .. } => radius,
        }
    }

    pub fn local_aabb(&self) -> Aabb {
        match *self {
            Shape::Box { half_extent, .. } => Aabb::from_center_extent(Vec3::ZERO, half_extent),
            Shape::Sphere { radius } => Aabb::from_center_extent(Vec3::ZERO, Vec3::splat(radius)),
            Shape::Capsule {
                half_height,
                radius,
            } => Aabb::from_center_extent(
                Vec3::ZERO,
                Vec3::new(radius, half_height + radius, radius),
            ),
        }
    }

    pub fn world_aabb(&self, position: Vec3, rotation: Quat) -> Aabb {
        match *self {
            Shape::Box { half_extent, .. } => {
                let basis = Mat3::from_quat(rotation);
                let abs = Mat3::from_cols(
                    basis.x_axis.abs(),
                    basis.y_axis.abs(),
                    basis.z_axis.abs(),
                );
                Aabb::from_center_extent(position, abs * half_extent)
            }
            Shape::Sphere { radius } => Aabb::from_center_extent(position, Vec3::splat(radius)),
            Shape::Capsule {
                half_height,
                radius,
            } => {
                let axis = rotation * Vec3::Y * half_height;
                let extent = axis.abs() + Vec3::splat(radius);
                Aabb::from_center_extent(position, extent)
            }
        }
    }
}

/// Generation-checked handle to a shape in a [`ShapeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeHandle(GenerationalId);

impl ArenaId for ShapeHandle {
    fn from_parts(index: u32, generation: u8) -> Self {
        Self(GenerationalId::new(index, generation))
    }

    fn index(&self) -> usize {
        self.0.index as usize
    }

    fn generation(&self) -> u8 {
        self.0.generation
    }
}

#[derive(Debug)]
struct ShapeRecord {
    shape: Shape,
    references: u32,
}

/// Owns shape definitions and tracks how many bodies reference each one.
///
/// The registry is shared through `Arc` between the application and any number of
/// physics systems; a shape can only be released once no live body uses it.
#[derive(Default)]
pub struct ShapeRegistry {
    shapes: RwLock<Arena<ShapeRecord, ShapeHandle>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_box(&self, half_extent: Vec3, convex_radius: f32) -> Result<ShapeHandle> {
        self.insert(Shape::Box {
            half_extent,
            convex_radius,
        })
    }

    pub fn create_sphere(&self, radius: f32) -> Result<ShapeHandle> {
        self.insert(Shape::Sphere { radius })
    }

    pub fn create_capsule(&self, half_height: f32, radius: f32) -> Result<ShapeHandle> {
        self.insert(Shape::Capsule {
            half_height,
            radius,
        })
    }

    pub fn insert(&self, shape: Shape) -> Result<ShapeHandle> {
        shape.validate()?;
        let handle = self
            .shapes
            .write()
            .insert(ShapeRecord {
                shape,
                references: 0,
            })
            .ok_or_else(|| PhysicsError::InvalidShape("shape registry is full".into()))?;
        debug!("created shape {handle:?}: {shape:?}");
        Ok(handle)
    }

    /// Frees a shape that no body references any more.
    pub fn release(&self, handle: ShapeHandle) -> Result<Shape> {
        let mut shapes = self.shapes.write();
        let record = shapes
            .get(handle)
            .ok_or(PhysicsError::UnknownShape(handle))?;
        if record.references > 0 {
            return Err(PhysicsError::ShapeInUse {
                handle,
                references: record.references,
            });
        }
        let record = shapes
            .remove(handle)
            .ok_or(PhysicsError::UnknownShape(handle))?;
        debug!("released shape {handle:?}");
        Ok(record.shape)
    }

    pub fn get(&self, handle: ShapeHandle) -> Option<Shape> {
        self.shapes.read().get(handle).map(|record| record.shape)
    }

    pub fn ref_count(&self, handle: ShapeHandle) -> Option<u32> {
        self.shapes.read().get(handle).map(|record| record.references)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a body reference and returns the geometry it will use.
    pub(crate) fn acquire(&self, handle: ShapeHandle) -> Result<Shape> {
        let mut shapes = self.shapes.write();
        let record = shapes
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownShape(handle))?;
        record.references += 1;
        Ok(record.shape)
    }

    pub(crate) fn release_reference(&self, handle: ShapeHandle) {
        if let Some(record) = self.shapes.write().get_mut(handle) {
            record.references = record.references.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_geometry_is_rejected() {
        let registry = ShapeRegistry::new();
        assert!(matches!(
            registry.create_sphere(0.0),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(matches!(
            registry.create_box(Vec3::splat(0.1), 0.5),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(matches!(
            registry.create_capsule(1.0, f32::NAN),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn referenced_shape_cannot_be_released() {
        let registry = ShapeRegistry::new();
        let handle = registry.create_sphere(0.5).unwrap();
        registry.acquire(handle).unwrap();

        assert_eq!(
            registry.release(handle),
            Err(PhysicsError::ShapeInUse {
                handle,
                references: 1
            })
        );

        registry.release_reference(handle);
        assert!(registry.release(handle).is_ok());
        assert_eq!(registry.release(handle), Err(PhysicsError::UnknownShape(handle)));
    }

    #[test]
    fn rotated_box_bounds_grow() {
        let shape = Shape::cuboid(Vec3::new(1.0, 0.5, 0.5));
        let flat = shape.world_aabb(Vec3::ZERO, Quat::IDENTITY);
        let turned = shape.world_aabb(Vec3::ZERO, Quat::from_rotation_z(45f32.to_radians()));
        assert!((flat.extent().x - 1.0).abs() < 1e-5);
        assert!(turned.extent().y > flat.extent().y);
    }

    #[test]
    fn capsule_volume_includes_caps() {
        let capsule = Shape::Capsule {
            half_height: 0.0,
            radius: 1.0,
        };
        let sphere = Shape::Sphere { radius: 1.0 };
        assert!((capsule.volume() - sphere.volume()).abs() < 1e-5);
    }
}
