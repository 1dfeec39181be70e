//! Rigid body records and the settings used to create them.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{
    aabb::Aabb,
    shape::{Shape, ShapeHandle},
    types::{AllowedDofs, BodyId, MotionQuality, MotionType, ObjectLayer},
};
use crate::{
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_FRICTION, DEFAULT_LINEAR_DAMPING, DEFAULT_RESTITUTION},
    utils::math::{inertia_box, inertia_capsule, inertia_sphere, world_inverse_inertia},
};

/// Everything needed to create a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyCreationSettings {
    pub shape: ShapeHandle,
    pub position: Vec3,
    pub rotation: Quat,
    pub motion_type: MotionType,
    pub object_layer: ObjectLayer,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub gravity_factor: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleeping: bool,
    pub motion_quality: MotionQuality,
    pub allowed_dofs: AllowedDofs,
    /// Density in kg/m³; `None` uses the system default.
    pub density: Option<f32>,
    /// Explicit mass that replaces the density-derived one.
    pub mass_override: Option<f32>,
}

impl BodyCreationSettings {
    pub fn new(
        shape: ShapeHandle,
        position: Vec3,
        rotation: Quat,
        motion_type: MotionType,
        object_layer: ObjectLayer,
    ) -> Self {
        Self {
            shape,
            position,
            rotation,
            motion_type,
            object_layer,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
            gravity_factor: 1.0,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            allow_sleeping: true,
            motion_quality: MotionQuality::Discrete,
            allowed_dofs: AllowedDofs::ALL,
            density: None,
            mass_override: None,
        }
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = velocity;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_gravity_factor(mut self, gravity_factor: f32) -> Self {
        self.gravity_factor = gravity_factor;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    pub fn with_allow_sleeping(mut self, allow: bool) -> Self {
        self.allow_sleeping = allow;
        self
    }

    pub fn with_motion_quality(mut self, quality: MotionQuality) -> Self {
        self.motion_quality = quality;
        self
    }

    pub fn with_allowed_dofs(mut self, dofs: AllowedDofs) -> Self {
        self.allowed_dofs = dofs;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = Some(density);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass_override = Some(mass);
        self
    }
}

/// A simulated body.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub shape_handle: ShapeHandle,
    pub shape: Shape,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub motion_type: MotionType,
    pub motion_quality: MotionQuality,
    pub object_layer: ObjectLayer,
    pub friction: f32,
    pub restitution: f32,
    pub gravity_factor: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleeping: bool,
    pub allowed_dofs: AllowedDofs,
    pub mass: f32,
    pub(crate) inverse_inertia_local: Vec3,
    pub(crate) force: Vec3,
    pub(crate) is_added: bool,
    pub(crate) is_active: bool,
    pub(crate) sleep_timer: f32,
}

impl Body {
    pub(crate) fn new(id: BodyId, settings: &BodyCreationSettings, shape: Shape, default_density: f32) -> Self {
        let density = settings.density.unwrap_or(default_density);
        let mass = match settings.mass_override {
            Some(mass) if mass.is_finite() && mass > 0.0 => mass,
            _ => (shape.volume() * density).max(f32::EPSILON),
        };
        let inertia = match shape {
            Shape::Box { half_extent, .. } => inertia_box(half_extent, mass),
            Shape::Sphere { radius } => inertia_sphere(radius, mass),
            Shape::Capsule {
                half_height,
                radius,
            } => inertia_capsule(radius, half_height * 2.0, mass),
        };

        let (linear_velocity, angular_velocity) = match settings.motion_type {
            MotionType::Static => (Vec3::ZERO, Vec3::ZERO),
            _ => (
                settings.linear_velocity * settings.allowed_dofs.translation_mask(),
                settings.angular_velocity * settings.allowed_dofs.rotation_mask(),
            ),
        };

        Self {
            id,
            shape_handle: settings.shape,
            shape,
            position: settings.position,
            rotation: settings.rotation.normalize(),
            linear_velocity,
            angular_velocity,
            motion_type: settings.motion_type,
            motion_quality: settings.motion_quality,
            object_layer: settings.object_layer,
            friction: settings.friction,
            restitution: settings.restitution,
            gravity_factor: settings.gravity_factor,
            linear_damping: settings.linear_damping,
            angular_damping: settings.angular_damping,
            allow_sleeping: settings.allow_sleeping,
            allowed_dofs: settings.allowed_dofs,
            mass,
            inverse_inertia_local: inertia.recip(),
            force: Vec3::ZERO,
            is_added: false,
            is_active: false,
            sleep_timer: 0.0,
        }
    }

    pub fn is_static(&self) -> bool {
        self.motion_type == MotionType::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.motion_type == MotionType::Dynamic
    }

    pub fn is_added(&self) -> bool {
        self.is_added
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Zero for anything that is not dynamic, so contacts treat it as immovable.
    pub fn inverse_mass(&self) -> f32 {
        if self.is_dynamic() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    pub fn world_inverse_inertia(&self) -> Mat3 {
        if self.is_dynamic() {
            let locked = self.allowed_dofs.rotation_mask();
            let inverse = world_inverse_inertia(self.inverse_inertia_local, self.rotation);
            Mat3::from_diagonal(locked) * inverse * Mat3::from_diagonal(locked)
        } else {
            Mat3::ZERO
        }
    }

    pub fn world_bounds(&self) -> Aabb {
        self.shape.world_aabb(self.position, self.rotation)
    }

    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    /// Applies an impulse at the center of mass.
    pub(crate) fn apply_linear_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass() * self.allowed_dofs.translation_mask();
    }

    pub(crate) fn reset_motion(&mut self) {
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.force = Vec3::ZERO;
        self.sleep_timer = 0.0;
    }
}
