//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Identity rotation `(0, 0, 0, 1)`.
pub fn quat_identity() -> Quat {
    Quat::IDENTITY
}

/// Hamilton product `a * b` (rotate by `b`, then by `a`), renormalized.
pub fn combine_rotations(a: Quat, b: Quat) -> Quat {
    (a * b).normalize()
}

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Diagonal inertia of a solid box.
pub fn inertia_box(half_extent: Vec3, mass: f32) -> Vec3 {
    let size = half_extent * 2.0;
    let sq = size * size;
    Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0)
}

/// Diagonal inertia of a solid sphere.
pub fn inertia_sphere(radius: f32, mass: f32) -> Vec3 {
    Vec3::splat(0.4 * mass * radius * radius)
}

/// Builds an inertia tensor for a solid capsule aligned along Y.
pub fn inertia_capsule(radius: f32, height: f32, mass: f32) -> Vec3 {
    let cylinder_mass = mass * 0.6;
    let sphere_mass = (mass - cylinder_mass) / 2.0;

    let cylinder_inertia = Vec3::new(
        (1.0 / 12.0) * cylinder_mass * (3.0 * radius * radius + height * height),
        0.5 * cylinder_mass * radius * radius,
        (1.0 / 12.0) * cylinder_mass * (3.0 * radius * radius + height * height),
    );

    cylinder_inertia + Vec3::splat(0.4 * sphere_mass * radius * radius)
}

/// Rotates a diagonal local inverse inertia into world space.
pub fn world_inverse_inertia(local_inverse: Vec3, rotation: Quat) -> Mat3 {
    let basis = Mat3::from_quat(rotation);
    basis * Mat3::from_diagonal(local_inverse) * basis.transpose()
}
