use glam::{Mat3, Vec3};

use crate::{
    collision::contact::{CachedImpulse, ContactManifold, ManifoldCache},
    config::SimulationTuning,
    core::{body::Body, types::BodyId},
    utils::allocator::Arena,
};

#[derive(Debug, Clone, Copy)]
struct ConstraintPoint {
    r_a: Vec3,
    r_b: Vec3,
    depth: f32,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    /// Minimum relative normal velocity the solver drives towards.
    target_velocity: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// One contact constraint per manifold.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vec3,
    tangents: [Vec3; 2],
    friction: f32,
    inv_mass_a: Vec3,
    inv_mass_b: Vec3,
    inv_inertia_a: Mat3,
    inv_inertia_b: Mat3,
    anchor_a: Vec3,
    anchor_b: Vec3,
    points: Vec<ConstraintPoint>,
}

impl ContactConstraint {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn normal_impulse(&self) -> f32 {
        self.points.iter().map(|p| p.normal_impulse).sum()
    }

    fn cached_impulse(&self) -> CachedImpulse {
        let mut tangent = Vec3::ZERO;
        let mut normal = 0.0;
        for point in &self.points {
            normal += point.normal_impulse;
            tangent += self.tangents[0] * point.tangent_impulse[0]
                + self.tangents[1] * point.tangent_impulse[1];
        }
        CachedImpulse { normal, tangent }
    }
}

/// Sequential-impulse contact solver with warm starting and position projection.
///
/// Constraints are processed in the order given, so identical inputs always
/// produce identical results.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub baumgarte: f32,
    pub penetration_slop: f32,
    pub min_velocity_for_restitution: f32,
}

impl ContactSolver {
    pub fn new(tuning: &SimulationTuning) -> Self {
        Self {
            velocity_iterations: tuning.num_velocity_steps,
            position_iterations: tuning.num_position_steps,
            baumgarte: tuning.baumgarte,
            penetration_slop: tuning.penetration_slop,
            min_velocity_for_restitution: tuning.min_velocity_for_restitution,
        }
    }

    /// Builds constraints for `manifolds`, seeding them from `cache`.
    pub fn prepare(
        &self,
        bodies: &Arena<Body, BodyId>,
        manifolds: &[ContactManifold],
        cache: &ManifoldCache,
        dt: f32,
    ) -> Vec<ContactConstraint> {
        manifolds
            .iter()
            .filter_map(|manifold| {
                let a = bodies.get(manifold.body_a)?;
                let b = bodies.get(manifold.body_b)?;
                let cached = cache.get((manifold.body_a, manifold.body_b));
                Some(self.prepare_one(a, b, manifold, cached, dt))
            })
            .collect()
    }

    fn prepare_one(
        &self,
        a: &Body,
        b: &Body,
        manifold: &ContactManifold,
        cached: Option<CachedImpulse>,
        dt: f32,
    ) -> ContactConstraint {
        let normal = manifold.normal;
        let tangents = tangent_basis(normal);
        let (inv_mass_a, inv_inertia_a) = solver_mass(a);
        let (inv_mass_b, inv_inertia_b) = solver_mass(b);
        let restitution = a.restitution.max(b.restitution);
        let point_count = manifold.points.len().max(1) as f32;

        let effective_mass = |direction: Vec3, r_a: Vec3, r_b: Vec3| {
            let ra_cross = r_a.cross(direction);
            let rb_cross = r_b.cross(direction);
            let k = direction.dot(inv_mass_a * direction)
                + direction.dot(inv_mass_b * direction)
                + ra_cross.dot(inv_inertia_a * ra_cross)
                + rb_cross.dot(inv_inertia_b * rb_cross);
            if k > f32::EPSILON {
                1.0 / k
            } else {
                0.0
            }
        };

        let points = manifold
            .points
            .iter()
            .map(|contact| {
                let r_a = contact.position - a.position;
                let r_b = contact.position - b.position;
                let approach = (b.velocity_at(contact.position) - a.velocity_at(contact.position)).dot(normal);

                let gap = -contact.depth;
                let mut target_velocity = if gap > 0.0 { -gap / dt } else { 0.0 };
                let hits_this_step = gap <= 0.0 || approach * dt + gap < 0.0;
                if hits_this_step && restitution > 0.0 && approach < -self.min_velocity_for_restitution {
                    target_velocity = target_velocity.max(-restitution * approach);
                }

                let (normal_impulse, tangent_impulse) = match cached {
                    Some(cached) => (
                        cached.normal / point_count,
                        [
                            cached.tangent.dot(tangents[0]) / point_count,
                            cached.tangent.dot(tangents[1]) / point_count,
                        ],
                    ),
                    None => (0.0, [0.0; 2]),
                };

                ConstraintPoint {
                    r_a,
                    r_b,
                    depth: contact.depth,
                    normal_mass: effective_mass(normal, r_a, r_b),
                    tangent_mass: [
                        effective_mass(tangents[0], r_a, r_b),
                        effective_mass(tangents[1], r_a, r_b),
                    ],
                    target_velocity,
                    normal_impulse,
                    tangent_impulse,
                }
            })
            .collect();

        ContactConstraint {
            body_a: manifold.body_a,
            body_b: manifold.body_b,
            normal,
            tangents,
            friction: (a.friction * b.friction).max(0.0).sqrt(),
            inv_mass_a,
            inv_mass_b,
            inv_inertia_a,
            inv_inertia_b,
            anchor_a: a.position,
            anchor_b: b.position,
            points,
        }
    }

    /// Applies the impulses carried over from the previous step.
    pub fn warm_start(&self, bodies: &mut Arena<Body, BodyId>, constraints: &[ContactConstraint]) {
        for constraint in constraints {
            let Some((a, b)) = bodies.get2_mut(constraint.body_a, constraint.body_b) else {
                continue;
            };
            for point in &constraint.points {
                let impulse = constraint.normal * point.normal_impulse
                    + constraint.tangents[0] * point.tangent_impulse[0]
                    + constraint.tangents[1] * point.tangent_impulse[1];
                apply(constraint, point, a, b, impulse);
            }
        }
    }

    pub fn solve_velocities(&self, bodies: &mut Arena<Body, BodyId>, constraints: &mut [ContactConstraint]) {
        for _ in 0..self.velocity_iterations {
            for constraint in constraints.iter_mut() {
                let Some((a, b)) = bodies.get2_mut(constraint.body_a, constraint.body_b) else {
                    continue;
                };
                Self::solve_constraint(constraint, a, b);
            }
        }
    }

    fn solve_constraint(constraint: &mut ContactConstraint, a: &mut Body, b: &mut Body) {
        let normal = constraint.normal;
        for index in 0..constraint.points.len() {
            let point = constraint.points[index];
            let relative = relative_velocity(a, b, &point);

            // Friction first so the normal impulse has the final say on penetration.
            let limit = constraint.friction * point.normal_impulse;
            let mut tangent_impulse = point.tangent_impulse;
            for axis in 0..2 {
                let lambda = -relative.dot(constraint.tangents[axis]) * point.tangent_mass[axis];
                tangent_impulse[axis] += lambda;
            }
            let magnitude = (tangent_impulse[0].powi(2) + tangent_impulse[1].powi(2)).sqrt();
            if magnitude > limit && magnitude > 0.0 {
                let scale = limit / magnitude;
                tangent_impulse[0] *= scale;
                tangent_impulse[1] *= scale;
            }
            let delta_tangent = constraint.tangents[0] * (tangent_impulse[0] - point.tangent_impulse[0])
                + constraint.tangents[1] * (tangent_impulse[1] - point.tangent_impulse[1]);
            apply(constraint, &point, a, b, delta_tangent);
            constraint.points[index].tangent_impulse = tangent_impulse;

            let point = constraint.points[index];
            let approach = relative_velocity(a, b, &point).dot(normal);
            let lambda = -(approach - point.target_velocity) * point.normal_mass;
            let accumulated = (point.normal_impulse + lambda).max(0.0);
            let delta = accumulated - point.normal_impulse;
            apply(constraint, &point, a, b, normal * delta);
            constraint.points[index].normal_impulse = accumulated;
        }
    }

    /// Pushes penetrating bodies apart; only positions change.
    pub fn solve_positions(&self, bodies: &mut Arena<Body, BodyId>, constraints: &[ContactConstraint]) {
        for _ in 0..self.position_iterations {
            for constraint in constraints {
                let Some((a, b)) = bodies.get2_mut(constraint.body_a, constraint.body_b) else {
                    continue;
                };
                let normal = constraint.normal;
                let k = normal.dot(constraint.inv_mass_a * normal) + normal.dot(constraint.inv_mass_b * normal);
                if k <= f32::EPSILON {
                    continue;
                }

                let drift = ((b.position - constraint.anchor_b) - (a.position - constraint.anchor_a)).dot(normal);
                let deepest = constraint
                    .points
                    .iter()
                    .map(|p| p.depth)
                    .fold(f32::NEG_INFINITY, f32::max);
                let penetration = deepest - drift;
                let correction = (penetration - self.penetration_slop).max(0.0) * self.baumgarte;
                if correction <= 0.0 {
                    continue;
                }

                let push = normal * (correction / k);
                a.position -= constraint.inv_mass_a * push;
                b.position += constraint.inv_mass_b * push;
            }
        }
    }

    /// Stores accumulated impulses for the next step. Returns `false` on overflow.
    pub fn store_impulses(&self, constraints: &[ContactConstraint], cache: &mut ManifoldCache) -> bool {
        cache.store(
            constraints
                .iter()
                .map(|c| ((c.body_a, c.body_b), c.cached_impulse())),
        )
    }
}

/// Inverse mass per axis and world inverse inertia as seen by the solver.
/// Bodies that are not being simulated right now act as immovable.
fn solver_mass(body: &Body) -> (Vec3, Mat3) {
    if body.is_active() && body.is_dynamic() {
        (
            body.allowed_dofs.translation_mask() * body.inverse_mass(),
            body.world_inverse_inertia(),
        )
    } else {
        (Vec3::ZERO, Mat3::ZERO)
    }
}

fn relative_velocity(a: &Body, b: &Body, point: &ConstraintPoint) -> Vec3 {
    let va = a.linear_velocity + a.angular_velocity.cross(point.r_a);
    let vb = b.linear_velocity + b.angular_velocity.cross(point.r_b);
    vb - va
}

fn apply(constraint: &ContactConstraint, point: &ConstraintPoint, a: &mut Body, b: &mut Body, impulse: Vec3) {
    a.linear_velocity -= constraint.inv_mass_a * impulse;
    a.angular_velocity -= constraint.inv_inertia_a * point.r_a.cross(impulse);
    b.linear_velocity += constraint.inv_mass_b * impulse;
    b.angular_velocity += constraint.inv_inertia_b * point.r_b.cross(impulse);
}

fn tangent_basis(normal: Vec3) -> [Vec3; 2] {
    let first = normal.any_orthonormal_vector();
    [first, normal.cross(first)]
}
