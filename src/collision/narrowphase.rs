use glam::{Mat3, Quat, Vec3};

use crate::{
    collision::contact::{ContactManifold, ContactPoint, MAX_MANIFOLD_POINTS},
    core::{shape::Shape, types::BodyId},
};

/// World placement of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            position: self.position + offset,
            rotation: self.rotation,
        }
    }
}

/// Normal (A→B), points and signed depths for a pair of primitives.
type RawContact = (Vec3, Vec<ContactPoint>);

const EPSILON: f32 = 1e-6;

/// Closed-form sphere and capsule tests built on a shared sphere-sphere kernel.
struct SphereAlgorithm;

impl SphereAlgorithm {
    fn spheres(
        center_a: Vec3,
        radius_a: f32,
        center_b: Vec3,
        radius_b: f32,
        max_separation: f32,
    ) -> Option<(Vec3, ContactPoint)> {
        let delta = center_b - center_a;
        let distance = delta.length();
        let separation = distance - radius_a - radius_b;
        if separation > max_separation {
            return None;
        }
        let normal = if distance > EPSILON {
            delta / distance
        } else {
            Vec3::Y
        };
        let surface_a = center_a + normal * radius_a;
        let surface_b = center_b - normal * radius_b;
        Some((
            normal,
            ContactPoint {
                position: (surface_a + surface_b) * 0.5,
                depth: -separation,
            },
        ))
    }

    fn closest_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
        let segment = end - start;
        let length_sq = segment.length_squared();
        if length_sq < EPSILON {
            return start;
        }
        let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
        start + segment * t
    }

    /// Closest points between segments `p1-q1` and `p2-q2`.
    fn closest_between_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
        let d1 = q1 - p1;
        let d2 = q2 - p2;
        let r = p1 - p2;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(r);

        if a < EPSILON && e < EPSILON {
            return (p1, p2);
        }
        let (s, t) = if a < EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(r);
            if e < EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(d2);
                let denom = a * e - b * b;
                let mut s = if denom > EPSILON {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };
        (p1 + d1 * s, p2 + d2 * t)
    }
}

/// Rounded oriented box: an inner box inflated by the convex radius.
#[derive(Debug, Clone, Copy)]
struct RoundedBox {
    center: Vec3,
    rotation: Quat,
    inner: Vec3,
    rounding: f32,
}

impl RoundedBox {
    fn new(pose: &Pose, half_extent: Vec3, convex_radius: f32) -> Self {
        Self {
            center: pose.position,
            rotation: pose.rotation,
            inner: (half_extent - Vec3::splat(convex_radius)).max(Vec3::ZERO),
            rounding: convex_radius,
        }
    }

    /// Closest point on the inner box, outward normal and signed distance to it.
    fn closest_point(&self, point: Vec3) -> (Vec3, Vec3, f32) {
        let local = self.rotation.conjugate() * (point - self.center);
        let clamped = local.clamp(-self.inner, self.inner);
        let outside = local - clamped;

        if outside.length_squared() > EPSILON * EPSILON {
            let distance = outside.length();
            let normal = self.rotation * (outside / distance);
            return (self.center + self.rotation * clamped, normal, distance);
        }

        // Inside: leave through the nearest face.
        let gaps = self.inner - local.abs();
        let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            0
        } else if gaps.y <= gaps.z {
            1
        } else {
            2
        };
        let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        let mut local_normal = Vec3::ZERO;
        local_normal[axis] = sign;
        let mut surface = local;
        surface[axis] = sign * self.inner[axis];
        (
            self.center + self.rotation * surface,
            self.rotation * local_normal,
            -gaps[axis],
        )
    }

    /// Contact between this box (A) and a sphere (B).
    fn sphere(&self, center: Vec3, radius: f32, max_separation: f32) -> Option<(Vec3, ContactPoint)> {
        let (closest, normal, distance) = self.closest_point(center);
        let separation = distance - radius - self.rounding;
        if separation > max_separation {
            return None;
        }
        let surface_a = closest + normal * self.rounding;
        let surface_b = center - normal * radius;
        Some((
            normal,
            ContactPoint {
                position: (surface_a + surface_b) * 0.5,
                depth: -separation,
            },
        ))
    }
}

/// Separating axis test for box pairs plus vertex clipping for the manifold.
struct SATAlgorithm;

impl SATAlgorithm {
    fn corners(pose: &Pose, half_extent: Vec3) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let local = Vec3::new(
                if i & 1 == 0 { -half_extent.x } else { half_extent.x },
                if i & 2 == 0 { -half_extent.y } else { half_extent.y },
                if i & 4 == 0 { -half_extent.z } else { half_extent.z },
            );
            *corner = pose.position + pose.rotation * local;
        }
        corners
    }

    fn projected_extent(basis: &Mat3, half_extent: Vec3, axis: Vec3) -> f32 {
        basis.x_axis.dot(axis).abs() * half_extent.x
            + basis.y_axis.dot(axis).abs() * half_extent.y
            + basis.z_axis.dot(axis).abs() * half_extent.z
    }

    fn boxes(
        pose_a: &Pose,
        half_extent_a: Vec3,
        pose_b: &Pose,
        half_extent_b: Vec3,
        max_separation: f32,
    ) -> Option<RawContact> {
        let basis_a = Mat3::from_quat(pose_a.rotation);
        let basis_b = Mat3::from_quat(pose_b.rotation);
        let relative = pose_b.position - pose_a.position;

        let mut axes: Vec<(Vec3, bool)> = Vec::with_capacity(15);
        for axis in [basis_a.x_axis, basis_a.y_axis, basis_a.z_axis] {
            axes.push((axis, true));
        }
        for axis in [basis_b.x_axis, basis_b.y_axis, basis_b.z_axis] {
            axes.push((axis, true));
        }
        for axis_a in [basis_a.x_axis, basis_a.y_axis, basis_a.z_axis] {
            for axis_b in [basis_b.x_axis, basis_b.y_axis, basis_b.z_axis] {
                let axis = axis_a.cross(axis_b);
                if axis.length_squared() > 1e-6 {
                    axes.push((axis.normalize(), false));
                }
            }
        }

        let mut best_overlap = f32::MAX;
        let mut best_axis = Vec3::Y;
        for (axis, is_face) in axes {
            let extent_a = Self::projected_extent(&basis_a, half_extent_a, axis);
            let extent_b = Self::projected_extent(&basis_b, half_extent_b, axis);
            let projection = relative.dot(axis);
            let overlap = extent_a + extent_b - projection.abs();
            if -overlap > max_separation {
                return None;
            }
            // Face axes win ties so resting stacks keep a stable normal.
            let score = if is_face { overlap } else { overlap + 1e-3 };
            if score < best_overlap {
                best_overlap = score;
                best_axis = if projection < 0.0 { -axis } else { axis };
            }
        }
        let normal = best_axis;

        let plane_a = pose_a.position.dot(normal) + Self::projected_extent(&basis_a, half_extent_a, normal);
        let plane_b = pose_b.position.dot(normal) - Self::projected_extent(&basis_b, half_extent_b, normal);
        let slack = max_separation.max(0.0) + 1e-3;

        let mut points: Vec<ContactPoint> = Vec::new();
        for corner in Self::corners(pose_b, half_extent_b) {
            let depth = plane_a - corner.dot(normal);
            let on_face = corner + normal * depth;
            let local = pose_a.rotation.conjugate() * (on_face - pose_a.position);
            if depth >= -max_separation && Self::within(local, half_extent_a, slack) {
                points.push(ContactPoint {
                    position: corner + normal * depth * 0.5,
                    depth,
                });
            }
        }
        for corner in Self::corners(pose_a, half_extent_a) {
            let depth = corner.dot(normal) - plane_b;
            let on_face = corner - normal * depth;
            let local = pose_b.rotation.conjugate() * (on_face - pose_b.position);
            if depth >= -max_separation && Self::within(local, half_extent_b, slack) {
                points.push(ContactPoint {
                    position: corner - normal * depth * 0.5,
                    depth,
                });
            }
        }

        if points.is_empty() {
            // Edge-edge contact: use the midpoint of the supporting features.
            let support_a = Self::support(pose_a, half_extent_a, normal);
            let support_b = Self::support(pose_b, half_extent_b, -normal);
            points.push(ContactPoint {
                position: (support_a + support_b) * 0.5,
                depth: best_overlap.min(plane_a - plane_b),
            });
        }

        Some((normal, reduce(points)))
    }

    /// Containment test for a corner already projected onto the opposing face.
    fn within(local: Vec3, half_extent: Vec3, slack: f32) -> bool {
        local.abs().cmple(half_extent + Vec3::splat(slack)).all()
    }

    fn support(pose: &Pose, half_extent: Vec3, direction: Vec3) -> Vec3 {
        let local_dir = pose.rotation.conjugate() * direction;
        let local = Vec3::new(
            half_extent.x.copysign(local_dir.x),
            half_extent.y.copysign(local_dir.y),
            half_extent.z.copysign(local_dir.z),
        );
        pose.position + pose.rotation * local
    }
}

/// Keeps the deepest points, in a stable order.
fn reduce(mut points: Vec<ContactPoint>) -> Vec<ContactPoint> {
    points.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    let mut kept: Vec<ContactPoint> = Vec::with_capacity(MAX_MANIFOLD_POINTS);
    for point in points {
        if kept
            .iter()
            .any(|k| k.position.distance_squared(point.position) < 1e-6)
        {
            continue;
        }
        kept.push(point);
        if kept.len() == MAX_MANIFOLD_POINTS {
            break;
        }
    }
    kept
}

fn capsule_segment(pose: &Pose, half_height: f32) -> (Vec3, Vec3) {
    let axis = pose.rotation * Vec3::Y * half_height;
    (pose.position - axis, pose.position + axis)
}

/// Narrow phase dispatcher for box, sphere and capsule pairs.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Generates a manifold when the shapes overlap or are closer than
    /// `max_separation`. Pass `f32::INFINITY` to obtain a distance query.
    pub fn collide(
        body_a: BodyId,
        shape_a: &Shape,
        pose_a: &Pose,
        body_b: BodyId,
        shape_b: &Shape,
        pose_b: &Pose,
        max_separation: f32,
    ) -> Option<ContactManifold> {
        let (normal, points) = Self::collide_shapes(shape_a, pose_a, shape_b, pose_b, max_separation)?;
        if points.is_empty() {
            return None;
        }
        Some(ContactManifold {
            body_a,
            body_b,
            normal,
            points,
        })
    }

    fn collide_shapes(
        shape_a: &Shape,
        pose_a: &Pose,
        shape_b: &Shape,
        pose_b: &Pose,
        max_separation: f32,
    ) -> Option<RawContact> {
        let single = |(normal, point): (Vec3, ContactPoint)| (normal, vec![point]);
        let flip = |(normal, points): RawContact| (-normal, points);

        match (*shape_a, *shape_b) {
            (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
                SphereAlgorithm::spheres(pose_a.position, ra, pose_b.position, rb, max_separation)
                    .map(single)
            }
            (
                Shape::Box {
                    half_extent,
                    convex_radius,
                },
                Shape::Sphere { radius },
            ) => RoundedBox::new(pose_a, half_extent, convex_radius)
                .sphere(pose_b.position, radius, max_separation)
                .map(single),
            (Shape::Sphere { .. }, Shape::Box { .. }) => {
                Self::collide_shapes(shape_b, pose_b, shape_a, pose_a, max_separation).map(flip)
            }
            (
                Shape::Capsule {
                    half_height,
                    radius: rc,
                },
                Shape::Sphere { radius: rs },
            ) => {
                let (start, end) = capsule_segment(pose_a, half_height);
                let closest = SphereAlgorithm::closest_on_segment(start, end, pose_b.position);
                SphereAlgorithm::spheres(closest, rc, pose_b.position, rs, max_separation).map(single)
            }
            (Shape::Sphere { .. }, Shape::Capsule { .. }) => {
                Self::collide_shapes(shape_b, pose_b, shape_a, pose_a, max_separation).map(flip)
            }
            (
                Shape::Capsule {
                    half_height: ha,
                    radius: ra,
                },
                Shape::Capsule {
                    half_height: hb,
                    radius: rb,
                },
            ) => {
                let (pa, qa) = capsule_segment(pose_a, ha);
                let (pb, qb) = capsule_segment(pose_b, hb);
                let (ca, cb) = SphereAlgorithm::closest_between_segments(pa, qa, pb, qb);
                SphereAlgorithm::spheres(ca, ra, cb, rb, max_separation).map(single)
            }
            (
                Shape::Box {
                    half_extent,
                    convex_radius,
                },
                Shape::Capsule {
                    half_height,
                    radius,
                },
            ) => {
                let rounded = RoundedBox::new(pose_a, half_extent, convex_radius);
                let (start, end) = capsule_segment(pose_b, half_height);
                let middle = SphereAlgorithm::closest_on_segment(start, end, pose_a.position);
                let refined = SphereAlgorithm::closest_on_segment(
                    start,
                    end,
                    rounded.closest_point(middle).0,
                );

                let mut best: Option<(Vec3, f32)> = None;
                let mut points = Vec::new();
                for candidate in [start, end, refined] {
                    if let Some((normal, point)) = rounded.sphere(candidate, radius, max_separation) {
                        if best.map_or(true, |(_, depth)| point.depth > depth) {
                            best = Some((normal, point.depth));
                        }
                        points.push(point);
                    }
                }
                best.map(|(normal, _)| (normal, reduce(points)))
            }
            (Shape::Capsule { .. }, Shape::Box { .. }) => {
                Self::collide_shapes(shape_b, pose_b, shape_a, pose_a, max_separation).map(flip)
            }
            (
                Shape::Box {
                    half_extent: he_a, ..
                },
                Shape::Box {
                    half_extent: he_b, ..
                },
            ) => SATAlgorithm::boxes(pose_a, he_a, pose_b, he_b, max_separation),
        }
    }

    /// Sweeps `shape_a` along `displacement` towards a stationary `shape_b`.
    ///
    /// Returns the fraction of the displacement that can be travelled before the
    /// gap closes to `tolerance`, and the contact normal (A→B) at that time.
    /// Pairs that already touch at the start are left to the contact solver.
    pub fn time_of_impact(
        shape_a: &Shape,
        pose_a: &Pose,
        displacement: Vec3,
        shape_b: &Shape,
        pose_b: &Pose,
        tolerance: f32,
    ) -> Option<(f32, Vec3)> {
        const MAX_ITERATIONS: usize = 32;

        let mut fraction = 0.0f32;
        for iteration in 0..MAX_ITERATIONS {
            let pose = pose_a.translated(displacement * fraction);
            let (normal, points) =
                Self::collide_shapes(shape_a, &pose, shape_b, pose_b, f32::INFINITY)?;
            let separation = -points
                .iter()
                .map(|p| p.depth)
                .fold(f32::NEG_INFINITY, f32::max);

            if separation <= tolerance {
                return (iteration > 0).then_some((fraction, normal));
            }

            let closing_speed = displacement.dot(normal);
            if closing_speed <= EPSILON {
                return None;
            }
            fraction += (separation - tolerance * 0.5) / closing_speed;
            if fraction >= 1.0 {
                return None;
            }
        }
        let pose = pose_a.translated(displacement * fraction);
        let (normal, _) = Self::collide_shapes(shape_a, &pose, shape_b, pose_b, f32::INFINITY)?;
        Some((fraction, normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::ArenaId;
    use approx::assert_relative_eq;

    fn ids() -> (BodyId, BodyId) {
        (BodyId::from_parts(0, 0), BodyId::from_parts(1, 0))
    }

    fn at(position: Vec3) -> Pose {
        Pose::new(position, Quat::IDENTITY)
    }

    fn collide(a: Shape, pa: Pose, b: Shape, pb: Pose) -> Option<ContactManifold> {
        let (ia, ib) = ids();
        NarrowPhase::collide(ia, &a, &pa, ib, &b, &pb, 0.0)
    }

    #[test]
    fn overlapping_spheres_report_depth_and_normal() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let manifold = collide(sphere, at(Vec3::ZERO), sphere, at(Vec3::new(1.5, 0.0, 0.0)))
            .expect("overlapping spheres should collide");

        assert_relative_eq!(manifold.normal, Vec3::X);
        assert_relative_eq!(manifold.points[0].depth, 0.5, epsilon = 1e-5);
        assert_relative_eq!(manifold.points[0].position.x, 0.75, epsilon = 1e-5);
    }

    #[test]
    fn separated_spheres_only_collide_within_margin() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let (ia, ib) = ids();
        let pb = at(Vec3::new(2.1, 0.0, 0.0));
        assert!(collide(sphere, at(Vec3::ZERO), sphere, pb).is_none());
        let speculative =
            NarrowPhase::collide(ia, &sphere, &at(Vec3::ZERO), ib, &sphere, &pb, 0.2).unwrap();
        assert_relative_eq!(speculative.points[0].depth, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn sphere_resting_on_box_points_up() {
        let floor = Shape::Box {
            half_extent: Vec3::new(10.0, 1.0, 10.0),
            convex_radius: 0.05,
        };
        let ball = Shape::Sphere { radius: 0.5 };
        let manifold = collide(floor, at(Vec3::new(0.0, -1.0, 0.0)), ball, at(Vec3::new(0.0, 0.4, 0.0)))
            .expect("ball sinks into floor");
        assert_relative_eq!(manifold.normal, Vec3::Y, epsilon = 1e-5);
        assert_relative_eq!(manifold.points[0].depth, 0.1, epsilon = 1e-4);

        let flipped = collide(ball, at(Vec3::new(0.0, 0.4, 0.0)), floor, at(Vec3::new(0.0, -1.0, 0.0)))
            .unwrap();
        assert_relative_eq!(flipped.normal, -Vec3::Y, epsilon = 1e-5);
    }

    #[test]
    fn sphere_center_inside_box_pushes_out_nearest_face() {
        let cube = Shape::Box {
            half_extent: Vec3::splat(1.0),
            convex_radius: 0.0,
        };
        let ball = Shape::Sphere { radius: 0.25 };
        let manifold = collide(cube, at(Vec3::ZERO), ball, at(Vec3::new(0.0, 0.0, 0.9))).unwrap();
        assert_relative_eq!(manifold.normal, Vec3::Z, epsilon = 1e-5);
        assert_relative_eq!(manifold.points[0].depth, 0.35, epsilon = 1e-4);
    }

    #[test]
    fn box_stack_produces_four_points() {
        let cube = Shape::Box {
            half_extent: Vec3::splat(0.5),
            convex_radius: 0.05,
        };
        let manifold = collide(cube, at(Vec3::ZERO), cube, at(Vec3::new(0.0, 0.95, 0.0))).unwrap();
        assert_relative_eq!(manifold.normal, Vec3::Y, epsilon = 1e-5);
        assert_eq!(manifold.points.len(), 4);
        for point in &manifold.points {
            assert_relative_eq!(point.depth, 0.05, epsilon = 1e-4);
        }
    }

    #[test]
    fn rotated_boxes_overlap_along_x() {
        let cube = Shape::Box {
            half_extent: Vec3::ONE,
            convex_radius: 0.0,
        };
        let turned = Pose::new(Vec3::ZERO, Quat::from_rotation_z(45f32.to_radians()));
        let manifold = collide(cube, turned, cube, at(Vec3::new(2.1, 0.0, 0.0)))
            .expect("rotated boxes should collide");
        assert!(manifold.max_depth() > 0.0);
        assert!(manifold.normal.x > 0.7);
    }

    #[test]
    fn capsule_lying_on_box_gets_two_points() {
        let floor = Shape::Box {
            half_extent: Vec3::new(5.0, 0.5, 5.0),
            convex_radius: 0.0,
        };
        let capsule = Shape::Capsule {
            half_height: 1.0,
            radius: 0.25,
        };
        let lying = Pose::new(Vec3::new(0.0, 0.7, 0.0), Quat::from_rotation_z(90f32.to_radians()));
        let manifold = collide(floor, at(Vec3::ZERO), capsule, lying).unwrap();
        assert_relative_eq!(manifold.normal, Vec3::Y, epsilon = 1e-4);
        assert!(manifold.points.len() >= 2);
        assert!(manifold.points.iter().all(|p| (p.depth - 0.05).abs() < 1e-3));
    }

    #[test]
    fn crossed_capsules_touch_at_closest_points() {
        let capsule = Shape::Capsule {
            half_height: 1.0,
            radius: 0.5,
        };
        let crossed = Pose::new(Vec3::new(0.0, 0.0, 0.9), Quat::from_rotation_z(90f32.to_radians()));
        let manifold = collide(capsule, at(Vec3::ZERO), capsule, crossed).unwrap();
        assert_relative_eq!(manifold.normal, Vec3::Z, epsilon = 1e-4);
        assert_relative_eq!(manifold.points[0].depth, 0.1, epsilon = 1e-4);
    }

    #[test]
    fn time_of_impact_stops_before_floor() {
        let floor = Shape::Box {
            half_extent: Vec3::new(10.0, 1.0, 10.0),
            convex_radius: 0.0,
        };
        let ball = Shape::Sphere { radius: 0.5 };
        let (fraction, normal) = NarrowPhase::time_of_impact(
            &ball,
            &at(Vec3::new(0.0, 2.5, 0.0)),
            Vec3::new(0.0, -4.0, 0.0),
            &floor,
            &at(Vec3::new(0.0, -1.0, 0.0)),
            0.01,
        )
        .expect("ball crosses the floor");
        assert!(fraction > 0.49 && fraction <= 0.5, "fraction {fraction}");
        assert_relative_eq!(normal, -Vec3::Y, epsilon = 1e-5);

        assert!(NarrowPhase::time_of_impact(
            &ball,
            &at(Vec3::new(0.0, 2.5, 0.0)),
            Vec3::new(0.0, 4.0, 0.0),
            &floor,
            &at(Vec3::new(0.0, -1.0, 0.0)),
            0.01,
        )
        .is_none());
    }
}
