use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{
    collision::{
        broadphase::BroadPhase,
        contact::{ContactManifold, ManifoldCache},
        layers::{BroadPhaseLayerInterface, ObjectLayerPairFilter, ObjectVsBroadPhaseLayerFilter},
        narrowphase::{NarrowPhase, Pose},
    },
    config::SimulationTuning,
    core::{
        body::Body,
        types::{BodyId, MotionQuality},
    },
    dynamics::{job_system::JobSystem, sleeping::SleepManager},
    utils::allocator::{Arena, ArenaId},
};

/// The three layer filters a system was configured with.
#[derive(Clone)]
pub(crate) struct CollisionFilters {
    pub broad_phase_layers: Arc<dyn BroadPhaseLayerInterface>,
    pub object_vs_broad_phase: Arc<dyn ObjectVsBroadPhaseLayerFilter>,
    pub object_pairs: Arc<dyn ObjectLayerPairFilter>,
}

/// Result of sweeping a linear-cast body through one collision step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SweepHit {
    pub body: BodyId,
    pub fraction: f32,
    pub normal: Vec3,
    pub restitution: f32,
}

/// Broad-phase, manifold cache and the wake-up queues filled by narrow-phase jobs.
pub(crate) struct CollisionManager {
    pub broadphase: BroadPhase,
    pub manifold_cache: ManifoldCache,
    wake_queues: Vec<Mutex<Vec<BodyId>>>,
}

impl CollisionManager {
    pub fn new(
        num_broad_phase_layers: u32,
        margin: f32,
        manifold_capacity: usize,
        num_body_mutexes: u32,
    ) -> Self {
        Self {
            broadphase: BroadPhase::new(num_broad_phase_layers, margin),
            manifold_cache: ManifoldCache::new(manifold_capacity),
            wake_queues: (0..num_body_mutexes.max(1))
                .map(|_| Mutex::new(Vec::new()))
                .collect(),
        }
    }

    /// Candidate pairs for the active bodies, sorted and deduplicated.
    pub fn find_body_pairs(
        &self,
        bodies: &Arena<Body, BodyId>,
        active: &[BodyId],
        filters: &CollisionFilters,
        dt: f32,
        tuning: &SimulationTuning,
        jobs: &JobSystem,
    ) -> Vec<(BodyId, BodyId)> {
        let min_len = jobs.min_chunk(active.len());
        jobs.install(|| {
            let mut pairs: Vec<(BodyId, BodyId)> = active
                .par_iter()
                .with_min_len(min_len)
                .flat_map_iter(|&id| self.pairs_for(bodies, id, filters, dt, tuning))
                .collect();
            pairs.par_sort_unstable();
            pairs.dedup();
            pairs
        })
    }

    fn pairs_for(
        &self,
        bodies: &Arena<Body, BodyId>,
        id: BodyId,
        filters: &CollisionFilters,
        dt: f32,
        tuning: &SimulationTuning,
    ) -> Vec<(BodyId, BodyId)> {
        let Some(body) = bodies.get(id) else {
            return Vec::new();
        };
        if body.is_static() || !body.is_added() {
            return Vec::new();
        }

        let query = body
            .world_bounds()
            .swept(body.linear_velocity * dt)
            .expanded(tuning.speculative_contact_distance);
        let layer = body.object_layer;
        let candidates = self.broadphase.query_overlaps(&query, |bp_layer| {
            filters.object_vs_broad_phase.should_collide(layer, bp_layer)
        });

        candidates
            .into_iter()
            .filter(|&other_id| other_id != id)
            .filter_map(|other_id| {
                let other = bodies.get(other_id)?;
                if !body.is_dynamic() && !other.is_dynamic() {
                    return None;
                }
                if !filters.object_pairs.should_collide(layer, other.object_layer) {
                    return None;
                }
                Some(if id < other_id { (id, other_id) } else { (other_id, id) })
            })
            .collect()
    }

    /// Runs the narrow phase on every pair, queueing wake-ups for sleeping bodies
    /// hit by moving ones. Output order follows `pairs`.
    pub fn generate_manifolds(
        &self,
        bodies: &Arena<Body, BodyId>,
        pairs: &[(BodyId, BodyId)],
        sleep: &SleepManager,
        tuning: &SimulationTuning,
        jobs: &JobSystem,
    ) -> Vec<ContactManifold> {
        let min_len = jobs.min_chunk(pairs.len());
        jobs.install(|| {
            pairs
                .par_iter()
                .with_min_len(min_len)
                .filter_map(|&(id_a, id_b)| {
                    let a = bodies.get(id_a)?;
                    let b = bodies.get(id_b)?;
                    let manifold = NarrowPhase::collide(
                        id_a,
                        &a.shape,
                        &Pose::new(a.position, a.rotation),
                        id_b,
                        &b.shape,
                        &Pose::new(b.position, b.rotation),
                        tuning.speculative_contact_distance,
                    )?;
                    self.queue_wake_up(a, b, sleep);
                    self.queue_wake_up(b, a, sleep);
                    Some(manifold)
                })
                .collect()
        })
    }

    fn queue_wake_up(&self, sleeper: &Body, other: &Body, sleep: &SleepManager) {
        if sleeper.is_active() || !sleeper.is_dynamic() || !other.is_active() {
            return;
        }
        if sleep.is_resting(other) {
            return;
        }
        let stripe = ArenaId::index(&sleeper.id) % self.wake_queues.len();
        self.wake_queues[stripe].lock().push(sleeper.id);
    }

    /// Empties the wake-up queues into a sorted, deduplicated list.
    pub fn drain_wake_requests(&self) -> Vec<BodyId> {
        let mut woken: Vec<BodyId> = self
            .wake_queues
            .iter()
            .flat_map(|queue| std::mem::take(&mut *queue.lock()))
            .collect();
        woken.sort_unstable();
        woken.dedup();
        woken
    }

    /// Sweeps fast linear-cast bodies against everything they may hit this step.
    pub fn sweep_linear_cast_bodies(
        &self,
        bodies: &Arena<Body, BodyId>,
        active: &[BodyId],
        filters: &CollisionFilters,
        dt: f32,
        tuning: &SimulationTuning,
        jobs: &JobSystem,
    ) -> Vec<SweepHit> {
        jobs.install(|| {
            active
                .par_iter()
                .filter_map(|&id| self.sweep(bodies, id, filters, dt, tuning))
                .collect()
        })
    }

    fn sweep(
        &self,
        bodies: &Arena<Body, BodyId>,
        id: BodyId,
        filters: &CollisionFilters,
        dt: f32,
        tuning: &SimulationTuning,
    ) -> Option<SweepHit> {
        let body = bodies.get(id)?;
        if !body.is_dynamic() || body.motion_quality != MotionQuality::LinearCast {
            return None;
        }
        let displacement = body.linear_velocity * dt;
        if displacement.length() <= tuning.linear_cast_threshold * body.shape.inner_radius() {
            return None;
        }

        let layer = body.object_layer;
        let query = body.world_bounds().swept(displacement);
        let pose = Pose::new(body.position, body.rotation);
        let mut best: Option<SweepHit> = None;

        for other_id in self.broadphase.query_overlaps(&query, |bp_layer| {
            filters.object_vs_broad_phase.should_collide(layer, bp_layer)
        }) {
            if other_id == id {
                continue;
            }
            let Some(other) = bodies.get(other_id) else {
                continue;
            };
            if !filters.object_pairs.should_collide(layer, other.object_layer) {
                continue;
            }
            let Some((fraction, normal)) = NarrowPhase::time_of_impact(
                &body.shape,
                &pose,
                displacement,
                &other.shape,
                &Pose::new(other.position, other.rotation),
                tuning.penetration_slop,
            ) else {
                continue;
            };
            if best.map_or(true, |hit| fraction < hit.fraction) {
                best = Some(SweepHit {
                    body: id,
                    fraction,
                    normal,
                    restitution: body.restitution.max(other.restitution),
                });
            }
        }
        best
    }

    /// Refreshes broad-phase bounds of every active body that can move.
    pub fn refresh_bounds(&mut self, bodies: &Arena<Body, BodyId>) {
        for (id, body) in bodies.iter() {
            if body.is_active() && !body.is_static() {
                self.broadphase.update(id, body.world_bounds());
            }
        }
    }
}
