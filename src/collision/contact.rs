use std::collections::HashMap;

use glam::Vec3;

use crate::core::types::BodyId;

/// Maximum number of points kept per manifold.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// Single contact point; positive depth is penetration, negative depth is a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: Vec3,
    pub depth: f32,
}

/// Contact points shared by a body pair, with a normal pointing from A to B.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vec3,
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub fn max_depth(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.depth)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Impulses remembered between steps for warm starting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachedImpulse {
    pub normal: f32,
    pub tangent: Vec3,
}

/// Persistent per-pair impulse cache with a fixed capacity.
#[derive(Debug, Default)]
pub struct ManifoldCache {
    entries: HashMap<(BodyId, BodyId), CachedImpulse>,
    capacity: usize,
}

impl ManifoldCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pair: (BodyId, BodyId)) -> Option<CachedImpulse> {
        self.entries.get(&pair).copied()
    }

    /// Replaces the cache contents. Returns `false` when some pairs did not fit.
    pub fn store<I>(&mut self, impulses: I) -> bool
    where
        I: IntoIterator<Item = ((BodyId, BodyId), CachedImpulse)>,
    {
        self.entries.clear();
        let mut complete = true;
        for (pair, impulse) in impulses {
            if self.entries.len() >= self.capacity {
                complete = false;
                break;
            }
            self.entries.insert(pair, impulse);
        }
        complete
    }

    /// Drops every entry that involves `body`.
    pub fn forget(&mut self, body: BodyId) {
        self.entries.retain(|(a, b), _| *a != body && *b != body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::ArenaId;

    #[test]
    fn cache_reports_overflow() {
        let a = BodyId::from_parts(0, 0);
        let b = BodyId::from_parts(1, 0);
        let c = BodyId::from_parts(2, 0);
        let mut cache = ManifoldCache::new(1);
        let complete = cache.store([
            ((a, b), CachedImpulse::default()),
            ((a, c), CachedImpulse::default()),
        ]);
        assert!(!complete);
        assert_eq!(cache.len(), 1);

        cache.forget(a);
        assert!(cache.is_empty());
    }
}
