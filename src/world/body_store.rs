use log::debug;

use crate::{
    core::{
        body::{Body, BodyCreationSettings},
        shape::ShapeRegistry,
        types::BodyId,
    },
    error::{PhysicsError, Result},
    utils::allocator::Arena,
};

/// Generation-checked storage for every body of a system, added or not.
pub struct BodyStore {
    bodies: Arena<Body, BodyId>,
    max_bodies: u32,
}

impl BodyStore {
    pub fn new(max_bodies: u32) -> Self {
        Self {
            bodies: Arena::new(),
            max_bodies,
        }
    }

    pub fn max_bodies(&self) -> u32 {
        self.max_bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn num_active(&self) -> usize {
        self.bodies.iter().filter(|(_, body)| body.is_active()).count()
    }

    /// Allocates a body and takes a reference on its shape.
    pub fn create(
        &mut self,
        settings: &BodyCreationSettings,
        shapes: &ShapeRegistry,
        default_density: f32,
    ) -> Result<BodyId> {
        if self.bodies.len() >= self.max_bodies as usize {
            return Err(PhysicsError::TooManyBodies(self.max_bodies));
        }
        let shape = shapes.acquire(settings.shape)?;
        match self
            .bodies
            .insert_with(|id| Body::new(id, settings, shape, default_density))
        {
            Some(id) => {
                debug!("created body {id} ({:?}, {:?})", settings.motion_type, settings.object_layer);
                Ok(id)
            }
            None => {
                shapes.release_reference(settings.shape);
                Err(PhysicsError::TooManyBodies(self.max_bodies))
            }
        }
    }

    /// Frees a body that is no longer added and drops its shape reference.
    pub fn destroy(&mut self, id: BodyId, shapes: &ShapeRegistry) -> Result<Body> {
        let body = self.get(id)?;
        if body.is_added() {
            return Err(PhysicsError::BodyStillAdded(id));
        }
        let body = self.bodies.remove(id).ok_or(PhysicsError::UnknownBody(id))?;
        shapes.release_reference(body.shape_handle);
        debug!("destroyed body {id}");
        Ok(body)
    }

    pub fn get(&self, id: BodyId) -> Result<&Body> {
        self.bodies.get(id).ok_or(PhysicsError::UnknownBody(id))
    }

    pub fn get_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        self.bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains(id)
    }

    pub fn arena(&self) -> &Arena<Body, BodyId> {
        &self.bodies
    }

    pub fn arena_mut(&mut self) -> &mut Arena<Body, BodyId> {
        &mut self.bodies
    }

    /// Ids of active bodies in slot order.
    pub fn active_ids(&self) -> Vec<BodyId> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn clear_forces(&mut self) {
        for body in self.bodies.iter_mut() {
            body.force = glam::Vec3::ZERO;
        }
    }

    /// Destroys every body, returning shape references to the registry.
    pub fn release_all(&mut self, shapes: &ShapeRegistry) {
        let drained = self.bodies.drain();
        for body in &drained {
            shapes.release_reference(body.shape_handle);
        }
        if !drained.is_empty() {
            debug!("released {} bodies", drained.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{MotionType, ObjectLayer};
    use glam::{Quat, Vec3};

    fn sphere_settings(shapes: &ShapeRegistry) -> BodyCreationSettings {
        let handle = shapes.create_sphere(0.5).unwrap();
        BodyCreationSettings::new(handle, Vec3::ZERO, Quat::IDENTITY, MotionType::Dynamic, ObjectLayer(0))
    }

    #[test]
    fn capacity_is_enforced() {
        let shapes = ShapeRegistry::new();
        let settings = sphere_settings(&shapes);
        let mut store = BodyStore::new(1);
        store.create(&settings, &shapes, 1000.0).unwrap();
        assert_eq!(
            store.create(&settings, &shapes, 1000.0),
            Err(PhysicsError::TooManyBodies(1))
        );
        assert_eq!(shapes.ref_count(settings.shape), Some(1));
    }

    #[test]
    fn destroy_returns_shape_reference_and_invalidates_id() {
        let shapes = ShapeRegistry::new();
        let settings = sphere_settings(&shapes);
        let mut store = BodyStore::new(8);
        let id = store.create(&settings, &shapes, 1000.0).unwrap();
        store.destroy(id, &shapes).unwrap();
        assert_eq!(shapes.ref_count(settings.shape), Some(0));
        assert!(matches!(store.get(id), Err(PhysicsError::UnknownBody(_))));

        let reused = store.create(&settings, &shapes, 1000.0).unwrap();
        assert_ne!(reused, id);
        assert!(store.get(id).is_err());
    }

    #[test]
    fn unknown_shape_is_rejected_without_allocation() {
        let shapes = ShapeRegistry::new();
        let settings = sphere_settings(&shapes);
        shapes.release(settings.shape).unwrap();
        let mut store = BodyStore::new(8);
        assert_eq!(
            store.create(&settings, &shapes, 1000.0),
            Err(PhysicsError::UnknownShape(settings.shape))
        );
        assert!(store.is_empty());
    }
}
