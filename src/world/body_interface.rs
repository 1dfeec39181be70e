use glam::{Quat, Vec3};
use log::debug;

use super::PhysicsSystem;
use crate::{
    core::{
        body::{Body, BodyCreationSettings},
        shape::ShapeHandle,
        types::{Activation, AllowedDofs, BodyId, BroadPhaseLayer, MotionQuality, MotionType, ObjectLayer},
    },
    dynamics::sleeping::SleepManager,
    error::{PhysicsError, Result},
};

/// Body creation, removal and editing for one [`PhysicsSystem`].
///
/// Operations on ids that do not resolve to a live body fail with
/// [`PhysicsError::UnknownBody`].
pub struct BodyInterface<'a> {
    system: &'a mut PhysicsSystem,
}

impl<'a> BodyInterface<'a> {
    pub(super) fn new(system: &'a mut PhysicsSystem) -> Self {
        Self { system }
    }

    fn broad_phase_layer(&self, layer: ObjectLayer) -> Result<BroadPhaseLayer> {
        let layers = &self.system.filters.broad_phase_layers;
        if layer.0 >= layers.num_object_layers() {
            return Err(PhysicsError::InvalidObjectLayer(layer));
        }
        layers
            .broad_phase_layer(layer)
            .ok_or(PhysicsError::UnmappedObjectLayer(layer))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        self.system.bodies.get_mut(id)
    }

    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.system.bodies.get(id)
    }

    /// Allocates a body without adding it to the simulation.
    pub fn create_body(&mut self, settings: &BodyCreationSettings) -> Result<BodyId> {
        self.broad_phase_layer(settings.object_layer)?;
        let density = self.system.settings.tuning.default_density;
        let shapes = self.system.shapes.clone();
        self.system.bodies.create(settings, &shapes, density)
    }

    pub fn create_and_add_body(
        &mut self,
        settings: &BodyCreationSettings,
        activation: Activation,
    ) -> Result<BodyId> {
        let id = self.create_body(settings)?;
        self.add_body(id, activation)?;
        Ok(id)
    }

    /// Inserts a created or previously removed body; already added bodies are left alone.
    pub fn add_body(&mut self, id: BodyId, activation: Activation) -> Result<()> {
        let body = self.system.bodies.get(id)?;
        if body.is_added() {
            return Ok(());
        }
        let layer = self.broad_phase_layer(body.object_layer)?;
        let bounds = body.world_bounds();
        self.system.collision.broadphase.insert(id, layer, bounds);

        let body = self.body_mut(id)?;
        body.is_added = true;
        if activation == Activation::Activate && !body.is_static() {
            SleepManager::wake(body);
        }
        debug!("added body {id} to {layer}");
        Ok(())
    }

    /// Takes a body out of the simulation; its record stays valid.
    pub fn remove_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.body_mut(id)?;
        if !body.is_added() {
            return Ok(());
        }
        body.is_added = false;
        body.is_active = false;
        body.sleep_timer = 0.0;
        self.system.collision.broadphase.remove(id);
        self.system.collision.manifold_cache.forget(id);
        debug!("removed body {id}");
        Ok(())
    }

    pub fn destroy_body(&mut self, id: BodyId) -> Result<()> {
        let shapes = self.system.shapes.clone();
        self.system.bodies.destroy(id, &shapes)?;
        self.system.collision.manifold_cache.forget(id);
        Ok(())
    }

    pub fn remove_and_destroy_body(&mut self, id: BodyId) -> Result<()> {
        self.remove_body(id)?;
        self.destroy_body(id)
    }

    pub fn is_added(&self, id: BodyId) -> bool {
        self.body(id).map(Body::is_added).unwrap_or(false)
    }

    pub fn is_active(&self, id: BodyId) -> bool {
        self.body(id).map(Body::is_active).unwrap_or(false)
    }

    pub fn activate_body(&mut self, id: BodyId) -> Result<()> {
        SleepManager::wake(self.body_mut(id)?);
        Ok(())
    }

    /// Puts a body to sleep immediately, clearing its velocities.
    pub fn deactivate_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.body_mut(id)?;
        if body.is_active() {
            body.is_active = false;
            body.reset_motion();
        }
        Ok(())
    }

    fn activate_if_requested(&mut self, id: BodyId, activation: Activation) -> Result<&mut Body> {
        let body = self.body_mut(id)?;
        if activation == Activation::Activate {
            SleepManager::wake(body);
        }
        Ok(body)
    }

    fn refresh_bounds(&mut self, id: BodyId) -> Result<()> {
        let body = self.system.bodies.get(id)?;
        if body.is_added() {
            let bounds = body.world_bounds();
            self.system.collision.broadphase.update(id, bounds);
        }
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<()> {
        let body = self.body_mut(id)?;
        if body.is_static() {
            return Ok(());
        }
        body.linear_velocity = velocity * body.allowed_dofs.translation_mask();
        if body.linear_velocity != Vec3::ZERO {
            SleepManager::wake(body);
        }
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<()> {
        let body = self.body_mut(id)?;
        if body.is_static() {
            return Ok(());
        }
        body.angular_velocity = velocity * body.allowed_dofs.rotation_mask();
        if body.angular_velocity != Vec3::ZERO {
            SleepManager::wake(body);
        }
        Ok(())
    }

    pub fn set_position(&mut self, id: BodyId, position: Vec3, activation: Activation) -> Result<()> {
        self.activate_if_requested(id, activation)?.position = position;
        self.refresh_bounds(id)
    }

    pub fn set_rotation(&mut self, id: BodyId, rotation: Quat, activation: Activation) -> Result<()> {
        self.activate_if_requested(id, activation)?.rotation = rotation.normalize();
        self.refresh_bounds(id)
    }

    pub fn set_position_and_rotation(
        &mut self,
        id: BodyId,
        position: Vec3,
        rotation: Quat,
        activation: Activation,
    ) -> Result<()> {
        let body = self.activate_if_requested(id, activation)?;
        body.position = position;
        body.rotation = rotation.normalize();
        self.refresh_bounds(id)
    }

    pub fn set_friction(&mut self, id: BodyId, friction: f32) -> Result<()> {
        self.body_mut(id)?.friction = friction;
        Ok(())
    }

    pub fn set_restitution(&mut self, id: BodyId, restitution: f32) -> Result<()> {
        self.body_mut(id)?.restitution = restitution;
        Ok(())
    }

    pub fn set_gravity_factor(&mut self, id: BodyId, gravity_factor: f32) -> Result<()> {
        self.body_mut(id)?.gravity_factor = gravity_factor;
        Ok(())
    }

    pub fn set_allowed_dofs(&mut self, id: BodyId, dofs: AllowedDofs) -> Result<()> {
        let body = self.body_mut(id)?;
        body.allowed_dofs = dofs;
        body.linear_velocity *= dofs.translation_mask();
        body.angular_velocity *= dofs.rotation_mask();
        Ok(())
    }

    /// Changes how a body moves. A body turned static stops and falls asleep.
    pub fn set_motion_type(&mut self, id: BodyId, motion_type: MotionType, activation: Activation) -> Result<()> {
        let body = self.body_mut(id)?;
        if body.motion_type == motion_type {
            if activation == Activation::Activate {
                SleepManager::wake(body);
            }
            return Ok(());
        }
        body.motion_type = motion_type;
        if motion_type == MotionType::Static {
            body.is_active = false;
            body.reset_motion();
        } else if activation == Activation::Activate {
            SleepManager::wake(body);
        }
        debug!("body {id} is now {motion_type:?}");
        Ok(())
    }

    pub fn set_motion_quality(&mut self, id: BodyId, quality: MotionQuality) -> Result<()> {
        self.body_mut(id)?.motion_quality = quality;
        Ok(())
    }

    /// Accumulates a force applied over the next update; wakes the body.
    pub fn add_force(&mut self, id: BodyId, force: Vec3) -> Result<()> {
        let body = self.body_mut(id)?;
        if !body.is_dynamic() {
            return Ok(());
        }
        body.force += force;
        SleepManager::wake(body);
        Ok(())
    }

    /// Changes the velocity immediately by `impulse / mass`; wakes the body.
    pub fn add_impulse(&mut self, id: BodyId, impulse: Vec3) -> Result<()> {
        let body = self.body_mut(id)?;
        if !body.is_dynamic() {
            return Ok(());
        }
        body.apply_linear_impulse(impulse);
        SleepManager::wake(body);
        Ok(())
    }

    pub fn position(&self, id: BodyId) -> Result<Vec3> {
        Ok(self.body(id)?.position)
    }

    pub fn rotation(&self, id: BodyId) -> Result<Quat> {
        Ok(self.body(id)?.rotation)
    }

    /// All shapes are centered on the body origin.
    pub fn center_of_mass_position(&self, id: BodyId) -> Result<Vec3> {
        self.position(id)
    }

    pub fn linear_velocity(&self, id: BodyId) -> Result<Vec3> {
        Ok(self.body(id)?.linear_velocity)
    }

    pub fn angular_velocity(&self, id: BodyId) -> Result<Vec3> {
        Ok(self.body(id)?.angular_velocity)
    }

    pub fn friction(&self, id: BodyId) -> Result<f32> {
        Ok(self.body(id)?.friction)
    }

    pub fn restitution(&self, id: BodyId) -> Result<f32> {
        Ok(self.body(id)?.restitution)
    }

    pub fn gravity_factor(&self, id: BodyId) -> Result<f32> {
        Ok(self.body(id)?.gravity_factor)
    }

    pub fn motion_type(&self, id: BodyId) -> Result<MotionType> {
        Ok(self.body(id)?.motion_type)
    }

    pub fn motion_quality(&self, id: BodyId) -> Result<MotionQuality> {
        Ok(self.body(id)?.motion_quality)
    }

    pub fn object_layer(&self, id: BodyId) -> Result<ObjectLayer> {
        Ok(self.body(id)?.object_layer)
    }

    pub fn allowed_dofs(&self, id: BodyId) -> Result<AllowedDofs> {
        Ok(self.body(id)?.allowed_dofs)
    }

    pub fn shape(&self, id: BodyId) -> Result<ShapeHandle> {
        Ok(self.body(id)?.shape_handle)
    }

    pub fn mass(&self, id: BodyId) -> Result<f32> {
        Ok(self.body(id)?.mass)
    }
}
