//! Rigid-body physics bridge
//!
//! The world only talks to physics through [`PhysicsEngine`], so the grid
//! code never depends on a particular engine. [`RapierPhysics`] is the
//! production implementation.

mod rapier;

pub use rapier::RapierPhysics;

use glam::Vec2;

/// Opaque handle of a registered body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Immovable terrain collision (chunk silhouettes)
    Fixed,
    /// Simulated body (detached free bodies)
    Dynamic,
}

/// Everything needed to register one body
#[derive(Clone, Debug)]
pub struct BodyDesc<'a> {
    pub kind: BodyKind,
    /// World position of the polygons' local origin
    pub position: Vec2,
    /// Closed polygons in local cell units, one collider each
    pub polygons: &'a [Vec<Vec2>],
}

/// Pose and motion of a body at the end of the last physics step
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    /// Radians
    pub rotation: f32,
    pub linvel: Vec2,
    pub angvel: f32,
}

impl BodyState {
    /// Map a point from body-local to world coordinates
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(local) + self.position
    }

    /// Linear and angular speed both at or below `threshold`
    pub fn is_still(&self, threshold: f32) -> bool {
        self.linvel.x.abs() <= threshold
            && self.linvel.y.abs() <= threshold
            && self.angvel.abs() <= threshold
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactKind {
    Started,
    Stopped,
}

/// Collision start/end between two registered bodies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub a: BodyHandle,
    pub b: BodyHandle,
}

/// Operations the world needs from a rigid-body engine
pub trait PhysicsEngine {
    /// Register a body built from closed polygons.
    /// Returns `None` when no usable collider could be built.
    fn register_body(&mut self, desc: &BodyDesc<'_>) -> Option<BodyHandle>;

    /// Remove a body and all of its colliders. Unknown handles are ignored.
    fn unregister_body(&mut self, handle: BodyHandle);

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState>;

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec2);

    /// Advance the simulation by one fixed step
    fn step(&mut self);

    /// Contact events produced since the last call
    fn drain_contact_events(&mut self) -> Vec<ContactEvent>;

    fn body_count(&self) -> usize;
}
