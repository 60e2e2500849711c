//! rapier2d implementation of the physics bridge

use glam::Vec2;
use rapier2d::crossbeam::channel::{Receiver, unbounded};
use rapier2d::prelude::*;

use super::{BodyDesc, BodyHandle, BodyKind, BodyState, ContactEvent, ContactKind, PhysicsEngine};
use crate::config::PhysicsConfig;

/// Fixed step the time scale is applied to
const BASE_DT: f32 = 1.0 / 60.0;

fn to_rapier(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.0 as u32, (handle.0 >> 32) as u32)
}

fn from_rapier(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle(((generation as u64) << 32) | index as u64)
}

/// Manages the rapier2d physics world
pub struct RapierPhysics {
    /// Rapier rigid body set
    rigid_body_set: RigidBodySet,

    /// Rapier collider set
    collider_set: ColliderSet,

    /// Physics pipeline
    pipeline: PhysicsPipeline,

    /// Integration parameters
    integration_parameters: IntegrationParameters,

    /// Island manager
    island_manager: IslandManager,

    /// Broad phase
    broad_phase: BroadPhase,

    /// Narrow phase
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver
    ccd_solver: CCDSolver,

    /// Query pipeline
    query_pipeline: QueryPipeline,

    /// Collects collision start/stop events during a step
    event_collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,

    gravity: Vector<Real>,
    friction: f32,
    density: f32,
}

impl RapierPhysics {
    pub fn new(config: &PhysicsConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: BASE_DT * config.time_scale,
            ..Default::default()
        };

        let (collision_send, collision_events) = unbounded();
        // Contact force events are never enabled on our colliders
        let (contact_force_send, _) = unbounded();

        log::debug!(
            "Physics: gravity={} time_scale={} dt={:.4}",
            config.gravity,
            config.time_scale,
            integration_parameters.dt
        );

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_events,
            // Grid y grows downward, so gravity is positive y
            gravity: vector![0.0, config.gravity],
            friction: config.friction,
            density: config.density,
        }
    }

    /// Build the collider for one closed polygon
    fn create_collider(&self, kind: BodyKind, polygon: &[Vec2]) -> Option<Collider> {
        if polygon.len() < 3 {
            return None;
        }

        let points: Vec<Point<Real>> = polygon.iter().map(|v| point![v.x, v.y]).collect();
        let count = points.len() as u32;
        let indices: Vec<[u32; 2]> = (0..count).map(|i| [i, (i + 1) % count]).collect();

        let builder = match kind {
            // Static terrain only needs its outline
            BodyKind::Fixed => ColliderBuilder::polyline(points, Some(indices)),
            // Dynamic bodies need area for mass properties
            BodyKind::Dynamic => ColliderBuilder::convex_decomposition(&points, &indices),
        };

        Some(
            builder
                .density(self.density)
                .friction(self.friction)
                .restitution(0.1)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
        )
    }

    fn body_of_collider(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.collider_set
            .get(collider)
            .and_then(|c| c.parent())
            .map(from_rapier)
    }
}

impl PhysicsEngine for RapierPhysics {
    fn register_body(&mut self, desc: &BodyDesc<'_>) -> Option<BodyHandle> {
        let builder = match desc.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let rigid_body = builder
            .translation(vector![desc.position.x, desc.position.y])
            .build();
        let body_handle = self.rigid_body_set.insert(rigid_body);

        let mut collider_count = 0;
        for polygon in desc.polygons {
            if let Some(collider) = self.create_collider(desc.kind, polygon) {
                self.collider_set
                    .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
                collider_count += 1;
            }
        }

        if collider_count == 0 {
            self.unregister_body(from_rapier(body_handle));
            return None;
        }

        log::trace!(
            "Physics: registered {:?} body {:?} with {} colliders at ({:.1}, {:.1})",
            desc.kind,
            body_handle,
            collider_count,
            desc.position.x,
            desc.position.y
        );

        Some(from_rapier(body_handle))
    }

    fn unregister_body(&mut self, handle: BodyHandle) {
        self.rigid_body_set.remove(
            to_rapier(handle),
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        let body = self.rigid_body_set.get(to_rapier(handle))?;
        let translation = body.translation();
        let linvel = body.linvel();
        Some(BodyState {
            position: Vec2::new(translation.x, translation.y),
            rotation: body.rotation().angle(),
            linvel: Vec2::new(linvel.x, linvel.y),
            angvel: body.angvel(),
        })
    }

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(to_rapier(handle)) {
            body.set_translation(vector![position.x, position.y], true);
        }
    }

    /// Update physics simulation
    fn step(&mut self) {
        let physics_hooks = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &self.event_collector,
        );
    }

    fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.collision_events.try_recv() {
            let (kind, c1, c2) = match event {
                CollisionEvent::Started(c1, c2, _) => (ContactKind::Started, c1, c2),
                CollisionEvent::Stopped(c1, c2, _) => (ContactKind::Stopped, c1, c2),
            };
            // Colliders removed since the step no longer resolve to a body
            if let (Some(a), Some(b)) = (self.body_of_collider(c1), self.body_of_collider(c2)) {
                events.push(ContactEvent { kind, a, b });
            }
        }
        events
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}
