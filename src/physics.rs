use glam::Vec2;
use rapier2d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, Point, Real, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, Vector,
};
use tracing::warn;

pub const GROUND_CENTER: Vec2 = Vec2::new(2.0, 3.0);
pub const GROUND_HALF: Vec2 = Vec2::new(2.0, 0.5);
pub const LEFT_WALL_CENTER: Vec2 = Vec2::new(0.0, 1.5);
pub const RIGHT_WALL_CENTER: Vec2 = Vec2::new(4.0, 1.5);
pub const WALL_HALF: Vec2 = Vec2::new(0.1, 1.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticKind {
    Ground,
    Wall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticBox {
    pub kind: StaticKind,
    pub center: Vec2,
    pub half: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    Circle { radius: f32 },
    /// Counter-clockwise local-space vertices of a convex polygon.
    ConvexPolygon { points: Vec<Vec2> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// rapier has no per-shape rolling resistance; applied as angular damping.
    pub rolling_resistance: f32,
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    substeps: u32,
    statics: Vec<StaticBox>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, substeps: u32) -> Self {
        let mut world = Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector::new(gravity.x, gravity.y),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            substeps: substeps.max(1),
            statics: Vec::new(),
        };
        world.insert_static_box(StaticKind::Ground, GROUND_CENTER, GROUND_HALF);
        world.insert_static_box(StaticKind::Wall, LEFT_WALL_CENTER, WALL_HALF);
        world.insert_static_box(StaticKind::Wall, RIGHT_WALL_CENTER, WALL_HALF);
        world
    }

    fn insert_static_box(&mut self, kind: StaticKind, center: Vec2, half: Vec2) {
        let body = RigidBodyBuilder::fixed().translation(Vector::new(center.x, center.y)).build();
        let body_handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half.x, half.y).friction(0.6).build();
        self.colliders.insert_with_parent(collider, body_handle, &mut self.bodies);
        self.statics.push(StaticBox { kind, center, half });
    }

    pub fn statics(&self) -> &[StaticBox] {
        &self.statics
    }

    pub fn spawn_dynamic_body(&mut self, position: Vec2, shape: &BodyShape, material: BodyMaterial) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y))
            .angular_damping(material.rolling_resistance)
            .build();
        let body_handle = self.bodies.insert(body);
        let builder = match shape {
            BodyShape::Circle { radius } => ColliderBuilder::ball(*radius),
            BodyShape::ConvexPolygon { points } => {
                let hull: Vec<Point<Real>> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
                match ColliderBuilder::convex_hull(&hull) {
                    Some(builder) => builder,
                    None => {
                        let radius = points.iter().map(|p| p.length()).fold(0.0_f32, f32::max).max(0.01);
                        warn!(target: "physics", "degenerate polygon shape; using circle of radius {radius}");
                        ColliderBuilder::ball(radius)
                    }
                }
            }
        };
        let collider = builder
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .build();
        self.colliders.insert_with_parent(collider, body_handle, &mut self.bodies);
        if let Some(body) = self.bodies.get_mut(body_handle) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
            body.wake_up(true);
        }
        body_handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Advances the world by `dt`, split into the configured number of sub-steps.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt / self.substeps as f32;
        let hooks = ();
        let events = ();
        for _ in 0..self.substeps {
            self.pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &hooks,
                &events,
            );
        }
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|body| body.rotation().angle())
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|body| {
            let v = body.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    /// Moves the body without touching its rotation.
    pub fn set_translation(&mut self, handle: RigidBodyHandle, position: Vec2) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_translation(Vector::new(position.x, position.y), true);
                true
            }
            None => false,
        }
    }

    /// Applies a linear impulse at the center of mass and wakes the body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec2) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.apply_impulse(Vector::new(impulse.x, impulse.y), true);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn dynamic_body_count(&self) -> usize {
        self.bodies.iter().filter(|(_, body)| body.is_dynamic()).count()
    }
}
