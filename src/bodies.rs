use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::Rng;
use rapier2d::prelude::RigidBodyHandle;
use tracing::debug;

use crate::physics::{BodyMaterial, BodyShape, PhysicsWorld};
use crate::render::Color;

pub const BALL_RADIUS: f32 = 0.1;
pub const OCTAGON_RADIUS: f32 = 0.12;
pub const TRAPEZOID_POINTS: [Vec2; 4] =
    [Vec2::new(0.1, -0.1), Vec2::new(0.15, 0.1), Vec2::new(-0.15, 0.1), Vec2::new(-0.1, -0.1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyKind {
    Ball,
    Octagon,
    Trapezoid,
}

impl BodyKind {
    pub const ALL: [BodyKind; 3] = [BodyKind::Ball, BodyKind::Octagon, BodyKind::Trapezoid];

    /// Lowercase name used in script-facing operation names (`create_ball`, ...).
    pub fn name(self) -> &'static str {
        match self {
            BodyKind::Ball => "ball",
            BodyKind::Octagon => "octagon",
            BodyKind::Trapezoid => "trapezoid",
        }
    }

    pub fn shape(self) -> BodyShape {
        match self {
            BodyKind::Ball => BodyShape::Circle { radius: BALL_RADIUS },
            BodyKind::Octagon => BodyShape::ConvexPolygon { points: octagon_points(OCTAGON_RADIUS) },
            BodyKind::Trapezoid => BodyShape::ConvexPolygon { points: TRAPEZOID_POINTS.to_vec() },
        }
    }

    pub fn material(self) -> BodyMaterial {
        match self {
            BodyKind::Ball => {
                BodyMaterial { density: 1.0, friction: 0.3, restitution: 0.4, rolling_resistance: 0.05 }
            }
            BodyKind::Octagon => {
                BodyMaterial { density: 1.0, friction: 0.4, restitution: 0.25, rolling_resistance: 0.1 }
            }
            BodyKind::Trapezoid => {
                BodyMaterial { density: 1.2, friction: 0.6, restitution: 0.1, rolling_resistance: 0.2 }
            }
        }
    }

    /// Spawn point above the ground; x is randomized, y is fixed per kind.
    pub fn spawn_position(self, rng: &mut impl Rng) -> Vec2 {
        let y = match self {
            BodyKind::Ball => 0.0,
            BodyKind::Octagon => -0.3,
            BodyKind::Trapezoid => -0.6,
        };
        Vec2::new(rng.gen_range(1.0..3.0), y)
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn octagon_points(radius: f32) -> Vec<Vec2> {
    (0..8)
        .map(|i| {
            let angle = std::f32::consts::FRAC_PI_4 * i as f32 + std::f32::consts::FRAC_PI_8;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Script-visible identifier of a live body within one kind's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisteredBody {
    pub body: RigidBodyHandle,
    pub color: Color,
}

/// Maps handles of one body kind to native bodies and their render color.
///
/// Lookups by an unknown handle never fail: reads yield zero vectors and
/// mutations do nothing. Only `destroy` reports a miss.
#[derive(Debug)]
pub struct BodyRegistry {
    kind: BodyKind,
    entries: BTreeMap<BodyHandle, RegisteredBody>,
    next: u32,
}

impl BodyRegistry {
    pub fn new(kind: BodyKind) -> Self {
        Self { kind, entries: BTreeMap::new(), next: 0 }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RegisteredBody)> {
        self.entries.iter().map(|(handle, entry)| (*handle, entry))
    }

    fn allocate_handle(&mut self) -> BodyHandle {
        // Terminates: a registry can never hold every u32 value.
        let mut candidate = self.next;
        while self.entries.contains_key(&BodyHandle(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        self.next = candidate.wrapping_add(1);
        BodyHandle(candidate)
    }

    pub fn create(&mut self, physics: &mut PhysicsWorld, rng: &mut impl Rng) -> BodyHandle {
        let handle = self.allocate_handle();
        let position = self.kind.spawn_position(rng);
        let body = physics.spawn_dynamic_body(position, &self.kind.shape(), self.kind.material());
        let color = Color::rgb(rng.gen_range(127..=255), rng.gen_range(127..=255), rng.gen_range(127..=255));
        self.entries.insert(handle, RegisteredBody { body, color });
        debug!(target: "physics", kind = %self.kind, %handle, "created body");
        handle
    }

    pub fn destroy(&mut self, physics: &mut PhysicsWorld, handle: BodyHandle) -> bool {
        match self.entries.remove(&handle) {
            Some(entry) => {
                physics.remove_body(entry.body);
                debug!(target: "physics", kind = %self.kind, %handle, "destroyed body");
                true
            }
            None => false,
        }
    }

    pub fn position(&self, physics: &PhysicsWorld, handle: BodyHandle) -> Vec2 {
        self.entries.get(&handle).and_then(|entry| physics.translation(entry.body)).unwrap_or(Vec2::ZERO)
    }

    pub fn velocity(&self, physics: &PhysicsWorld, handle: BodyHandle) -> Vec2 {
        self.entries.get(&handle).and_then(|entry| physics.linear_velocity(entry.body)).unwrap_or(Vec2::ZERO)
    }

    pub fn set_position(&self, physics: &mut PhysicsWorld, handle: BodyHandle, position: Vec2) {
        if let Some(entry) = self.entries.get(&handle) {
            physics.set_translation(entry.body, position);
        }
    }

    pub fn apply_impulse(&self, physics: &mut PhysicsWorld, handle: BodyHandle, impulse: Vec2) {
        if let Some(entry) = self.entries.get(&handle) {
            physics.apply_impulse(entry.body, impulse);
        }
    }

    pub fn set_color(&mut self, handle: BodyHandle, color: Color) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.color = color;
        }
    }

    pub fn color(&self, handle: BodyHandle) -> Option<Color> {
        self.entries.get(&handle).map(|entry| entry.color)
    }

    #[cfg(test)]
    fn set_next_handle(&mut self, next: u32) {
        self.next = next;
    }
}
