//! Script-facing operations on the bodies of a world scene.
//!
//! Every exposed function holds a [`WeakWorld`] back-reference to the state of
//! the scene that registered it. The scene keeps the only strong reference, so
//! a function retained by the script runtime after the scene was popped
//! reports [`BridgeError::Unavailable`] instead of touching freed state.

use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::{Rc, Weak};

use glam::Vec2;
use rhai::{Dynamic, EvalAltResult, Module, FLOAT, INT};
use thiserror::Error;

use crate::bodies::{BodyHandle, BodyKind};
use crate::render::Color;
use crate::scenes::world::WorldState;

/// Namespace scripts use to reach the world scene, e.g. `scene_2d::create_ball()`.
pub const NAMESPACE: &str = "scene_2d";
pub const WORLD_SCENE_NAME: &str = "2D World";

pub type WorldCapsule = Rc<RefCell<WorldState>>;
pub type WeakWorld = Weak<RefCell<WorldState>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("\"{name}\" is only available in {scene} Scene.")]
    Unavailable { name: String, scene: &'static str },
    #[error("\"{name}\" expects {signature}: {problem}")]
    Arguments { name: String, signature: &'static str, problem: String },
    #[error("\"{name}\" was called while the {scene} Scene was busy")]
    Busy { name: String, scene: &'static str },
}

impl From<BridgeError> for Box<EvalAltResult> {
    fn from(err: BridgeError) -> Self {
        err.to_string().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeOp {
    Create,
    Destroy,
    GetPosition,
    SetPosition,
    GetVelocity,
    ApplyImpulse,
    SetColor,
}

impl BridgeOp {
    pub const ALL: [BridgeOp; 7] = [
        BridgeOp::Create,
        BridgeOp::Destroy,
        BridgeOp::GetPosition,
        BridgeOp::SetPosition,
        BridgeOp::GetVelocity,
        BridgeOp::ApplyImpulse,
        BridgeOp::SetColor,
    ];

    pub fn function_name(self, kind: BodyKind) -> String {
        let kind = kind.name();
        match self {
            BridgeOp::Create => format!("create_{kind}"),
            BridgeOp::Destroy => format!("destroy_{kind}"),
            BridgeOp::GetPosition => format!("get_{kind}_pos"),
            BridgeOp::SetPosition => format!("set_{kind}_pos"),
            BridgeOp::GetVelocity => format!("get_{kind}_velocity"),
            BridgeOp::ApplyImpulse => format!("apply_{kind}_impulse"),
            BridgeOp::SetColor => format!("set_{kind}_color"),
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            BridgeOp::Create => "()",
            BridgeOp::Destroy | BridgeOp::GetPosition | BridgeOp::GetVelocity => "(handle: int)",
            BridgeOp::SetPosition => "(handle: int, x: float, y: float)",
            BridgeOp::ApplyImpulse => "(handle: int, impulse_x: float, impulse_y: float)",
            BridgeOp::SetColor => "(handle: int, r: int, g: int, b: int[, a: int])",
        }
    }

    fn arity(self) -> RangeInclusive<usize> {
        match self {
            BridgeOp::Create => 0..=0,
            BridgeOp::Destroy | BridgeOp::GetPosition | BridgeOp::GetVelocity => 1..=1,
            BridgeOp::SetPosition | BridgeOp::ApplyImpulse => 3..=3,
            BridgeOp::SetColor => 4..=5,
        }
    }
}

/// Validated call. `None` targets are ints outside the handle range; they
/// behave like any unknown handle.
enum Call {
    Create,
    Destroy(Option<BodyHandle>),
    GetPosition(Option<BodyHandle>),
    GetVelocity(Option<BodyHandle>),
    SetPosition(Option<BodyHandle>, Vec2),
    ApplyImpulse(Option<BodyHandle>, Vec2),
    SetColor(Option<BodyHandle>, Color),
}

/// One script-callable operation bound to a kind and a weak world reference.
#[derive(Debug)]
pub struct BridgeFn {
    name: String,
    kind: BodyKind,
    op: BridgeOp,
    world: WeakWorld,
}

impl BridgeFn {
    pub fn new(kind: BodyKind, op: BridgeOp, world: &WorldCapsule) -> Self {
        Self { name: op.function_name(kind), kind, op, world: Rc::downgrade(world) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> BridgeOp {
        self.op
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_expired(&self) -> bool {
        self.world.strong_count() == 0
    }

    pub fn call(&self, args: &[Dynamic]) -> Result<Dynamic, BridgeError> {
        let Some(world) = self.world.upgrade() else {
            return Err(BridgeError::Unavailable { name: self.name.clone(), scene: WORLD_SCENE_NAME });
        };
        let call = self.parse_args(args)?;
        let mut state = world
            .try_borrow_mut()
            .map_err(|_| BridgeError::Busy { name: self.name.clone(), scene: WORLD_SCENE_NAME })?;
        Ok(self.apply(&mut state, call))
    }

    fn apply(&self, state: &mut WorldState, call: Call) -> Dynamic {
        let kind = self.kind;
        match call {
            Call::Create => Dynamic::from_int(state.create(kind).0 as INT),
            Call::Destroy(target) => Dynamic::from_bool(target.is_some_and(|handle| state.destroy(kind, handle))),
            Call::GetPosition(target) => pair(target.map_or(Vec2::ZERO, |handle| state.position(kind, handle))),
            Call::GetVelocity(target) => pair(target.map_or(Vec2::ZERO, |handle| state.velocity(kind, handle))),
            Call::SetPosition(target, position) => {
                if let Some(handle) = target {
                    state.set_position(kind, handle, position);
                }
                Dynamic::UNIT
            }
            Call::ApplyImpulse(target, impulse) => {
                if let Some(handle) = target {
                    state.apply_impulse(kind, handle, impulse);
                }
                Dynamic::UNIT
            }
            Call::SetColor(target, color) => {
                if let Some(handle) = target {
                    state.set_color(kind, handle, color);
                }
                Dynamic::UNIT
            }
        }
    }

    fn parse_args(&self, args: &[Dynamic]) -> Result<Call, BridgeError> {
        if !self.op.arity().contains(&args.len()) {
            return Err(self.contract(format!("got {} argument(s)", args.len())));
        }
        let call = match self.op {
            BridgeOp::Create => Call::Create,
            BridgeOp::Destroy => Call::Destroy(self.handle_arg(&args[0])?),
            BridgeOp::GetPosition => Call::GetPosition(self.handle_arg(&args[0])?),
            BridgeOp::GetVelocity => Call::GetVelocity(self.handle_arg(&args[0])?),
            BridgeOp::SetPosition => Call::SetPosition(self.handle_arg(&args[0])?, self.vector_args(&args[1..])?),
            BridgeOp::ApplyImpulse => Call::ApplyImpulse(self.handle_arg(&args[0])?, self.vector_args(&args[1..])?),
            BridgeOp::SetColor => {
                let handle = self.handle_arg(&args[0])?;
                let r = self.channel_arg(&args[1], 2)?;
                let g = self.channel_arg(&args[2], 3)?;
                let b = self.channel_arg(&args[3], 4)?;
                let a = match args.get(4) {
                    Some(value) => self.channel_arg(value, 5)?,
                    None => 255,
                };
                Call::SetColor(handle, Color::rgba(r, g, b, a))
            }
        };
        Ok(call)
    }

    /// Ints outside the `u32` range can never name a live body, so they map to `None`.
    fn handle_arg(&self, value: &Dynamic) -> Result<Option<BodyHandle>, BridgeError> {
        let raw = value
            .as_int()
            .map_err(|_| self.contract(format!("argument 1 must be an int, got {}", value.type_name())))?;
        Ok(u32::try_from(raw).ok().map(BodyHandle))
    }

    fn vector_args(&self, args: &[Dynamic]) -> Result<Vec2, BridgeError> {
        let x = self.float_arg(&args[0], 2)?;
        let y = self.float_arg(&args[1], 3)?;
        Ok(Vec2::new(x as f32, y as f32))
    }

    fn float_arg(&self, value: &Dynamic, position: usize) -> Result<FLOAT, BridgeError> {
        let raw = value
            .as_float()
            .map_err(|_| self.contract(format!("argument {position} must be a float, got {}", value.type_name())))?;
        if !(raw as f32).is_finite() {
            return Err(self.contract(format!("argument {position} must be finite, got {raw}")));
        }
        Ok(raw)
    }

    fn channel_arg(&self, value: &Dynamic, position: usize) -> Result<u8, BridgeError> {
        let raw = value
            .as_int()
            .map_err(|_| self.contract(format!("argument {position} must be an int, got {}", value.type_name())))?;
        u8::try_from(raw).map_err(|_| self.contract(format!("argument {position} must be in 0..=255, got {raw}")))
    }

    fn contract(&self, problem: String) -> BridgeError {
        BridgeError::Arguments { name: self.name.clone(), signature: self.op.signature(), problem }
    }
}

fn pair(value: Vec2) -> Dynamic {
    Dynamic::from_array(vec![Dynamic::from_float(value.x as FLOAT), Dynamic::from_float(value.y as FLOAT)])
}

/// Builds the full operation catalog (every op for every body kind).
pub fn bridge_functions(world: &WorldCapsule) -> Vec<Rc<BridgeFn>> {
    BodyKind::ALL
        .iter()
        .flat_map(|kind| BridgeOp::ALL.iter().map(move |op| Rc::new(BridgeFn::new(*kind, *op, world))))
        .collect()
}

/// Wraps the catalog into a rhai module to be registered under [`NAMESPACE`].
pub fn build_module(functions: &[Rc<BridgeFn>]) -> Module {
    let mut module = Module::new();
    for entry in functions {
        register_variadic(&mut module, entry);
    }
    module
}

/// Registers `entry` for every arity from 0 to 6, so arity mismatches reach
/// our own validation instead of rhai's function lookup error.
fn register_variadic(module: &mut Module, entry: &Rc<BridgeFn>) {
    let name = entry.name();
    let f = Rc::clone(entry);
    module.set_native_fn(name, move || invoke(&f, &[]));
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic| invoke(&f, &[a]));
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic| invoke(&f, &[a, b]));
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| invoke(&f, &[a, b, c]));
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| invoke(&f, &[a, b, c, d]));
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic| {
        invoke(&f, &[a, b, c, d, e])
    });
    let f = Rc::clone(entry);
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic, g: Dynamic| {
        invoke(&f, &[a, b, c, d, e, g])
    });
}

fn invoke(entry: &BridgeFn, args: &[Dynamic]) -> Result<Dynamic, Box<EvalAltResult>> {
    entry.call(args).map_err(Into::into)
}
