use std::cell::{Ref, RefCell};
use std::rc::Rc;

use anyhow::Result;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rhai::{Dynamic, FLOAT, INT};
use tracing::{info, warn};

use crate::bodies::{BodyHandle, BodyKind, BodyRegistry};
use crate::bridge::{bridge_functions, build_module, BridgeFn, WorldCapsule, NAMESPACE, WORLD_SCENE_NAME};
use crate::input::FrameInput;
use crate::physics::{BodyShape, PhysicsWorld, StaticKind};
use crate::render::{Canvas, Color};
use crate::scene::{Scene, SceneContext};
use crate::scripts::{HookOutcome, ScriptRuntime, SharedRuntime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldSettings {
    pub gravity: Vec2,
    pub substeps: u32,
    pub pixels_per_unit: f32,
    pub seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self { gravity: Vec2::new(0.0, 10.0), substeps: 4, pixels_per_unit: 200.0, seed: None }
    }
}

/// Physics world plus one body registry per kind. This is what the bridge
/// capsule points at.
pub struct WorldState {
    physics: PhysicsWorld,
    balls: BodyRegistry,
    octagons: BodyRegistry,
    trapezoids: BodyRegistry,
    rng: StdRng,
}

impl WorldState {
    pub fn new(gravity: Vec2, substeps: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            physics: PhysicsWorld::new(gravity, substeps),
            balls: BodyRegistry::new(BodyKind::Ball),
            octagons: BodyRegistry::new(BodyKind::Octagon),
            trapezoids: BodyRegistry::new(BodyKind::Trapezoid),
            rng,
        }
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn registry(&self, kind: BodyKind) -> &BodyRegistry {
        match kind {
            BodyKind::Ball => &self.balls,
            BodyKind::Octagon => &self.octagons,
            BodyKind::Trapezoid => &self.trapezoids,
        }
    }

    fn parts(&mut self, kind: BodyKind) -> (&mut BodyRegistry, &mut PhysicsWorld, &mut StdRng) {
        let registry = match kind {
            BodyKind::Ball => &mut self.balls,
            BodyKind::Octagon => &mut self.octagons,
            BodyKind::Trapezoid => &mut self.trapezoids,
        };
        (registry, &mut self.physics, &mut self.rng)
    }

    pub fn create(&mut self, kind: BodyKind) -> BodyHandle {
        let (registry, physics, rng) = self.parts(kind);
        registry.create(physics, rng)
    }

    pub fn destroy(&mut self, kind: BodyKind, handle: BodyHandle) -> bool {
        let (registry, physics, _) = self.parts(kind);
        registry.destroy(physics, handle)
    }

    pub fn position(&self, kind: BodyKind, handle: BodyHandle) -> Vec2 {
        self.registry(kind).position(&self.physics, handle)
    }

    pub fn velocity(&self, kind: BodyKind, handle: BodyHandle) -> Vec2 {
        self.registry(kind).velocity(&self.physics, handle)
    }

    pub fn set_position(&mut self, kind: BodyKind, handle: BodyHandle, position: Vec2) {
        let (registry, physics, _) = self.parts(kind);
        registry.set_position(physics, handle, position);
    }

    pub fn apply_impulse(&mut self, kind: BodyKind, handle: BodyHandle, impulse: Vec2) {
        let (registry, physics, _) = self.parts(kind);
        registry.apply_impulse(physics, handle, impulse);
    }

    pub fn set_color(&mut self, kind: BodyKind, handle: BodyHandle, color: Color) {
        let (registry, _, _) = self.parts(kind);
        registry.set_color(handle, color);
    }

    pub fn color(&self, kind: BodyKind, handle: BodyHandle) -> Option<Color> {
        self.registry(kind).color(handle)
    }

    pub fn body_count(&self) -> usize {
        BodyKind::ALL.iter().map(|kind| self.registry(*kind).len()).sum()
    }

    pub fn step(&mut self, dt: f32) {
        self.physics.step(dt);
    }
}

/// Scene that owns a physics world and drives it from the shared script
/// runtime's hooks.
///
/// A failing `init` or `update` hook halts scripting for the rest of the
/// scene's life; physics keeps running.
pub struct WorldScene {
    state: WorldCapsule,
    bridge: Vec<Rc<BridgeFn>>,
    runtime: SharedRuntime,
    pixels_per_unit: f32,
    initialized_generation: Option<u64>,
    halted: bool,
    error: Option<String>,
}

impl WorldScene {
    pub fn new(ctx: &mut SceneContext, settings: &WorldSettings) -> Self {
        let runtime = ScriptRuntime::obtain(ctx);
        let state = Rc::new(RefCell::new(WorldState::new(settings.gravity, settings.substeps, settings.seed)));
        let bridge = bridge_functions(&state);
        runtime.borrow_mut().register_namespace(NAMESPACE, build_module(&bridge));
        info!(target: "scene", functions = bridge.len(), "{WORLD_SCENE_NAME} scene ready");
        Self {
            state,
            bridge,
            runtime,
            pixels_per_unit: settings.pixels_per_unit,
            initialized_generation: None,
            halted: false,
            error: None,
        }
    }

    pub fn factory(settings: WorldSettings) -> impl FnOnce(&mut SceneContext) -> Result<Box<dyn Scene>> {
        move |ctx| Ok(Box::new(WorldScene::new(ctx, &settings)) as Box<dyn Scene>)
    }

    pub fn state(&self) -> Ref<'_, WorldState> {
        self.state.borrow()
    }

    pub fn capsule(&self) -> &WorldCapsule {
        &self.state
    }

    pub fn bridge_function(&self, name: &str) -> Option<Rc<BridgeFn>> {
        self.bridge.iter().find(|entry| entry.name() == name).cloned()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn run_hooks(&mut self, input: &FrameInput, dt: f32) {
        if self.halted {
            return;
        }
        let Ok(mut runtime) = self.runtime.try_borrow_mut() else {
            warn!(target: "script", "script runtime busy; skipping world hooks");
            return;
        };
        if !runtime.has_program() {
            return;
        }

        let generation = runtime.generation();
        if self.initialized_generation != Some(generation) {
            self.initialized_generation = Some(generation);
            if let HookOutcome::Failed(err) = runtime.call_hook("init", Vec::new()) {
                warn!(target: "script", "init failed, halting world scripts: {err}");
                self.halted = true;
                self.error = Some(err);
                return;
            }
        }

        for key in &input.keys_pressed {
            if let HookOutcome::Failed(err) = runtime.call_hook("key_pressed_callback", vec![Dynamic::from_int(*key as INT)]) {
                warn!(target: "script", "key_pressed_callback failed: {err}");
                self.error = Some(err);
            }
        }
        for button in &input.gamepad_pressed {
            let args = vec![Dynamic::from_int(*button as INT)];
            if let HookOutcome::Failed(err) = runtime.call_hook("gamepad_pressed_callback", args) {
                warn!(target: "script", "gamepad_pressed_callback failed: {err}");
                self.error = Some(err);
            }
        }
        for (axis, value) in &input.gamepad_axes {
            let args = vec![Dynamic::from_int(*axis as INT), Dynamic::from_float(*value as FLOAT)];
            if let HookOutcome::Failed(err) = runtime.call_hook("gamepad_axis_callback", args) {
                warn!(target: "script", "gamepad_axis_callback failed: {err}");
                self.error = Some(err);
            }
        }

        if let HookOutcome::Failed(err) = runtime.call_hook("update", vec![Dynamic::from_float(dt as FLOAT)]) {
            warn!(target: "script", "update failed, halting world scripts: {err}");
            self.halted = true;
            self.error = Some(err);
        }
    }

    fn to_canvas(&self, point: Vec2) -> Vec2 {
        point * self.pixels_per_unit
    }

    /// True when a body of the given extent around `center` overlaps the canvas.
    fn on_canvas(&self, center: Vec2, extent: f32, canvas_size: Vec2) -> bool {
        let center = self.to_canvas(center);
        let extent = extent * self.pixels_per_unit;
        center.x + extent >= 0.0
            && center.y + extent >= 0.0
            && center.x - extent <= canvas_size.x
            && center.y - extent <= canvas_size.y
    }
}

impl Scene for WorldScene {
    fn update(&mut self, ctx: &mut SceneContext, dt: f32) {
        self.run_hooks(ctx.input(), dt);
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.step(dt),
            Err(_) => warn!(target: "physics", "world state busy; skipping physics step"),
        }
    }

    fn draw(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        let Ok(state) = self.state.try_borrow() else {
            return;
        };
        for block in state.physics().statics() {
            let color = match block.kind {
                StaticKind::Ground => Color::DARK_GREEN,
                StaticKind::Wall => Color::BROWN,
            };
            let min = self.to_canvas(block.center - block.half);
            canvas.fill_rect(min, block.half * 2.0 * self.pixels_per_unit, color);
        }
        let canvas_size = canvas.size();
        for kind in BodyKind::ALL {
            let shape = kind.shape();
            let extent = match &shape {
                BodyShape::Circle { radius } => *radius,
                BodyShape::ConvexPolygon { points } => points.iter().map(|p| p.length()).fold(0.0, f32::max),
            };
            for (_, entry) in state.registry(kind).iter() {
                let physics = state.physics();
                let Some(center) = physics.translation(entry.body) else {
                    continue;
                };
                if !self.on_canvas(center, extent, canvas_size) {
                    continue;
                }
                match &shape {
                    BodyShape::Circle { radius } => {
                        canvas.fill_circle(self.to_canvas(center), radius * self.pixels_per_unit, entry.color);
                    }
                    BodyShape::ConvexPolygon { points } => {
                        let rotation = Vec2::from_angle(physics.rotation(entry.body).unwrap_or(0.0));
                        let outline: Vec<Vec2> =
                            points.iter().map(|p| self.to_canvas(center + rotation.rotate(*p))).collect();
                        canvas.fill_polygon(&outline, entry.color);
                    }
                }
            }
        }
    }

    fn draw_overlay(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        if let Ok(state) = self.state.try_borrow() {
            canvas.text(&format!(
                "Bodies: {} balls, {} octagons, {} trapezoids",
                state.registry(BodyKind::Ball).len(),
                state.registry(BodyKind::Octagon).len(),
                state.registry(BodyKind::Trapezoid).len(),
            ));
        }
        if let Some(err) = &self.error {
            let prefix = if self.halted { "Script halted" } else { "Script error" };
            canvas.text(&format!("{prefix}: {err}"));
        }
    }

    fn name(&self) -> &str {
        WORLD_SCENE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingCanvas;

    fn settings() -> WorldSettings {
        WorldSettings { seed: Some(5), ..WorldSettings::default() }
    }

    #[test]
    fn state_routes_operations_by_kind() {
        let mut state = WorldState::new(Vec2::new(0.0, 10.0), 4, Some(1));
        let ball = state.create(BodyKind::Ball);
        let octagon = state.create(BodyKind::Octagon);
        assert_eq!(ball, BodyHandle(0));
        assert_eq!(octagon, BodyHandle(0));
        assert_eq!(state.body_count(), 2);
        assert!(state.destroy(BodyKind::Ball, ball));
        assert!(state.registry(BodyKind::Ball).is_empty());
        assert_eq!(state.registry(BodyKind::Octagon).len(), 1);
    }

    #[test]
    fn halts_after_failing_update_but_keeps_stepping() {
        let mut ctx = SceneContext::new();
        let mut scene = WorldScene::new(&mut ctx, &settings());
        ScriptRuntime::obtain(&mut ctx)
            .borrow_mut()
            .run_source("fn init() { this.ball = scene_2d::create_ball(); } fn update(dt) { throw \"bad\"; }")
            .expect("script compiles");

        scene.update(&mut ctx, 1.0 / 60.0);
        assert!(scene.is_halted());
        assert!(scene.error().is_some_and(|err| err.contains("bad")));
        let start = scene.state().position(BodyKind::Ball, BodyHandle(0));
        for _ in 0..10 {
            scene.update(&mut ctx, 1.0 / 60.0);
        }
        let end = scene.state().position(BodyKind::Ball, BodyHandle(0));
        assert!(end.y > start.y, "physics should keep running: {start:?} -> {end:?}");
        assert_eq!(scene.state().registry(BodyKind::Ball).len(), 1);
    }

    #[test]
    fn key_callbacks_receive_frame_input() {
        let mut ctx = SceneContext::new();
        let mut scene = WorldScene::new(&mut ctx, &settings());
        let runtime = ScriptRuntime::obtain(&mut ctx);
        runtime
            .borrow_mut()
            .run_source("fn key_pressed_callback(key) { this.last = key; } fn update(dt) {}")
            .expect("script compiles");
        ctx.set_input(FrameInput::new().with_key(crate::input::keys::LEFT));
        scene.update(&mut ctx, 0.0);
        let runtime = runtime.borrow();
        let state = runtime.state().clone().cast::<rhai::Map>();
        assert_eq!(state.get("last").and_then(|v| v.as_int().ok()), Some(263));
    }

    #[test]
    fn draw_emits_statics_and_bodies() {
        let mut ctx = SceneContext::new();
        let mut scene = WorldScene::new(&mut ctx, &settings());
        {
            let mut state = scene.capsule().borrow_mut();
            let ball = state.create(BodyKind::Ball);
            let trapezoid = state.create(BodyKind::Trapezoid);
            state.set_position(BodyKind::Ball, ball, Vec2::new(1.5, 1.0));
            state.set_position(BodyKind::Trapezoid, trapezoid, Vec2::new(2.5, 1.0));
        }
        let mut canvas = RecordingCanvas::new();
        scene.draw(&ctx, &mut canvas);
        assert_eq!(canvas.shape_count(), 2);
        assert_eq!(canvas.commands().len(), 5);
    }

    #[test]
    fn draw_skips_bodies_outside_the_canvas() {
        let mut ctx = SceneContext::new();
        let mut scene = WorldScene::new(&mut ctx, &settings());
        {
            let mut state = scene.capsule().borrow_mut();
            let kept = state.create(BodyKind::Ball);
            let fallen = state.create(BodyKind::Ball);
            state.set_position(BodyKind::Ball, kept, Vec2::new(2.0, 1.0));
            state.set_position(BodyKind::Ball, fallen, Vec2::new(2.0, 5.0));
        }

        let mut canvas = RecordingCanvas::with_size(800, 800);
        scene.draw(&ctx, &mut canvas);
        assert_eq!(canvas.shape_count(), 1);

        let mut tall = RecordingCanvas::with_size(800, 1200);
        scene.draw(&ctx, &mut tall);
        assert_eq!(tall.shape_count(), 2);
    }

    #[test]
    fn failing_init_halts_before_any_update_runs() {
        let mut ctx = SceneContext::new();
        let mut scene = WorldScene::new(&mut ctx, &settings());
        ScriptRuntime::obtain(&mut ctx)
            .borrow_mut()
            .run_source("fn init() { throw \"boom\"; } fn update(dt) { scene_2d::create_ball(); }")
            .expect("script compiles");

        for _ in 0..5 {
            scene.update(&mut ctx, 1.0 / 60.0);
        }
        assert!(scene.is_halted());
        assert!(scene.error().is_some_and(|err| err.contains("boom")));
        assert_eq!(scene.state().body_count(), 0);
    }
}
