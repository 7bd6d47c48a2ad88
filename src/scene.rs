mod actions;
mod context;
mod kinds;
mod shared;

use std::any::{Any, TypeId};

use tracing::{debug, warn};

use crate::input::FrameInput;
use crate::render::Canvas;
use crate::time::FrameTimer;

pub use actions::{ActionQueue, SceneAction, SceneFactory};
pub use context::SceneContext;
pub use kinds::{SceneKindId, SceneKinds};
pub use shared::SharedResources;

/// Lets the stack hand out concrete scene types.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One layer of the scene stack.
///
/// Scenes update top to bottom and draw bottom to top. They never mutate the
/// stack directly; structural changes go through [`SceneContext`] and apply at
/// the start of the next update.
pub trait Scene: AsAny + 'static {
    fn update(&mut self, ctx: &mut SceneContext, dt: f32);

    fn draw(&mut self, ctx: &SceneContext, canvas: &mut dyn Canvas);

    /// Second pass over the visible scenes, after every `draw`.
    fn draw_overlay(&mut self, _ctx: &SceneContext, _canvas: &mut dyn Canvas) {}

    /// Returning `false` hides every scene beneath this one.
    fn allow_draw_below(&self, _ctx: &SceneContext) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scene"
    }

    fn kind_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

pub struct SceneSystem {
    scenes: Vec<Box<dyn Scene>>,
    ctx: SceneContext,
    timer: FrameTimer,
    show_fps: bool,
}

impl SceneSystem {
    pub fn new() -> Self {
        Self { scenes: Vec::new(), ctx: SceneContext::new(), timer: FrameTimer::new(), show_fps: false }
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.ctx
    }

    pub fn set_show_fps(&mut self, show: bool) {
        self.show_fps = show;
    }

    pub fn push_scene<F>(&mut self, factory: F)
    where
        F: FnOnce(&mut SceneContext) -> anyhow::Result<Box<dyn Scene>> + 'static,
    {
        self.ctx.push_scene(factory);
    }

    pub fn pop_scene(&mut self) {
        self.ctx.pop_scene();
    }

    pub fn clear_scenes(&mut self) {
        self.ctx.clear_scenes();
    }

    pub fn set_input(&mut self, input: FrameInput) {
        self.ctx.set_input(input);
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn fps(&self) -> f32 {
        self.timer.fps()
    }

    pub fn top_scene_kind(&mut self) -> Option<SceneKindId> {
        let top = self.scenes.last()?;
        Some(self.ctx.kinds.id_of_scene(top.as_ref()))
    }

    /// Kind ids of the stack, bottom first.
    pub fn scene_kinds(&mut self) -> Vec<SceneKindId> {
        let kinds = &mut self.ctx.kinds;
        self.scenes.iter().map(|scene| kinds.id_of_scene(scene.as_ref())).collect()
    }

    pub fn scene_names(&self) -> Vec<&str> {
        self.scenes.iter().map(|scene| scene.name()).collect()
    }

    /// Looks up the topmost scene of type `T`.
    pub fn find_scene<T: Scene>(&self) -> Option<&T> {
        self.scenes.iter().rev().find_map(|scene| (**scene).as_any().downcast_ref::<T>())
    }

    pub fn find_scene_mut<T: Scene>(&mut self) -> Option<&mut T> {
        self.scenes.iter_mut().rev().find_map(|scene| (**scene).as_any_mut().downcast_mut::<T>())
    }

    /// Measures the wall-clock delta and runs one update with it.
    pub fn tick(&mut self) {
        let dt = self.timer.tick();
        self.update(dt);
    }

    pub fn update(&mut self, dt: f32) {
        self.timer.record(dt);
        self.handle_actions();
        for scene in self.scenes.iter_mut().rev() {
            scene.update(&mut self.ctx, dt);
        }
        self.ctx.input.clear();
    }

    pub fn draw(&mut self, canvas: &mut dyn Canvas) {
        let first = self.first_visible();
        for scene in &mut self.scenes[first..] {
            scene.draw(&self.ctx, canvas);
        }
        for scene in &mut self.scenes[first..] {
            scene.draw_overlay(&self.ctx, canvas);
        }
        if self.show_fps {
            canvas.text(&format!("Current FPS is: {:.0}", self.timer.fps()));
        }
    }

    /// Index of the lowest scene that gets drawn.
    pub fn first_visible(&self) -> usize {
        self.scenes.iter().rposition(|scene| !scene.allow_draw_below(&self.ctx)).unwrap_or(0)
    }

    fn handle_actions(&mut self) {
        while let Some(action) = self.ctx.actions.pop_front() {
            match action {
                SceneAction::Clear => {
                    debug!(target: "scene", count = self.scenes.len(), "clearing scene stack");
                    self.scenes.clear();
                }
                SceneAction::Push(factory) => match factory(&mut self.ctx) {
                    Ok(scene) => {
                        debug!(target: "scene", name = scene.name(), "pushing scene");
                        self.scenes.push(scene);
                    }
                    Err(err) => warn!(target: "scene", "scene factory failed: {err:?}"),
                },
                SceneAction::Pop => match self.scenes.pop() {
                    Some(scene) => debug!(target: "scene", name = scene.name(), "popped scene"),
                    None => debug!(target: "scene", "pop on empty scene stack ignored"),
                },
            }
        }
        self.ctx.pop_queued = false;
        self.ctx.top_kind = self.top_scene_kind();
    }
}

impl Default for SceneSystem {
    fn default() -> Self {
        Self::new()
    }
}
