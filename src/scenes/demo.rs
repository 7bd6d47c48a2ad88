use anyhow::Result;

use crate::render::{Canvas, Color};
use crate::scene::{Scene, SceneContext};
use crate::time::FrameTimer;

/// Opaque backdrop: paints the background and hides everything beneath it.
pub struct DemoScene {
    background: Color,
    timer: FrameTimer,
}

impl DemoScene {
    pub fn new(background: Color) -> Self {
        Self { background, timer: FrameTimer::new() }
    }

    pub fn factory() -> impl FnOnce(&mut SceneContext) -> Result<Box<dyn Scene>> {
        |_ctx| Ok(Box::new(DemoScene::default()) as Box<dyn Scene>)
    }

    pub fn fps(&self) -> f32 {
        self.timer.fps()
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new(Color::DARK_GRAY)
    }
}

impl Scene for DemoScene {
    fn update(&mut self, _ctx: &mut SceneContext, dt: f32) {
        self.timer.record(dt);
    }

    fn draw(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        canvas.clear(self.background);
    }

    fn draw_overlay(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        canvas.text(&format!("Demo scene, FPS: {:.0}", self.timer.fps()));
    }

    fn allow_draw_below(&self, _ctx: &SceneContext) -> bool {
        false
    }

    fn name(&self) -> &str {
        "Demo"
    }
}
