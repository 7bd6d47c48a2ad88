use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::render::Canvas;
use crate::scene::{Scene, SceneContext};
use crate::scripts::{ScriptRuntime, SharedRuntime};
use crate::storage::ScriptStore;

pub const TEXT_BUF_SIZE: usize = 65536;
pub const FILENAME_BUF_SIZE: usize = 1024;
pub const DEFAULT_FILENAME: &str = "/test.rhai";

/// Ball and trapezoid driven by arrow keys / WASD, nudged at random and
/// respawned once they fall off the ground.
pub const DEFAULT_SCRIPT: &str = r#"// Runs against the 2D world scene.
fn init() {
    this.ball = scene_2d::create_ball();
    this.trapezoid = scene_2d::create_trapezoid();
    this.octagon = scene_2d::create_octagon();
    this.ball_elapsed = 0.0;
    this.trapezoid_elapsed = -0.8;
}

fn key_pressed_callback(key) {
    if key == 262 {
        scene_2d::apply_trapezoid_impulse(this.trapezoid, 0.24, 0.0);
    } else if key == 263 {
        scene_2d::apply_trapezoid_impulse(this.trapezoid, -0.24, 0.0);
    } else if key == 264 {
        scene_2d::apply_trapezoid_impulse(this.trapezoid, 0.0, 0.24);
    } else if key == 265 {
        scene_2d::apply_trapezoid_impulse(this.trapezoid, 0.0, -0.24);
    } else if key == 68 {
        scene_2d::apply_ball_impulse(this.ball, 0.24, 0.0);
    } else if key == 65 {
        scene_2d::apply_ball_impulse(this.ball, -0.24, 0.0);
    } else if key == 83 {
        scene_2d::apply_ball_impulse(this.ball, 0.0, 0.24);
    } else if key == 87 {
        scene_2d::apply_ball_impulse(this.ball, 0.0, -0.24);
    }
}

fn update(dt) {
    this.ball_elapsed += dt;
    this.trapezoid_elapsed += dt;

    let ball = scene_2d::get_ball_pos(this.ball);
    if ball[1] > 10.0 {
        scene_2d::set_ball_pos(this.ball, 2.0, 0.0);
    }
    let trapezoid = scene_2d::get_trapezoid_pos(this.trapezoid);
    if trapezoid[1] > 10.0 {
        scene_2d::set_trapezoid_pos(this.trapezoid, 2.4, 0.0);
    }

    if this.ball_elapsed > 1.8 {
        this.ball_elapsed = 0.0;
        if rand() > 0.33 {
            let x = rand();
            if ball[0] > 2.0 {
                x = -x;
            }
            let y = -rand() * 0.3;
            scene_2d::apply_ball_impulse(this.ball, x, y);
            print(`Ball impulse of ${x}, ${y}`);
        }
    }

    if this.trapezoid_elapsed > 1.8 {
        this.trapezoid_elapsed = 0.0;
        if rand() > 0.33 {
            let x = rand() * 0.2;
            if trapezoid[0] > 2.0 {
                x = -x;
            }
            let y = -rand() * 0.2;
            scene_2d::apply_trapezoid_impulse(this.trapezoid, x, y);
        }
    }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    NotRun,
    Success,
    Failed(String),
}

/// Text buffer plus filename, executed into and saved from the shared runtime.
pub struct ScriptEditScene {
    runtime: SharedRuntime,
    store: ScriptStore,
    text: String,
    filename: String,
    exec_status: ExecStatus,
    storage_status: Option<String>,
    autorun: bool,
}

impl ScriptEditScene {
    pub fn new(ctx: &mut SceneContext, store: ScriptStore) -> Self {
        Self {
            runtime: ScriptRuntime::obtain(ctx),
            store,
            text: DEFAULT_SCRIPT.to_string(),
            filename: DEFAULT_FILENAME.to_string(),
            exec_status: ExecStatus::NotRun,
            storage_status: None,
            autorun: false,
        }
    }

    /// Executes the buffer on the first update.
    pub fn with_autorun(mut self, autorun: bool) -> Self {
        self.autorun = autorun;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Result<Self> {
        self.set_text(text)?;
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.len() > TEXT_BUF_SIZE {
            bail!("Script is {} bytes, limit is {TEXT_BUF_SIZE}", text.len());
        }
        self.text = text;
        Ok(())
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_filename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.len() > FILENAME_BUF_SIZE {
            bail!("Filename is {} bytes, limit is {FILENAME_BUF_SIZE}", name.len());
        }
        self.filename = name;
        Ok(())
    }

    pub fn exec_status(&self) -> &ExecStatus {
        &self.exec_status
    }

    pub fn storage_status(&self) -> Option<&str> {
        self.storage_status.as_deref()
    }

    /// Runs the buffer in the shared runtime. Returns whether it succeeded.
    pub fn execute(&mut self) -> bool {
        let result = match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.run_source(&self.text).map(|_| ()),
            Err(_) => Err(anyhow::anyhow!("Script runtime is busy")),
        };
        self.exec_status = match result {
            Ok(()) => {
                info!(target: "script", bytes = self.text.len(), "editor script executed");
                ExecStatus::Success
            }
            Err(err) => {
                warn!(target: "script", "editor script failed: {err:#}");
                ExecStatus::Failed(format!("{err:#}"))
            }
        };
        self.exec_status == ExecStatus::Success
    }

    pub fn reset(&mut self) {
        self.text = DEFAULT_SCRIPT.to_string();
        self.exec_status = ExecStatus::NotRun;
    }

    pub fn save(&mut self) -> bool {
        let result = self.store.save(&self.filename, &self.text);
        self.storage_status = Some(match &result {
            Ok(_) => format!("Saved {}", self.filename),
            Err(err) => format!("Save failed: {err:#}"),
        });
        result.is_ok()
    }

    pub fn load(&mut self) -> bool {
        let result = self.store.load(&self.filename).and_then(|text| self.set_text(text));
        self.storage_status = Some(match &result {
            Ok(()) => format!("Loaded {}", self.filename),
            Err(err) => format!("Load failed: {err:#}"),
        });
        result.is_ok()
    }

    /// Loads the named file into the buffer and executes it.
    pub fn exec_file(&mut self) -> bool {
        self.load() && self.execute()
    }

    pub fn status_line(&self) -> String {
        match &self.exec_status {
            ExecStatus::NotRun => "Not executed".to_string(),
            ExecStatus::Success => "Executed successfully".to_string(),
            ExecStatus::Failed(err) => format!("Execution failed: {err}"),
        }
    }
}

impl Scene for ScriptEditScene {
    fn update(&mut self, _ctx: &mut SceneContext, _dt: f32) {
        if self.autorun {
            self.autorun = false;
            self.execute();
        }
    }

    fn draw(&mut self, _ctx: &SceneContext, _canvas: &mut dyn Canvas) {}

    fn draw_overlay(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        canvas.text(&format!("Script Editor [{}] {} bytes", self.filename, self.text.len()));
        canvas.text(&self.status_line());
        if let Some(status) = &self.storage_status {
            canvas.text(status);
        }
    }

    fn name(&self) -> &str {
        "Script Editor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(store: ScriptStore) -> (SceneContext, ScriptEditScene) {
        let mut ctx = SceneContext::new();
        let scene = ScriptEditScene::new(&mut ctx, store);
        (ctx, scene)
    }

    #[test]
    fn default_script_compiles() {
        let compiled = rhai::Engine::new().compile(DEFAULT_SCRIPT);
        assert!(compiled.is_ok(), "{compiled:?}");
        assert!(DEFAULT_SCRIPT.len() <= TEXT_BUF_SIZE);
    }

    #[test]
    fn buffer_limits_are_enforced() {
        let (_ctx, mut scene) = scene(ScriptStore::new("scripts"));
        assert!(scene.set_text("x".repeat(TEXT_BUF_SIZE)).is_ok());
        assert!(scene.set_text("x".repeat(TEXT_BUF_SIZE + 1)).is_err());
        assert!(scene.set_filename("f".repeat(FILENAME_BUF_SIZE + 1)).is_err());
        assert_eq!(scene.filename(), DEFAULT_FILENAME);
        scene.reset();
        assert_eq!(scene.text(), DEFAULT_SCRIPT);
    }

    #[test]
    fn execute_reports_failures() {
        let (_ctx, mut scene) = scene(ScriptStore::new("scripts"));
        scene.set_text("fn update(dt) {").expect("fits");
        assert!(!scene.execute());
        assert!(matches!(scene.exec_status(), ExecStatus::Failed(_)));
        scene.set_text("fn update(dt) {}").expect("fits");
        assert!(scene.execute());
        assert!(scene.runtime.borrow().has_hook("update", 1));
    }

    #[test]
    fn save_load_and_exec_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (_ctx, mut scene) = scene(ScriptStore::new(dir.path()));
        scene.set_text("fn init() { }").expect("fits");
        assert!(scene.save());
        assert_eq!(scene.storage_status(), Some("Saved /test.rhai"));
        scene.reset();
        assert!(scene.exec_file());
        assert_eq!(scene.text(), "fn init() { }");
        assert!(scene.runtime.borrow().has_hook("init", 0));

        scene.set_filename("/missing.rhai").expect("fits");
        assert!(!scene.load());
        assert!(scene.storage_status().is_some_and(|s| s.starts_with("Load failed")));
    }
}
