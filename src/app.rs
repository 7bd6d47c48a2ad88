use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{debug, info};

use crate::config::{AppConfig, AppConfigOverrides, SceneChoice, DEFAULT_CONFIG_PATH};
use crate::input::FrameInput;
use crate::render::RecordingCanvas;
use crate::scene::{Scene, SceneContext, SceneSystem};
use crate::scenes::{DemoScene, ScriptConsoleScene, ScriptEditScene, WorldScene, WorldSettings};
use crate::scripts::{ScriptOptions, ScriptRuntime};
use crate::storage::ScriptStore;

pub fn run() -> Result<()> {
    run_with_overrides(None, AppConfigOverrides::default())
}

pub fn run_with_overrides(config_path: Option<&Path>, overrides: AppConfigOverrides) -> Result<()> {
    let mut config = AppConfig::load_or_default(config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH)));
    if !overrides.is_empty() {
        info!("Applying CLI overrides: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);
    let mut app = App::new(config)?;
    let summary = app.run();
    info!(
        frames = summary.frames,
        scenes = summary.scenes,
        bodies = summary.bodies,
        "run finished, last frame drew {} commands",
        summary.draw_commands
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u32,
    pub scenes: usize,
    pub bodies: usize,
    pub draw_commands: usize,
}

/// Headless host: owns the scene stack and feeds it frames, replayed input
/// and a recording canvas.
pub struct App {
    config: AppConfig,
    system: SceneSystem,
    canvas: RecordingCanvas,
    frame: u32,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut system = SceneSystem::new();
        system.set_show_fps(config.stack.show_fps);

        let options = ScriptOptions { prelude: config.script.prelude.clone(), seed: config.script.seed };
        ScriptRuntime::install(system.context_mut(), ScriptRuntime::shared(&options));

        let main_source = match &config.script.main_script {
            Some(path) => {
                Some(fs::read_to_string(path).with_context(|| format!("Reading main script {}", path.display()))?)
            }
            None => None,
        };

        for choice in &config.stack.initial {
            push_choice(&mut system, *choice, &config, main_source.clone());
        }
        info!(
            title = %config.window.title,
            scenes = config.stack.initial.len(),
            "app initialised ({}x{})",
            config.window.width,
            config.window.height
        );
        let canvas = RecordingCanvas::with_size(config.window.width, config.window.height);
        Ok(Self { config, system, canvas, frame: 0 })
    }

    pub fn system(&self) -> &SceneSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut SceneSystem {
        &mut self.system
    }

    pub fn canvas(&self) -> &RecordingCanvas {
        &self.canvas
    }

    pub fn frame_index(&self) -> u32 {
        self.frame
    }

    /// Runs one update + draw.
    pub fn frame(&mut self) {
        let mut input = FrameInput::new();
        for event in self.config.replay_for(self.frame) {
            input.push(event);
        }
        self.system.set_input(input);
        if self.config.fixed_dt > 0.0 {
            self.system.update(self.config.fixed_dt);
        } else {
            self.system.tick();
        }
        self.canvas.take();
        self.system.draw(&mut self.canvas);
        self.frame += 1;
    }

    pub fn run(&mut self) -> RunSummary {
        for _ in 0..self.config.frames {
            self.frame();
        }
        let bodies = self.system.find_scene::<WorldScene>().map(|world| world.state().body_count()).unwrap_or(0);
        RunSummary {
            frames: self.frame,
            scenes: self.system.len(),
            bodies,
            draw_commands: self.canvas.commands().len(),
        }
    }
}

fn world_settings(config: &AppConfig) -> WorldSettings {
    WorldSettings {
        gravity: Vec2::from_array(config.physics.gravity),
        substeps: config.physics.substeps,
        pixels_per_unit: config.physics.pixels_per_unit,
        seed: config.script.seed,
    }
}

fn push_choice(system: &mut SceneSystem, choice: SceneChoice, config: &AppConfig, main_source: Option<String>) {
    match choice {
        SceneChoice::World => system.push_scene(WorldScene::factory(world_settings(config))),
        SceneChoice::ScriptEdit => {
            let store = ScriptStore::new(config.script.storage_root.clone());
            let autorun = config.script.autorun;
            system.push_scene(move |ctx: &mut SceneContext| {
                let scene = ScriptEditScene::new(ctx, store).with_autorun(autorun);
                let scene = match main_source {
                    Some(text) => scene.with_text(text)?,
                    None => scene,
                };
                Ok(Box::new(scene) as Box<dyn Scene>)
            });
        }
        SceneChoice::ScriptConsole => system.push_scene(ScriptConsoleScene::factory()),
        SceneChoice::Demo => system.push_scene(DemoScene::factory()),
    }
    debug!(target: "scene", "queued initial scene {}", choice.label());
}
