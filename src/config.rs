use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::input::InputEvent;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "PhysicsConfig::default_gravity")]
    pub gravity: [f32; 2],
    #[serde(default = "PhysicsConfig::default_substeps")]
    pub substeps: u32,
    #[serde(default = "PhysicsConfig::default_pixels_per_unit")]
    pub pixels_per_unit: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    #[serde(default)]
    pub main_script: Option<PathBuf>,
    #[serde(default)]
    pub prelude: Option<PathBuf>,
    #[serde(default = "ScriptConfig::default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default = "ScriptConfig::default_autorun")]
    pub autorun: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneChoice {
    World,
    ScriptEdit,
    ScriptConsole,
    Demo,
}

impl SceneChoice {
    pub fn label(self) -> &'static str {
        match self {
            SceneChoice::World => "2D World",
            SceneChoice::ScriptEdit => "Script Editor",
            SceneChoice::ScriptConsole => "Script Console",
            SceneChoice::Demo => "Demo",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    #[serde(default = "StackConfig::default_initial")]
    pub initial: Vec<SceneChoice>,
    #[serde(default = "StackConfig::default_show_fps")]
    pub show_fps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReplayEvent {
    pub frame: u32,
    #[serde(flatten)]
    pub event: InputEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub stack: StackConfig,
    #[serde(default = "AppConfig::default_frames")]
    pub frames: u32,
    #[serde(default = "AppConfig::default_fixed_dt")]
    pub fixed_dt: f32,
    #[serde(default)]
    pub replay: Vec<ReplayEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub frames: Option<u32>,
    pub script: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Physics Sandbox".to_string(), width: 800, height: 800 }
    }
}

impl PhysicsConfig {
    const fn default_gravity() -> [f32; 2] {
        [0.0, 10.0]
    }

    const fn default_substeps() -> u32 {
        4
    }

    const fn default_pixels_per_unit() -> f32 {
        200.0
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Self::default_gravity(),
            substeps: Self::default_substeps(),
            pixels_per_unit: Self::default_pixels_per_unit(),
        }
    }
}

impl ScriptConfig {
    fn default_storage_root() -> PathBuf {
        PathBuf::from("scripts")
    }

    const fn default_autorun() -> bool {
        true
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            main_script: None,
            prelude: None,
            storage_root: Self::default_storage_root(),
            autorun: Self::default_autorun(),
            seed: None,
        }
    }
}

impl StackConfig {
    fn default_initial() -> Vec<SceneChoice> {
        vec![SceneChoice::World, SceneChoice::ScriptEdit]
    }

    const fn default_show_fps() -> bool {
        true
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self { initial: Self::default_initial(), show_fps: Self::default_show_fps() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            physics: PhysicsConfig::default(),
            script: ScriptConfig::default(),
            stack: StackConfig::default(),
            frames: Self::default_frames(),
            fixed_dt: Self::default_fixed_dt(),
            replay: Vec::new(),
        }
    }
}

impl AppConfig {
    const fn default_frames() -> u32 {
        600
    }

    const fn default_fixed_dt() -> f32 {
        1.0 / 60.0
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(frames) = overrides.frames {
            self.frames = frames;
        }
        if let Some(script) = &overrides.script {
            self.script.main_script = Some(script.clone());
        }
        if let Some(seed) = overrides.seed {
            self.script.seed = Some(seed);
        }
    }

    /// Replay events scheduled for `frame`, in configuration order.
    pub fn replay_for(&self, frame: u32) -> impl Iterator<Item = InputEvent> + '_ {
        self.replay.iter().filter(move |entry| entry.frame == frame).map(|entry| entry.event)
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.frames.is_none() && self.script.is_none() && self.seed.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.frames.is_some() {
            fields.push("frames");
        }
        if self.script.is_some() {
            fields.push("script");
        }
        if self.seed.is_some() {
            fields.push("seed");
        }
        fields
    }
}
