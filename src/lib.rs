pub mod app;
pub mod bodies;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod input;
pub mod physics;
pub mod render;
pub mod scene;
pub mod scenes;
pub mod scripts;
pub mod storage;
pub mod time;

pub use app::{run, run_with_overrides, App, RunSummary};
