pub mod demo;
pub mod script_console;
pub mod script_edit;
pub mod world;

pub use demo::DemoScene;
pub use script_console::{ConsoleEntry, ConsoleKind, ScriptConsoleScene};
pub use script_edit::{ExecStatus, ScriptEditScene};
pub use world::{WorldScene, WorldSettings, WorldState};
