use std::collections::VecDeque;

use anyhow::Result;
use tracing::debug;

use crate::render::Canvas;
use crate::scene::{Scene, SceneContext};
use crate::scripts::{ScriptRuntime, SharedRuntime};

pub const CONSOLE_CAPACITY: usize = 200;
pub const HISTORY_CAPACITY: usize = 64;

/// Entries shown in the overlay, newest last.
const VISIBLE_ENTRIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKind {
    Input,
    Output,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub kind: ConsoleKind,
    pub text: String,
}

/// REPL over the shared script runtime. Submitted lines run on the next update.
pub struct ScriptConsoleScene {
    runtime: SharedRuntime,
    console: VecDeque<ConsoleEntry>,
    history: VecDeque<String>,
    pending: VecDeque<String>,
}

impl ScriptConsoleScene {
    pub fn new(ctx: &mut SceneContext) -> Self {
        Self {
            runtime: ScriptRuntime::obtain(ctx),
            console: VecDeque::new(),
            history: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn factory() -> impl FnOnce(&mut SceneContext) -> Result<Box<dyn Scene>> {
        |ctx| Ok(Box::new(ScriptConsoleScene::new(ctx)) as Box<dyn Scene>)
    }

    pub fn submit(&mut self, command: impl Into<String>) {
        self.pending.push_back(command.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.console.iter()
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    fn push_entry(&mut self, kind: ConsoleKind, text: impl Into<String>) {
        self.console.push_back(ConsoleEntry { kind, text: text.into() });
        while self.console.len() > CONSOLE_CAPACITY {
            self.console.pop_front();
        }
    }

    fn append_history(&mut self, command: &str) {
        self.history.push_back(command.to_string());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    fn execute_command(&mut self, command: &str) {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return;
        }
        self.append_history(trimmed);
        self.push_entry(ConsoleKind::Input, format!("> {trimmed}"));
        let result = match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.eval_repl(trimmed).map_err(|err| format!("{err:#}")),
            Err(_) => Err("Script runtime is busy; cannot evaluate command.".to_string()),
        };
        self.drain_output();
        match result {
            Ok(Some(value)) => self.push_entry(ConsoleKind::Output, value),
            Ok(None) => {}
            Err(message) => {
                debug!(target: "script", "console command failed: {message}");
                self.push_entry(ConsoleKind::Error, message);
            }
        }
    }

    fn drain_output(&mut self) {
        let lines = match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.take_output(),
            Err(_) => return,
        };
        for line in lines {
            self.push_entry(ConsoleKind::Output, line);
        }
    }
}

impl Scene for ScriptConsoleScene {
    fn update(&mut self, _ctx: &mut SceneContext, _dt: f32) {
        while let Some(command) = self.pending.pop_front() {
            self.execute_command(&command);
        }
        self.drain_output();
    }

    fn draw(&mut self, _ctx: &SceneContext, _canvas: &mut dyn Canvas) {}

    fn draw_overlay(&mut self, _ctx: &SceneContext, canvas: &mut dyn Canvas) {
        canvas.text("Script Console");
        let skip = self.console.len().saturating_sub(VISIBLE_ENTRIES);
        for entry in self.console.iter().skip(skip) {
            match entry.kind {
                ConsoleKind::Error => canvas.text(&format!("error: {}", entry.text)),
                _ => canvas.text(&entry.text),
            }
        }
    }

    fn name(&self) -> &str {
        "Script Console"
    }
}
