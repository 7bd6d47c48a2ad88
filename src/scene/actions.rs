use std::collections::VecDeque;
use std::fmt;

use anyhow::Result;

use super::{Scene, SceneContext};

/// Builds a scene when its `Push` is applied. A failing factory is logged and
/// the push becomes a no-op.
pub type SceneFactory = Box<dyn FnOnce(&mut SceneContext) -> Result<Box<dyn Scene>>>;

/// Structural change to the scene stack, applied at the start of the next update.
pub enum SceneAction {
    Clear,
    Push(SceneFactory),
    Pop,
}

impl fmt::Debug for SceneAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneAction::Clear => f.write_str("Clear"),
            SceneAction::Push(_) => f.write_str("Push(..)"),
            SceneAction::Pop => f.write_str("Pop"),
        }
    }
}

/// FIFO of pending [`SceneAction`]s.
#[derive(Default)]
pub struct ActionQueue {
    queue: VecDeque<SceneAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: SceneAction) {
        self.queue.push_back(action);
    }

    pub fn pop_front(&mut self) -> Option<SceneAction> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
