use anyhow::Result;

use super::actions::{ActionQueue, SceneAction};
use super::kinds::{SceneKindId, SceneKinds};
use super::shared::SharedResources;
use super::Scene;
use crate::input::FrameInput;

/// Everything a scene may touch besides itself: the deferred stack-mutation
/// queue, the shared resource map, scene kind ids and this frame's input.
pub struct SceneContext {
    pub(super) actions: ActionQueue,
    pub(super) pop_queued: bool,
    pub(super) top_kind: Option<SceneKindId>,
    pub(super) kinds: SceneKinds,
    pub(super) input: FrameInput,
    shared: SharedResources,
}

impl SceneContext {
    pub fn new() -> Self {
        Self {
            actions: ActionQueue::new(),
            pop_queued: false,
            top_kind: None,
            kinds: SceneKinds::new(),
            input: FrameInput::new(),
            shared: SharedResources::new(),
        }
    }

    /// Queues construction of a new top scene.
    pub fn push_scene<F>(&mut self, factory: F)
    where
        F: FnOnce(&mut SceneContext) -> Result<Box<dyn Scene>> + 'static,
    {
        self.actions.push(SceneAction::Push(Box::new(factory)));
    }

    pub fn pop_scene(&mut self) {
        self.pop_queued = true;
        self.actions.push(SceneAction::Pop);
    }

    pub fn clear_scenes(&mut self) {
        self.actions.push(SceneAction::Clear);
    }

    /// True when a pop has been queued since the last drain.
    pub fn pop_was_queued(&self) -> bool {
        self.pop_queued
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn input(&self) -> &FrameInput {
        &self.input
    }

    /// Replaces the input delivered to scenes during the next update.
    pub fn set_input(&mut self, input: FrameInput) {
        self.input = input;
    }

    pub fn shared(&self) -> &SharedResources {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedResources {
        &mut self.shared
    }

    pub fn kind_of<T: Scene>(&mut self) -> SceneKindId {
        self.kinds.id_of::<T>()
    }

    /// Kind of the top scene as of the last drain of the action queue.
    pub fn top_scene_kind(&self) -> Option<SceneKindId> {
        self.top_kind
    }

    pub fn is_top_kind<T: Scene>(&mut self) -> bool {
        let kind = self.kinds.id_of::<T>();
        self.top_kind == Some(kind)
    }
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new()
    }
}
