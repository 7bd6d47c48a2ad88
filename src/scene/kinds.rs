use std::any::TypeId;
use std::collections::HashMap;

use super::Scene;

pub type SceneKindId = u32;

/// Assigns small stable ids to concrete scene types, in order of first sight.
#[derive(Debug, Default)]
pub struct SceneKinds {
    ids: HashMap<TypeId, SceneKindId>,
    next: SceneKindId,
}

impl SceneKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_of<T: Scene>(&mut self) -> SceneKindId {
        self.id_for(TypeId::of::<T>())
    }

    pub fn id_of_scene(&mut self, scene: &dyn Scene) -> SceneKindId {
        self.id_for(scene.kind_key())
    }

    fn id_for(&mut self, key: TypeId) -> SceneKindId {
        *self.ids.entry(key).or_insert_with(|| {
            let id = self.next;
            self.next += 1;
            id
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
