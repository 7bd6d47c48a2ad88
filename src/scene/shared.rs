use std::any::Any;
use std::collections::HashMap;

use tracing::debug;

type Cleanup = Box<dyn FnOnce(Box<dyn Any>)>;

struct SharedEntry {
    value: Box<dyn Any>,
    cleanup: Cleanup,
}

/// String-keyed side channel for resources several scenes share without the
/// scene system knowing their types (the script runtime, mainly).
///
/// Keys are never silently overwritten. Each entry carries a cleanup callback
/// that runs when the entry is cleared or the map is dropped.
#[derive(Default)]
pub struct SharedResources {
    entries: HashMap<String, SharedEntry>,
}

impl SharedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`. Returns `false` and leaves the map untouched
    /// when the key already exists.
    pub fn set<T: Any>(&mut self, name: impl Into<String>, value: T, cleanup: impl FnOnce(T) + 'static) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        let cleanup: Cleanup = Box::new(move |value: Box<dyn Any>| {
            if let Ok(value) = value.downcast::<T>() {
                cleanup(*value);
            }
        });
        debug!(target: "scene", key = %name, "shared resource stored");
        self.entries.insert(name, SharedEntry { value: Box::new(value), cleanup });
        true
    }

    /// Returns the value stored under `name` if present and of type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|entry| entry.value.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name).and_then(|entry| entry.value.downcast_mut::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the entry and runs its registered cleanup.
    pub fn clear(&mut self, name: &str) -> bool {
        match self.entries.remove(name) {
            Some(entry) => {
                (entry.cleanup)(entry.value);
                debug!(target: "scene", key = %name, "shared resource cleared");
                true
            }
            None => false,
        }
    }

    /// Removes the entry, running `cleanup` instead of the registered one.
    /// Returns `false` without removing anything if the key is absent or the
    /// stored value is not a `T`.
    pub fn clear_with<T: Any>(&mut self, name: &str, cleanup: impl FnOnce(T)) -> bool {
        if self.get::<T>(name).is_none() {
            return false;
        }
        let Some(entry) = self.entries.remove(name) else {
            return false;
        };
        match entry.value.downcast::<T>() {
            Ok(value) => {
                cleanup(*value);
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for SharedResources {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            (entry.cleanup)(entry.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut shared = SharedResources::new();
        assert!(shared.set("lua", 1u32, |_| {}));
        assert!(!shared.set("lua", 2u32, |_| {}));
        assert_eq!(shared.get::<u32>("lua"), Some(&1));
    }

    #[test]
    fn get_checks_key_and_type() {
        let mut shared = SharedResources::new();
        shared.set("name", String::from("value"), |_| {});
        assert_eq!(shared.get::<String>("name").map(String::as_str), Some("value"));
        assert!(shared.get::<u32>("name").is_none());
        assert!(shared.get::<String>("other").is_none());
    }

    #[test]
    fn clear_runs_registered_cleanup_once() {
        let calls = Rc::new(Cell::new(0));
        let mut shared = SharedResources::new();
        let counter = Rc::clone(&calls);
        shared.set("res", 5i64, move |value| counter.set(counter.get() + value));
        assert!(shared.clear("res"));
        assert!(!shared.clear("res"));
        assert_eq!(calls.get(), 5);
        assert!(shared.is_empty());
    }

    #[test]
    fn override_cleanup_replaces_registered_one() {
        let registered = Rc::new(Cell::new(false));
        let overridden = Rc::new(Cell::new(false));
        let mut shared = SharedResources::new();
        let flag = Rc::clone(&registered);
        shared.set("res", 1u8, move |_| flag.set(true));
        let flag = Rc::clone(&overridden);
        assert!(shared.clear_with::<u8>("res", move |_| flag.set(true)));
        assert!(!registered.get());
        assert!(overridden.get());
    }

    #[test]
    fn drop_runs_remaining_cleanups() {
        let calls = Rc::new(Cell::new(0));
        {
            let mut shared = SharedResources::new();
            for name in ["a", "b"] {
                let counter = Rc::clone(&calls);
                shared.set(name, (), move |_| counter.set(counter.get() + 1));
            }
        }
        assert_eq!(calls.get(), 2);
    }
}
