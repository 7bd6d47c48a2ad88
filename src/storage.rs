use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

/// Script files addressed by editor-style names such as `/test.rhai`,
/// resolved under a fixed root directory.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `name` into the store. Absolute names are taken relative to the
    /// root; names that would escape it are rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let trimmed = name.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            bail!("Script name is empty");
        }
        let relative = Path::new(trimmed);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("Script name '{name}' leaves the script directory"),
            }
        }
        Ok(self.root.join(relative))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|path| path.is_file()).unwrap_or(false)
    }

    pub fn save(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("Writing {}", path.display()))?;
        info!(target: "script", path = %path.display(), bytes = text.len(), "script saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_under_root() {
        let store = ScriptStore::new("scripts");
        assert_eq!(store.resolve("/test.rhai").expect("valid"), PathBuf::from("scripts/test.rhai"));
        assert_eq!(store.resolve("dir/a.rhai").expect("valid"), PathBuf::from("scripts/dir/a.rhai"));
        assert!(store.resolve("/../etc/passwd").is_err());
        assert!(store.resolve("  ").is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = ScriptStore::new(dir.path());
        store.save("/nested/test.rhai", "print(1);").expect("save");
        assert!(store.exists("/nested/test.rhai"));
        assert_eq!(store.load("/nested/test.rhai").expect("load"), "print(1);");
        assert!(store.load("/missing.rhai").is_err());
    }
}
