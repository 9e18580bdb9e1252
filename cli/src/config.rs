use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "docrun.toml";

/// Settings read from `docrun.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// File extensions, without the dot, that count as documents.
    pub extensions: Vec<String>,

    /// Directory names never descended into.
    pub exclude: Vec<String>,

    /// Stop at the first failing document.
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            extensions: vec!["md".into(), "rst".into(), "txt".into()],
            exclude: vec!["target".into(), ".git".into()],
            fail_fast: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Use `explicit` when given, otherwise a `docrun.toml` next to `root`
    /// (in it, for a directory), otherwise the defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Config, String> {
        if let Some(path) = explicit {
            return Config::load(path);
        }
        let dir: PathBuf = if root.is_dir() {
            root.to_path_buf()
        } else {
            root.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config");
            Config::load(&candidate)
        } else {
            Ok(Config::default())
        }
    }

    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x == ext))
    }

    pub fn is_excluded(&self, dir: &Path) -> bool {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.exclude.iter().any(|x| x == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(dir.path(), None).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.is_document(Path::new("a/guide.rst")));
        assert!(!config.is_document(Path::new("a/main.rs")));
        assert!(config.is_excluded(Path::new("repo/target")));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "extensions = [\"md\"]\nfail_fast = true\n")
            .unwrap();
        let config = Config::discover(dir.path(), None).unwrap();
        assert_eq!(config.extensions, vec!["md".to_string()]);
        assert!(config.fail_fast);
        assert_eq!(config.exclude, Config::default().exclude);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "extension = [\"md\"]\n").unwrap();
        assert!(Config::discover(dir.path(), Some(&path)).is_err());
    }
}
