//! Pluggable configuration sources
//!
//! The process environment is the primary source. A local `.env` file can be
//! layered underneath it; values already present in the environment win.

use crate::ConfigError;
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// A key/value lookup that configuration structs are resolved against
pub trait ConfigSource: Send + Sync {
    /// Raw value for `key`, if the source defines it
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, treating blank strings as unset
    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.non_empty(key).unwrap_or_else(|| default.to_string())
    }
}

/// The current process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Variables parsed from a dotenv-style file
///
/// The file is parsed into memory; the process environment is never modified.
#[derive(Debug, Clone, Default)]
pub struct DotenvFile {
    vars: HashMap<String, String>,
}

impl DotenvFile {
    /// Parse `path`, failing if it is missing or malformed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let override_err = |details: String| ConfigError::OverrideFile {
            path: path.display().to_string(),
            details,
        };

        let iter = dotenv::from_path_iter(path).map_err(|e| override_err(e.to_string()))?;
        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| override_err(e.to_string()))?;
            vars.insert(key, value);
        }

        ::tracing::debug!(path = %path.display(), keys = vars.len(), "Loaded override file");

        Ok(Self { vars })
    }

    /// Parse `path` if it exists, otherwise return an empty source
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl ConfigSource for DotenvFile {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Ordered stack of sources; the first one defining a key wins
#[derive(Default)]
pub struct Layered {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Layered {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process environment on top of an optional override file
    pub fn env_with_override(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new()
            .with(ProcessEnv)
            .with(DotenvFile::load_optional(path)?))
    }

    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ConfigSource for Layered {
    fn get(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.get(key))
    }
}
