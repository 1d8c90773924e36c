// src/persona/mod.rs
// Persona text lookup keyed by role identifier.
// Lookups never fail: unknown roles fall back to the default persona.

pub mod default;

pub use default::{DEFAULT_PERSONA_PROMPT, DEFAULT_ROLE};

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ChatError, Result};

/// Source of persona instruction text
#[async_trait]
pub trait PersonaProvider: Send + Sync {
    /// Persona text for `role`, falling back to the default persona
    async fn load(&self, role: &str) -> String;
}

/// Normalise a caller-supplied role into a lookup key.
///
/// Blank roles map to `default`. Anything outside `[a-z0-9_-]` after
/// lower-casing cannot name a persona file and is also mapped to `default`.
pub fn normalize_role(role: &str) -> String {
    let safe = role.trim().to_lowercase();
    if safe.is_empty() {
        return DEFAULT_ROLE.to_string();
    }
    let valid = safe
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        safe
    } else {
        debug!(role = %role, "Role name not usable as persona key, using default");
        DEFAULT_ROLE.to_string()
    }
}

/// Reads `<dir>/<role>.md`, then `<dir>/default.md`, then the built-in text
#[derive(Debug, Clone)]
pub struct FsPersonaProvider {
    dir: PathBuf,
}

impl FsPersonaProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_persona(&self, key: &str) -> Result<String> {
        let path = self.dir.join(format!("{}.md", key));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ChatError::PersonaNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PersonaProvider for FsPersonaProvider {
    async fn load(&self, role: &str) -> String {
        let key = normalize_role(role);
        let mut candidates = vec![key.as_str()];
        if key != DEFAULT_ROLE {
            candidates.push(DEFAULT_ROLE);
        }

        for name in candidates {
            match self.read_persona(name).await {
                Ok(text) => return text,
                Err(e) => debug!(persona = %name, error = %e, "Persona lookup missed"),
            }
        }
        DEFAULT_PERSONA_PROMPT.to_string()
    }
}

/// In-memory personas, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticPersonaProvider {
    personas: HashMap<String, String>,
}

impl StaticPersonaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persona(mut self, role: &str, text: impl Into<String>) -> Self {
        self.personas.insert(normalize_role(role), text.into());
        self
    }
}

#[async_trait]
impl PersonaProvider for StaticPersonaProvider {
    async fn load(&self, role: &str) -> String {
        let key = normalize_role(role);
        self.personas
            .get(&key)
            .or_else(|| self.personas.get(DEFAULT_ROLE))
            .cloned()
            .unwrap_or_else(|| DEFAULT_PERSONA_PROMPT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn persona_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(name), text).unwrap();
        }
        dir
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role("  Einstein "), "einstein");
        assert_eq!(normalize_role(""), "default");
        assert_eq!(normalize_role("   "), "default");
        assert_eq!(normalize_role("harry_potter-2"), "harry_potter-2");
        assert_eq!(normalize_role("../etc/passwd"), "default");
    }

    #[tokio::test]
    async fn test_loads_role_file() {
        let dir = persona_dir(&[
            ("einstein.md", "You are Albert Einstein."),
            ("default.md", "Default persona."),
        ]);
        let provider = FsPersonaProvider::new(dir.path());
        assert_eq!(provider.load("Einstein").await, "You are Albert Einstein.");
    }

    #[tokio::test]
    async fn test_unknown_role_uses_default_file() {
        let dir = persona_dir(&[("default.md", "Default persona.")]);
        let provider = FsPersonaProvider::new(dir.path());
        assert_eq!(provider.load("nobody").await, "Default persona.");
    }

    #[tokio::test]
    async fn test_missing_dir_uses_builtin() {
        let dir = TempDir::new().unwrap();
        let provider = FsPersonaProvider::new(dir.path().join("missing"));
        assert_eq!(provider.load("einstein").await, DEFAULT_PERSONA_PROMPT);
    }

    #[tokio::test]
    async fn test_static_provider_fallbacks() {
        let provider = StaticPersonaProvider::new().with_persona("harry", "You are Harry.");
        assert_eq!(provider.load("HARRY").await, "You are Harry.");
        assert_eq!(provider.load("hermione").await, DEFAULT_PERSONA_PROMPT);

        let provider = provider.with_persona("default", "Fallback.");
        assert_eq!(provider.load("hermione").await, "Fallback.");
    }
}
