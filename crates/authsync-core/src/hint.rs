//! Persisted "probably signed in" hint.
//!
//! The hint lets a host pre-render the signed-in chrome before the first
//! probe answers. It is never consulted for access decisions.

use authsync_config::CoreResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Last settled answer, as remembered across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHint {
    pub probably_signed_in: bool,
    pub updated_at: DateTime<Utc>,
}

impl AuthHint {
    pub fn new(probably_signed_in: bool) -> Self {
        Self {
            probably_signed_in,
            updated_at: Utc::now(),
        }
    }
}

/// Storage for the hint.
pub trait HintStore: Send + Sync {
    fn load(&self) -> CoreResult<Option<AuthHint>>;
    fn store(&self, hint: AuthHint) -> CoreResult<()>;
}

/// JSON file store (`~/.authsync/auth-hint.json`).
#[derive(Debug, Clone)]
pub struct FileHintStore {
    path: PathBuf,
}

impl FileHintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HintStore for FileHintStore {
    fn load(&self) -> CoreResult<Option<AuthHint>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn store(&self, hint: AuthHint) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&hint)?)?;
        Ok(())
    }
}

/// In-memory store for hosts without a writable home directory.
#[derive(Debug, Default)]
pub struct MemoryHintStore {
    hint: Mutex<Option<AuthHint>>,
}

impl MemoryHintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HintStore for MemoryHintStore {
    fn load(&self) -> CoreResult<Option<AuthHint>> {
        Ok(*self.hint.lock())
    }

    fn store(&self, hint: AuthHint) -> CoreResult<()> {
        *self.hint.lock() = Some(hint);
        Ok(())
    }
}
