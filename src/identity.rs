//! Site identity: the store identifier sent with every heartbeat.
//!
//! Persisted as `{"loja_id": "<name>"}`. The first run with no file asks the
//! operator once; an empty answer is fatal because nothing can be reported
//! without it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::prompt::UserPrompt;

pub const PROMPT_TITLE: &str = "Initial setup";
pub const PROMPT_MESSAGE: &str = "Enter the store name:";

/// Opaque, non-empty store identifier. Immutable once created; clones share
/// the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteIdentity(Arc<str>);

impl SiteIdentity {
    /// `None` for blank input. Surrounding whitespace is dropped.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(Arc::from(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SiteIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk and on-wire shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub loja_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Store name is required; none was entered")]
    Missing,
    #[error("Identity file {} has an empty loja_id", .0.display())]
    Corrupt(PathBuf),
    #[error("Identity file I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Identity file parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, serde_json::Error),
}

/// Loads or bootstraps the identity file.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the persisted identity, or ask `prompt` once and persist the
    /// answer.
    pub fn load_or_create(&self, prompt: &dyn UserPrompt) -> Result<SiteIdentity, IdentityError> {
        if self.path.exists() {
            let identity = self.load()?;
            info!(path = %self.path.display(), loja_id = %identity, "Loaded site identity");
            return Ok(identity);
        }

        let answer = prompt
            .ask_string(PROMPT_TITLE, PROMPT_MESSAGE)
            .and_then(|raw| SiteIdentity::new(&raw))
            .ok_or(IdentityError::Missing)?;

        self.save(&answer)?;
        info!(path = %self.path.display(), loja_id = %answer, "Site identity created");
        Ok(answer)
    }

    fn load(&self) -> Result<SiteIdentity, IdentityError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| IdentityError::Io(self.path.clone(), e))?;
        let record: IdentityRecord = serde_json::from_str(&contents)
            .map_err(|e| IdentityError::Parse(self.path.clone(), e))?;
        SiteIdentity::new(&record.loja_id).ok_or_else(|| IdentityError::Corrupt(self.path.clone()))
    }

    fn save(&self, identity: &SiteIdentity) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| IdentityError::Io(self.path.clone(), e))?;
        }
        let record = IdentityRecord {
            loja_id: identity.as_str().to_string(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| IdentityError::Parse(self.path.clone(), e))?;
        std::fs::write(&self.path, json).map_err(|e| IdentityError::Io(self.path.clone(), e))
    }
}
