//! Durable storage for the refresh token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{ClientError, Result};

/// Key-value slot holding the refresh token across process restarts
pub trait RefreshTokenPersistence: Send + Sync + 'static {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, refresh_token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local persistence, used when no token file is configured
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(refresh_token.into())),
        }
    }
}

impl RefreshTokenPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(refresh_token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRefreshToken {
    refresh_token: String,
    updated_at: DateTime<Utc>,
}

/// JSON file holding the refresh token
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RefreshTokenPersistence for FilePersistence {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Storage(format!("Failed to read token file: {e}")))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let stored: StoredRefreshToken = serde_json::from_str(&content)
            .map_err(|e| ClientError::Storage(format!("Failed to parse token file: {e}")))?;

        Ok(Some(stored.refresh_token))
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("Failed to create token directory: {e}"))
            })?;
        }

        let stored = StoredRefreshToken {
            refresh_token: refresh_token.to_string(),
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&stored)?;

        fs::write(&self.path, content)
            .map_err(|e| ClientError::Storage(format!("Failed to write token file: {e}")))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!("Failed to remove token file: {e}"))),
        }
    }
}
