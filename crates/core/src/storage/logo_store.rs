use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::cache::CacheEntry;

/// Resolved logo URLs keyed by cache key (`token_logo:{chain}:{address}`).
pub type LogoEntries = HashMap<String, CacheEntry<String>>;

/// Durable tier of the logo cache.
///
/// Loaded once when the logo service starts and written back after a preload.
pub trait LogoStore: Send + Sync {
    fn load(&self) -> Result<LogoEntries, CoreError>;
    fn save(&self, entries: &LogoEntries) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// On-disk record: `{ "url": "...", "timestamp": <unix ms> }`.
#[derive(Serialize, Deserialize)]
struct StoredLogo {
    url: String,
    timestamp: i64,
}

/// Logo store backed by a single JSON object file.
///
/// Format: `{ "<key>": { "url": "...", "timestamp": 1700000000000 } }`
pub struct JsonFileLogoStore {
    path: PathBuf,
}

impl JsonFileLogoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogoStore for JsonFileLogoStore {
    /// A missing file is an empty cache, not an error.
    fn load(&self) -> Result<LogoEntries, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LogoEntries::new()),
            Err(e) => return Err(e.into()),
        };

        let stored: HashMap<String, StoredLogo> = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Deserialization(format!(
                "Corrupt logo cache at {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(stored
            .into_iter()
            .filter_map(|(key, logo)| {
                let timestamp = DateTime::from_timestamp_millis(logo.timestamp)?;
                Some((key, CacheEntry::new(logo.url, timestamp)))
            })
            .collect())
    }

    fn save(&self, entries: &LogoEntries) -> Result<(), CoreError> {
        // BTreeMap keeps the file diff-friendly
        let stored: BTreeMap<&str, StoredLogo> = entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.as_str(),
                    StoredLogo {
                        url: entry.payload.clone(),
                        timestamp: entry.timestamp.timestamp_millis(),
                    },
                )
            })
            .collect();

        let json = serde_json::to_string(&stored)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize logo cache: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local logo store, used when no cache path is configured.
#[derive(Default)]
pub struct MemoryLogoStore {
    entries: Mutex<LogoEntries>,
}

impl MemoryLogoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-populated set of entries.
    pub fn with_entries(entries: LogoEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl LogoStore for MemoryLogoStore {
    fn load(&self) -> Result<LogoEntries, CoreError> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, entries: &LogoEntries) -> Result<(), CoreError> {
        *self.entries.lock().unwrap_or_else(|e| e.into_inner()) = entries.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}
