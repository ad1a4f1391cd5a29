//! Persisted key-value settings. The only key in use is the home page.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ImportError;

/// Last browsed URL, reopened at startup.
pub const HOME_PAGE_KEY: &str = "web_home_page";

pub trait SettingsStore: Send {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), ImportError>;
}

/// Settings kept only for the life of the process.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), ImportError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// On-disk layout: one flat JSON object of string values.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct SettingsFile {
    values: BTreeMap<String, String>,
}

/// Settings stored as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    file: SettingsFile,
}

impl JsonFileSettings {
    /// A missing file starts empty, and so does an unreadable one (logged).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<SettingsFile>(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                SettingsFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SettingsFile::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read settings file");
                SettingsFile::default()
            }
        };
        Self { path, file }
    }

    fn save(&self) -> Result<(), ImportError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ImportError::Settings(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&self.file)
            .map_err(|e| ImportError::Settings(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(|e| ImportError::Settings(e.to_string()))
    }
}

impl SettingsStore for JsonFileSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.file.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), ImportError> {
        if self.file.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.file.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}
