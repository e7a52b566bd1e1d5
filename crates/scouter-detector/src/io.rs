//! JSON helpers for detector configuration files.

use std::{fs, path::Path};

use crate::{DetectorConfig, DetectorConfigError};

impl DetectorConfig {
    /// Load a JSON config from disk. The result is not validated yet.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DetectorConfigError> {
        let path = path.as_ref();
        log::debug!("loading detector config from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DetectorConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
