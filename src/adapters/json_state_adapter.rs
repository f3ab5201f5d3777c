//! JSON file state adapter.
//!
//! The whole bot document lives in one pretty-printed JSON file. Writes go to
//! a sibling temp file first and are renamed over the target, so a crash
//! mid-write leaves the previous document intact.

use crate::domain::error::AltdipError;
use crate::domain::state::BotState;
use crate::ports::state_port::StatePort;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileStateAdapter {
    path: PathBuf,
}

impl JsonFileStateAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatePort for JsonFileStateAdapter {
    fn load(&self) -> Result<Option<BotState>, AltdipError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = BotState::from_json(&text).map_err(|e| AltdipError::StateCorrupt {
            reason: format!("{}: {}", self.path.display(), e),
        })?;
        debug!(path = %self.path.display(), "loaded bot state");
        Ok(Some(state))
    }

    fn save(&self, state: &BotState) -> Result<(), AltdipError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = state.to_json()?;
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            operation = %state.operation.operation,
            "saved bot state"
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), AltdipError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
