//! # Character Store
//!
//! Saved characters live one per file as `<sanitized name>.json`.

use super::sanitize_file_stem;
use crate::{AdmissionError, CharacterSheet, TacticaError, TacticaResult};
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CharacterStore {
    dir: PathBuf,
}

impl CharacterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a character name, or `None` when nothing usable is left after
    /// sanitizing.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let stem = sanitize_file_stem(name);
        if stem.is_empty() {
            return None;
        }
        Some(self.dir.join(format!("{}.json", stem)))
    }

    /// Loads the character a connecting client selected.
    ///
    /// Errors map one to one onto the messages sent back before the connection is
    /// closed.
    pub fn load(&self, selection: &str) -> Result<CharacterSheet, AdmissionError> {
        let path = self
            .path_for(selection)
            .ok_or(AdmissionError::CharacterNotFound)?;
        if !path.is_file() {
            return Err(AdmissionError::CharacterNotFound);
        }

        let text = fs::read_to_string(&path).map_err(|e| {
            warn!("Failed to read {}: {}", path.display(), e);
            AdmissionError::Unreadable
        })?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse {}: {}", path.display(), e);
            AdmissionError::Unreadable
        })?;
        let sheet: CharacterSheet =
            serde_json::from_value(value).map_err(|_| AdmissionError::InvalidCharacter)?;
        if !sheet.is_complete() {
            return Err(AdmissionError::InvalidCharacter);
        }
        Ok(sheet)
    }

    /// Saves a new character. An existing file with the same sanitized name is
    /// never overwritten.
    pub fn save(&self, sheet: &CharacterSheet) -> TacticaResult<PathBuf> {
        if !sheet.is_complete() {
            return Err(TacticaError::InvalidState(
                "Invalid character data".to_string(),
            ));
        }
        let path = self
            .path_for(&sheet.name)
            .ok_or_else(|| TacticaError::InvalidState("Invalid character name".to_string()))?;

        fs::create_dir_all(&self.dir)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TacticaError::CharacterExists(sheet.name.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(serde_json::to_string_pretty(sheet)?.as_bytes())?;
        debug!("Saved character {} to {}", sheet.name, path.display());
        Ok(path)
    }

    /// Every readable character, ordered by file name. Unparsable files are
    /// skipped with a warning.
    pub fn list(&self) -> TacticaResult<Vec<CharacterSheet>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut sheets = Vec::new();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(TacticaError::from)
                .and_then(|text| Ok(serde_json::from_str::<CharacterSheet>(&text)?));
            match parsed {
                Ok(sheet) => sheets.push(sheet),
                Err(e) => warn!("Skipping character file {}: {}", path.display(), e),
            }
        }
        Ok(sheets)
    }
}
