//! Dialog persistence: the load/save contract and two implementations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use super::normalize::dialog_from_value;
use crate::error::{ParleyError, Result};
use crate::types::id::{self, DIALOG_ID_PREFIX};
use crate::types::Dialog;

/// Storage abstraction for dialogs. Every save replaces the stored dialog.
pub trait DialogStore: Send + Sync {
    fn list(&self) -> Result<Vec<Dialog>>;
    fn load(&self, id: &str) -> Result<Option<Dialog>>;
    fn save(&self, dialog: &Dialog) -> Result<()>;
    /// Returns whether a dialog was removed.
    fn remove(&self, id: &str) -> Result<bool>;
}

/// One pretty-printed JSON file per dialog under `base_dir`.
///
/// Files are written to a temporary sibling and renamed into place, so a
/// reader never sees a partially written dialog.
#[derive(Debug, Clone)]
pub struct FileDialogStore {
    base_dir: PathBuf,
}

impl FileDialogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn dialog_path(&self, dialog_id: &str) -> Result<PathBuf> {
        if !id::is_canonical(DIALOG_ID_PREFIX, dialog_id) {
            return Err(ParleyError::InvalidArgument(format!(
                "invalid dialog id: {dialog_id}"
            )));
        }
        Ok(self.base_dir.join(format!("{dialog_id}.json")))
    }

    /// The file name is authoritative for the dialog id, so a file whose
    /// `id` field is missing or disagrees still loads, saves and deletes
    /// under the name it is stored as.
    fn read(path: &Path) -> Result<Option<Dialog>> {
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| id::is_canonical(DIALOG_ID_PREFIX, stem));
        let mut dialog = dialog_from_value(&value, stem);
        if let Some(stem) = stem {
            dialog.id = stem.to_string();
        }
        Ok(Some(dialog))
    }
}

impl DialogStore for FileDialogStore {
    fn list(&self) -> Result<Vec<Dialog>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut dialogs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(Some(dialog)) => dialogs.push(dialog),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable dialog"
                    );
                }
            }
        }
        Ok(dialogs)
    }

    fn load(&self, id: &str) -> Result<Option<Dialog>> {
        let Ok(path) = self.dialog_path(id) else {
            return Ok(None);
        };
        Self::read(&path)
    }

    fn save(&self, dialog: &Dialog) -> Result<()> {
        let path = self.dialog_path(&dialog.id)?;
        fs::create_dir_all(&self.base_dir)?;
        let serialized = serde_json::to_string_pretty(dialog)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(dialog_id = %dialog.id, messages = dialog.messages.len(), "dialog saved");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let Ok(path) = self.dialog_path(id) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store, shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryDialogStore {
    dialogs: Arc<RwLock<HashMap<String, Dialog>>>,
}

impl MemoryDialogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DialogStore for MemoryDialogStore {
    fn list(&self) -> Result<Vec<Dialog>> {
        Ok(self
            .dialogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }

    fn load(&self, id: &str) -> Result<Option<Dialog>> {
        Ok(self
            .dialogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    fn save(&self, dialog: &Dialog) -> Result<()> {
        self.dialogs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dialog.id.clone(), dialog.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self
            .dialogs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some())
    }
}
