//! Dialog lifecycle on top of a [`DialogStore`].

use std::sync::Arc;

use chrono::Utc;

use super::normalize::normalize_dialog;
use super::ops;
use super::store::DialogStore;
use crate::error::{ParleyError, Result};
use crate::types::id::{self, DIALOG_ID_PREFIX};
use crate::types::{Dialog, DialogSummary, DEFAULT_DIALOG_TITLE};

/// Result of deleting a dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogDeletion {
    /// Remaining dialogs, most recently updated first.
    pub dialogs: Vec<DialogSummary>,
    /// The dialog to show next; created if none remain.
    pub active: Dialog,
}

/// Lists, creates, edits and persists dialogs.
#[derive(Clone)]
pub struct DialogManager {
    store: Arc<dyn DialogStore>,
}

impl DialogManager {
    pub fn new(store: Arc<dyn DialogStore>) -> Self {
        Self { store }
    }

    /// Summaries of every stored dialog, most recently updated first.
    pub fn list(&self) -> Result<Vec<DialogSummary>> {
        let mut dialogs = self.store.list()?;
        dialogs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(dialogs.iter().map(Dialog::summary).collect())
    }

    pub fn get(&self, dialog_id: &str) -> Result<Option<Dialog>> {
        match id::canonicalize(DIALOG_ID_PREFIX, dialog_id) {
            Some(dialog_id) => self.store.load(&dialog_id),
            None => Ok(None),
        }
    }

    fn require(&self, dialog_id: &str) -> Result<Dialog> {
        self.get(dialog_id)?
            .ok_or_else(|| ParleyError::NotFound(format!("dialog {dialog_id}")))
    }

    /// The preferred dialog if it exists, else the most recently updated
    /// standalone dialog, else a freshly created and persisted one.
    pub fn get_active_dialog(&self, preferred_id: Option<&str>) -> Result<Dialog> {
        if let Some(preferred) = preferred_id {
            if let Some(dialog) = self.get(preferred)? {
                return Ok(dialog);
            }
        }

        let latest = self
            .store
            .list()?
            .into_iter()
            .filter(Dialog::is_standalone)
            .max_by_key(|dialog| dialog.updated_at);
        match latest {
            Some(dialog) => Ok(dialog),
            None => self.create(None),
        }
    }

    /// Create and persist an empty dialog.
    pub fn create(&self, title: Option<&str>) -> Result<Dialog> {
        let dialog = Dialog::new(title.unwrap_or(DEFAULT_DIALOG_TITLE));
        let dialog = self.save_snapshot(&dialog)?;
        tracing::info!(dialog_id = %dialog.id, "dialog created");
        Ok(dialog)
    }

    pub fn rename(&self, dialog_id: &str, title: &str) -> Result<Dialog> {
        let mut dialog = self.require(dialog_id)?;
        dialog.title = title.to_string();
        self.save_snapshot(&dialog)
    }

    /// Delete a dialog and pick the next active one.
    pub fn delete(&self, dialog_id: &str) -> Result<DialogDeletion> {
        let removed = match id::canonicalize(DIALOG_ID_PREFIX, dialog_id) {
            Some(dialog_id) => self.store.remove(&dialog_id)?,
            None => false,
        };
        if removed {
            tracing::info!(dialog_id, "dialog deleted");
        }
        let active = self.get_active_dialog(None)?;
        Ok(DialogDeletion {
            dialogs: self.list()?,
            active,
        })
    }

    /// Normalize `dialog`, stamp `updated_at`, and persist it as a full
    /// replacement of the stored copy.
    pub fn save_snapshot(&self, dialog: &Dialog) -> Result<Dialog> {
        let mut snapshot = normalize_dialog(dialog);
        snapshot.updated_at = Utc::now();
        self.store.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Delete one message (with its cascade) and persist.
    pub fn delete_message(&self, dialog_id: &str, message_id: &str) -> Result<Dialog> {
        let dialog = self.require(dialog_id)?;
        self.save_snapshot(&ops::delete_message(&dialog, message_id))
    }

    /// Truncate from one message and persist.
    pub fn truncate_from_message(&self, dialog_id: &str, message_id: &str) -> Result<Dialog> {
        let dialog = self.require(dialog_id)?;
        self.save_snapshot(&ops::truncate_from_message(&dialog, message_id))
    }
}

impl std::fmt::Debug for DialogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::MemoryDialogStore;
    use crate::types::Message;
    use chrono::Duration;

    fn manager() -> (MemoryDialogStore, DialogManager) {
        let store = MemoryDialogStore::new();
        let manager = DialogManager::new(Arc::new(store.clone()));
        (store, manager)
    }

    fn stored(store: &MemoryDialogStore, title: &str, age_minutes: i64) -> Dialog {
        let mut dialog = Dialog::new(title);
        dialog.updated_at = Utc::now() - Duration::minutes(age_minutes);
        store.save(&dialog).unwrap();
        dialog
    }

    #[test]
    fn active_dialog_is_created_when_store_is_empty() {
        let (store, manager) = manager();
        let active = manager.get_active_dialog(None).unwrap();
        assert_eq!(active.title, DEFAULT_DIALOG_TITLE);
        assert_eq!(store.load(&active.id).unwrap(), Some(active));
    }

    #[test]
    fn preferred_dialog_wins_when_present() {
        let (store, manager) = manager();
        let old = stored(&store, "old", 60);
        stored(&store, "new", 1);
        assert_eq!(manager.get_active_dialog(Some(&old.id)).unwrap().id, old.id);
    }

    #[test]
    fn falls_back_to_latest_standalone_dialog() {
        let (store, manager) = manager();
        stored(&store, "older", 30);
        let latest = stored(&store, "latest", 5);
        let mut project = Dialog::new("project");
        project.for_project_id = Some("prj_1".into());
        store.save(&project).unwrap();

        let active = manager.get_active_dialog(Some("dlg_gone")).unwrap();

        assert_eq!(active.id, latest.id);
    }

    #[test]
    fn snapshot_normalizes_and_stamps() {
        let (store, manager) = manager();
        let mut dialog = stored(&store, "  ", 60);
        let before = dialog.updated_at;
        dialog.messages.push(Message::user("hi"));

        let saved = manager.save_snapshot(&dialog).unwrap();

        assert_eq!(saved.title, DEFAULT_DIALOG_TITLE);
        assert!(saved.updated_at > before);
        assert_eq!(store.load(&dialog.id).unwrap().unwrap().messages.len(), 1);
    }

    #[test]
    fn list_is_sorted_by_recency_with_previews() {
        let (store, manager) = manager();
        stored(&store, "a", 10);
        let mut b = stored(&store, "b", 1);
        b.messages.push(Message::user("x".repeat(100)));
        store.save(&b).unwrap();

        let list = manager.list().unwrap();

        assert_eq!(list[0].title, "b");
        assert_eq!(list[0].preview.chars().count(), 80);
        assert_eq!(list[1].preview, "");
    }

    #[test]
    fn delete_returns_remaining_list_and_new_active() {
        let (store, manager) = manager();
        let only = stored(&store, "only", 1);

        let outcome = manager.delete(&only.id).unwrap();

        assert_ne!(outcome.active.id, only.id);
        assert_eq!(outcome.dialogs.len(), 1);
        assert_eq!(outcome.dialogs[0].id, outcome.active.id);
    }

    #[test]
    fn rename_missing_dialog_is_not_found() {
        let (_store, manager) = manager();
        assert!(matches!(
            manager.rename("dlg_nope", "x"),
            Err(ParleyError::NotFound(_))
        ));
    }

    #[test]
    fn rename_persists_title() {
        let (store, manager) = manager();
        let dialog = stored(&store, "old", 5);
        manager.rename(&dialog.id, "Road trip").unwrap();
        assert_eq!(store.load(&dialog.id).unwrap().unwrap().title, "Road trip");
    }
}
