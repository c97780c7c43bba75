//! # Notes Store
//!
//! The optimistic mutation coordinator. [`NoteStore`] owns the only
//! in-memory cache of notes and templates; every other component reads
//! derived views or calls the store's operations — nothing else mutates
//! the cache.
//!
//! ## Optimistic apply, pessimistic rollback
//!
//! Every mutation follows one discipline, centralized in [`NoteStore::mutate`]:
//!
//! 1. Validate. `InvalidTransition`, `Validation`, and `NotFound` reject
//!    here, before the cache is touched — they never need rollback.
//! 2. Capture the pre-mutation snapshot of the affected entry.
//! 3. Apply the mutation to the cache immediately.
//! 4. Persist through the repository.
//! 5. On persistence failure, restore the exact snapshot from step 2 and
//!    surface the error.
//!
//! After any operation, cache and durable store agree on either the old
//! state or the new state — never a third, half-applied combination.
//!
//! ## Ordering
//!
//! Mutations on the *same* note id are serialized through a per-id lock:
//! a second save for an id (the editor's autosave flushing while a manual
//! save is in flight) waits for the first to settle, so a stale write can
//! never clobber a fresh one. Operations on different ids proceed
//! independently and may persist in any relative order.
//!
//! Cache mutation never spans a suspension point; the only awaits are the
//! repository calls.
//!
//! ## Read views
//!
//! `active_notes` (pinned first, then recency), `archived_notes`, and
//! `trashed_notes` are filtered projections recomputed from the cache on
//! each call. Locked notes appear with content, history, and attachment
//! payloads withheld until the session verifies their passcode.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result, ValidationError};
use crate::export::{self, ExportFormat};
use crate::lifecycle::{self, Membership};
use crate::lock;
use crate::model::{BlockDocument, CustomTemplate, FileAttachment, Note};
use crate::repo::NoteRepository;
use crate::storage::StorageAdapter;

/// Partial update for a note's document fields. Unset fields are left
/// untouched; a content change appends a version snapshot first.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<BlockDocument>,
    pub icon: Option<String>,
    pub is_anonymous: Option<bool>,
}

/// Outcome of a bulk operation. Each note is processed independently;
/// one failure never stops the rest.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, EngineError)>,
}

impl BulkReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct NoteStore<A: StorageAdapter> {
    repo: NoteRepository<A>,
    config: EngineConfig,
    notes: RwLock<HashMap<Uuid, Note>>,
    templates: RwLock<Vec<CustomTemplate>>,
    /// Ids whose passcode this session has verified.
    unlocked: RwLock<HashSet<Uuid>>,
    entry_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl<A: StorageAdapter> NoteStore<A> {
    pub fn new(adapter: A, config: EngineConfig) -> Self {
        Self {
            repo: NoteRepository::new(adapter),
            config,
            notes: RwLock::new(HashMap::new()),
            templates: RwLock::new(Vec::new()),
            unlocked: RwLock::new(HashSet::new()),
            entry_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Hydrate the cache from the repository. Call once at startup.
    pub async fn load(&self) -> Result<()> {
        let notes = self.repo.list_notes().await?;
        let templates = self.repo.list_templates().await?;

        let mut cache = self.notes.write().unwrap();
        cache.clear();
        for note in notes {
            cache.insert(note.id, note);
        }
        drop(cache);

        *self.templates.write().unwrap() = templates;
        Ok(())
    }

    fn entry_lock(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        self.entry_locks
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// The one coordinator primitive every single-note mutation goes
    /// through: serialize per id, validate, snapshot, apply, persist,
    /// roll back on failure.
    async fn mutate<F>(&self, id: Uuid, apply: F) -> Result<Note>
    where
        F: FnOnce(&mut Note) -> Result<()>,
    {
        let entry = self.entry_lock(id);
        let _serialized = entry.lock().await;

        let before = self
            .notes
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;

        let mut after = before.clone();
        apply(&mut after)?;

        self.notes.write().unwrap().insert(id, after.clone());

        match self.repo.save_note(&after).await {
            Ok(()) => Ok(after),
            Err(err) => {
                self.notes.write().unwrap().insert(id, before);
                log::warn!("persist failed for note {}, cache rolled back: {}", id, err);
                Err(err)
            }
        }
    }

    async fn insert_new(&self, note: Note) -> Result<Note> {
        let id = note.id;
        let entry = self.entry_lock(id);
        let _serialized = entry.lock().await;

        self.notes.write().unwrap().insert(id, note.clone());

        match self.repo.save_note(&note).await {
            Ok(()) => Ok(note),
            Err(err) => {
                self.notes.write().unwrap().remove(&id);
                log::warn!("persist failed for new note {}, cache rolled back: {}", id, err);
                Err(err)
            }
        }
    }

    // --- Creation ---

    pub async fn create_note(
        &self,
        title: impl Into<String>,
        content: BlockDocument,
    ) -> Result<Note> {
        self.insert_new(Note::new(title.into(), content)).await
    }

    /// Create a new note seeded from a custom template. The note gets a
    /// fresh id and its own copy of the template's content.
    pub async fn create_note_from_template(&self, template_id: Uuid) -> Result<Note> {
        let template = self
            .templates
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == template_id)
            .cloned()
            .ok_or(EngineError::TemplateNotFound(template_id))?;

        let mut note = Note::new(template.title, template.content);
        note.icon = template.icon;
        self.insert_new(note).await
    }

    // --- Document mutations ---

    pub async fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        let cap = self.config.version_cap;
        self.mutate(id, move |note| {
            let mut changed = false;
            if let Some(title) = patch.title {
                if title != note.title {
                    note.title = title;
                    changed = true;
                }
            }
            if let Some(content) = patch.content {
                if content != note.content {
                    note.remember_version(cap);
                    note.content = content;
                    changed = true;
                }
            }
            if let Some(icon) = patch.icon {
                if icon != note.icon {
                    note.icon = icon;
                    changed = true;
                }
            }
            if let Some(anonymous) = patch.is_anonymous {
                if anonymous != note.is_anonymous {
                    note.is_anonymous = anonymous;
                    changed = true;
                }
            }
            if changed {
                note.touch();
            }
            Ok(())
        })
        .await
    }

    pub async fn add_tag(&self, id: Uuid, tag: &str) -> Result<Note> {
        let tag = tag.to_string();
        self.mutate(id, move |note| {
            if note.add_tag(&tag)? {
                note.touch();
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_tag(&self, id: Uuid, tag: &str) -> Result<Note> {
        let tag = tag.to_string();
        self.mutate(id, move |note| {
            if note.remove_tag(&tag) {
                note.touch();
            }
            Ok(())
        })
        .await
    }

    pub async fn set_icon(&self, id: Uuid, icon: impl Into<String>) -> Result<Note> {
        let icon = icon.into();
        self.mutate(id, move |note| {
            note.icon = icon;
            note.touch();
            Ok(())
        })
        .await
    }

    /// Pinning is only actionable while a note is Active; the flag is
    /// preserved but frozen in other states.
    pub async fn toggle_pin(&self, id: Uuid) -> Result<Note> {
        self.mutate(id, |note| {
            if note.membership != Membership::Active {
                return Err(EngineError::InvalidTransition {
                    op: "pin",
                    from: note.membership,
                });
            }
            note.is_pinned = !note.is_pinned;
            note.touch();
            Ok(())
        })
        .await
    }

    // --- Attachments ---

    pub async fn add_attachment(
        &self,
        id: Uuid,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<FileAttachment> {
        let attachment = FileAttachment::new(name.into(), mime_type.into(), data);
        let for_note = attachment.clone();
        self.mutate(id, move |note| {
            note.attachments.push(for_note);
            note.touch();
            Ok(())
        })
        .await?;
        Ok(attachment)
    }

    pub async fn remove_attachment(&self, id: Uuid, attachment_id: Uuid) -> Result<Note> {
        self.mutate(id, move |note| {
            let before = note.attachments.len();
            note.attachments.retain(|a| a.id != attachment_id);
            if note.attachments.len() == before {
                return Err(EngineError::AttachmentNotFound(attachment_id));
            }
            note.touch();
            Ok(())
        })
        .await
    }

    // --- Lifecycle ---
    //
    // Pure transitions never touch `updated_at`: moving a note between
    // views is not an edit.

    pub async fn archive_note(&self, id: Uuid) -> Result<Note> {
        self.mutate(id, |note| {
            note.membership = lifecycle::archive(note.membership)?;
            Ok(())
        })
        .await
    }

    pub async fn unarchive_note(&self, id: Uuid) -> Result<Note> {
        self.mutate(id, |note| {
            note.membership = lifecycle::unarchive(note.membership)?;
            Ok(())
        })
        .await
    }

    pub async fn trash_note(&self, id: Uuid) -> Result<Note> {
        self.mutate(id, |note| {
            let prior = lifecycle::trash(note.membership)?;
            note.membership = Membership::Trashed;
            note.prior_membership = Some(prior);
            note.trashed_at = Some(chrono::Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn restore_note(&self, id: Uuid) -> Result<Note> {
        self.mutate(id, |note| {
            note.membership = lifecycle::restore(note.membership, note.prior_membership)?;
            note.prior_membership = None;
            note.trashed_at = None;
            Ok(())
        })
        .await
    }

    /// Restore every trashed note to its own prior state. Notes are
    /// processed independently; failures are reported, not fatal.
    pub async fn restore_all_from_trash(&self) -> BulkReport {
        let ids = self.ids_in(Membership::Trashed);
        let mut report = BulkReport::default();
        for id in ids {
            match self.restore_note(id).await {
                Ok(_) => report.succeeded.push(id),
                Err(err) => report.failed.push((id, err)),
            }
        }
        report
    }

    /// Permanently delete a note: removed from the cache (and thereby
    /// every view) and from the repository, attachments and history
    /// included. Irreversible.
    pub async fn delete_note_permanently(&self, id: Uuid) -> Result<()> {
        let entry = self.entry_lock(id);
        let _serialized = entry.lock().await;

        let before = self
            .notes
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;

        self.notes.write().unwrap().remove(&id);

        match self.repo.delete_note(id).await {
            Ok(()) => {
                self.unlocked.write().unwrap().remove(&id);
                self.entry_locks.lock().unwrap().remove(&id);
                Ok(())
            }
            Err(err) => {
                self.notes.write().unwrap().insert(id, before);
                log::warn!("delete failed for note {}, cache rolled back: {}", id, err);
                Err(err)
            }
        }
    }

    /// Permanently delete every trashed note.
    pub async fn clear_trash(&self) -> BulkReport {
        let ids = self.ids_in(Membership::Trashed);
        let mut report = BulkReport::default();
        for id in ids {
            match self.delete_note_permanently(id).await {
                Ok(()) => report.succeeded.push(id),
                Err(err) => report.failed.push((id, err)),
            }
        }
        report
    }

    // --- Locking ---

    /// Set a passcode on a note. `code` must have the configured length,
    /// be all digits, and match `confirm`. Only a hash is stored. The
    /// setter's session counts as verified.
    pub async fn set_passcode(&self, id: Uuid, code: &str, confirm: &str) -> Result<()> {
        lock::validate_code(code, self.config.passcode_len)?;
        if code != confirm {
            return Err(ValidationError::PasscodeMismatch.into());
        }
        let hash = lock::hash_passcode(code)?;
        self.mutate(id, move |note| {
            note.is_locked = true;
            note.passcode_hash = Some(hash);
            note.touch();
            Ok(())
        })
        .await?;
        self.unlocked.write().unwrap().insert(id);
        Ok(())
    }

    /// Verify a candidate passcode. Returns `false` for both "wrong code"
    /// and "no passcode set". Success unlocks the note for this session.
    pub async fn verify_passcode(&self, id: Uuid, code: &str) -> Result<bool> {
        let hash = {
            let notes = self.notes.read().unwrap();
            let note = notes.get(&id).ok_or(EngineError::NotFound(id))?;
            note.passcode_hash.clone()
        };
        let ok = hash
            .as_deref()
            .map(|h| lock::verify_passcode(code, h))
            .unwrap_or(false);
        if ok {
            self.unlocked.write().unwrap().insert(id);
        }
        Ok(ok)
    }

    /// Remove a note's passcode. Requires a verified session.
    pub async fn clear_passcode(&self, id: Uuid) -> Result<Note> {
        self.ensure_unlocked(id)?;
        let note = self
            .mutate(id, |note| {
                note.is_locked = false;
                note.passcode_hash = None;
                note.touch();
                Ok(())
            })
            .await?;
        self.unlocked.write().unwrap().remove(&id);
        Ok(note)
    }

    /// Forget this session's verification for a note, hiding its content
    /// again without touching durable state.
    pub fn relock(&self, id: Uuid) {
        self.unlocked.write().unwrap().remove(&id);
    }

    fn is_unlocked(&self, note: &Note) -> bool {
        !note.is_locked || self.unlocked.read().unwrap().contains(&note.id)
    }

    fn ensure_unlocked(&self, id: Uuid) -> Result<()> {
        let notes = self.notes.read().unwrap();
        let note = notes.get(&id).ok_or(EngineError::NotFound(id))?;
        if note.is_locked && !self.unlocked.read().unwrap().contains(&id) {
            return Err(EngineError::Locked(id));
        }
        Ok(())
    }

    // --- Reads ---

    fn present(&self, note: &Note) -> Note {
        if self.is_unlocked(note) {
            note.clone()
        } else {
            note.redacted()
        }
    }

    fn ids_in(&self, membership: Membership) -> Vec<Uuid> {
        self.notes
            .read()
            .unwrap()
            .values()
            .filter(|n| n.membership == membership)
            .map(|n| n.id)
            .collect()
    }

    /// Active notes, pinned first, then most recently updated.
    pub fn active_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = {
            let cache = self.notes.read().unwrap();
            cache
                .values()
                .filter(|n| n.membership == Membership::Active)
                .map(|n| self.present(n))
                .collect()
        };
        notes.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        notes
    }

    /// Archived notes, most recently updated first.
    pub fn archived_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = {
            let cache = self.notes.read().unwrap();
            cache
                .values()
                .filter(|n| n.membership == Membership::Archived)
                .map(|n| self.present(n))
                .collect()
        };
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    /// Trashed notes, most recently trashed first.
    pub fn trashed_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = {
            let cache = self.notes.read().unwrap();
            cache
                .values()
                .filter(|n| n.membership == Membership::Trashed)
                .map(|n| self.present(n))
                .collect()
        };
        notes.sort_by(|a, b| b.trashed_at.cmp(&a.trashed_at));
        notes
    }

    /// A single note as the UI may see it (locked content withheld).
    pub fn get_note(&self, id: Uuid) -> Option<Note> {
        self.notes.read().unwrap().get(&id).map(|n| self.present(n))
    }

    /// A note with full content. Fails with `Locked` unless the note is
    /// unlocked or this session has verified its passcode.
    pub fn unlocked_note(&self, id: Uuid) -> Result<Note> {
        let notes = self.notes.read().unwrap();
        let note = notes.get(&id).ok_or(EngineError::NotFound(id))?;
        if !self.is_unlocked(note) {
            return Err(EngineError::Locked(id));
        }
        Ok(note.clone())
    }

    // --- Templates ---

    pub fn templates(&self) -> Vec<CustomTemplate> {
        self.templates.read().unwrap().clone()
    }

    /// Derive a reusable template from a note — a deep copy of its
    /// presentation fields at this moment. Locked notes must be verified
    /// first; a template is an unprotected copy of the content.
    pub async fn create_template_from_note(
        &self,
        id: Uuid,
        description: impl Into<String>,
    ) -> Result<CustomTemplate> {
        let source = self.unlocked_note(id)?;
        let template = CustomTemplate::from_note(&source, description.into());

        self.templates.write().unwrap().push(template.clone());

        match self.repo.save_template(&template).await {
            Ok(()) => Ok(template),
            Err(err) => {
                self.templates.write().unwrap().retain(|t| t.id != template.id);
                Err(err)
            }
        }
    }

    pub async fn delete_custom_template(&self, id: Uuid) -> Result<()> {
        let snapshot = self.templates.read().unwrap().clone();
        if !snapshot.iter().any(|t| t.id == id) {
            return Err(EngineError::TemplateNotFound(id));
        }

        self.templates.write().unwrap().retain(|t| t.id != id);

        match self.repo.delete_template(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                *self.templates.write().unwrap() = snapshot;
                Err(err)
            }
        }
    }

    // --- Export ---

    /// Render a note for the export collaborator. Refuses to hand off a
    /// locked note's content until this session has verified it.
    pub fn export_note(&self, id: Uuid, format: ExportFormat) -> Result<String> {
        let note = self.unlocked_note(id)?;
        export::render(&note, format)
    }
}
