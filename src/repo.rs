//! # Note Repository
//!
//! Translates the [`Note`] and [`CustomTemplate`] aggregates to and from
//! serialized records stored under stable keys via the [`StorageAdapter`].
//!
//! ## Persisted layout
//!
//! One JSON record per aggregate:
//!
//! ```text
//! note:{uuid}      → { "schema": 2, ...note fields... }
//! template:{uuid}  → { "schema": 2, ...template fields... }
//! ```
//!
//! The whole aggregate lives in one record — attachments and version
//! history included — so deleting the record is the cascade.
//!
//! ## Schema versioning
//!
//! Records carry an explicit `schema` tag. Version-1 records predate
//! attachments, locking, and prior-state tracking; their missing fields
//! deserialize to defaults and [`migrate_note`] repairs the lifecycle
//! invariants on read. Records newer than this build are refused rather
//! than silently misread.
//!
//! ## Error policy
//!
//! Adapter failures pass through unchanged. The repository performs no
//! retries; retry policy, if any, belongs to the notes store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::lifecycle::{Membership, PriorMembership};
use crate::model::{CustomTemplate, Note};
use crate::storage::StorageAdapter;

/// Current record schema version.
pub const SCHEMA_VERSION: u32 = 2;

const NOTE_PREFIX: &str = "note:";
const TEMPLATE_PREFIX: &str = "template:";

#[derive(Serialize)]
struct RecordRef<'a, T: Serialize> {
    schema: u32,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Deserialize)]
struct Record<T> {
    #[serde(default)]
    schema: u32,
    #[serde(flatten)]
    body: T,
}

pub struct NoteRepository<A: StorageAdapter> {
    adapter: A,
}

impl<A: StorageAdapter> NoteRepository<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    fn note_key(id: Uuid) -> String {
        format!("{}{}", NOTE_PREFIX, id)
    }

    fn template_key(id: Uuid) -> String {
        format!("{}{}", TEMPLATE_PREFIX, id)
    }

    fn encode<T: Serialize>(body: &T) -> Result<String> {
        Ok(serde_json::to_string(&RecordRef {
            schema: SCHEMA_VERSION,
            body,
        })?)
    }

    fn decode_note(raw: &str) -> Result<Note> {
        let record: Record<Note> = serde_json::from_str(raw)?;
        if record.schema > SCHEMA_VERSION {
            return Err(EngineError::Persistence(format!(
                "record schema {} is newer than supported {}",
                record.schema, SCHEMA_VERSION
            )));
        }
        Ok(migrate_note(record.schema, record.body))
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Option<Note>> {
        match self.adapter.get(&Self::note_key(id)).await? {
            Some(raw) => Ok(Some(Self::decode_note(&raw)?)),
            None => Ok(None),
        }
    }

    /// Create or fully overwrite a note record.
    pub async fn save_note(&self, note: &Note) -> Result<()> {
        let raw = Self::encode(note)?;
        self.adapter.set(&Self::note_key(note.id), &raw).await
    }

    /// Hard delete. The record owns the attachments and version history,
    /// so removing it removes them.
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.adapter.remove(&Self::note_key(id)).await
    }

    /// Load every stored note, all membership states. Undecodable records
    /// are skipped with a warning rather than failing the whole load.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let keys = self.adapter.keys(NOTE_PREFIX).await?;
        let mut notes = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.adapter.get(&key).await? else {
                continue;
            };
            match Self::decode_note(&raw) {
                Ok(note) => notes.push(note),
                Err(e) => log::warn!("skipping undecodable record {}: {}", key, e),
            }
        }
        Ok(notes)
    }

    pub async fn save_template(&self, template: &CustomTemplate) -> Result<()> {
        let raw = Self::encode(template)?;
        self.adapter
            .set(&Self::template_key(template.id), &raw)
            .await
    }

    pub async fn delete_template(&self, id: Uuid) -> Result<()> {
        self.adapter.remove(&Self::template_key(id)).await
    }

    pub async fn list_templates(&self) -> Result<Vec<CustomTemplate>> {
        let keys = self.adapter.keys(TEMPLATE_PREFIX).await?;
        let mut templates = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.adapter.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Record<CustomTemplate>>(&raw) {
                Ok(record) => templates.push(record.body),
                Err(e) => log::warn!("skipping undecodable record {}: {}", key, e),
            }
        }
        Ok(templates)
    }
}

/// Repair lifecycle invariants on records from older schemas.
fn migrate_note(schema: u32, mut note: Note) -> Note {
    if schema < 2 {
        // v1 had no prior-state tracking; trashed notes restore to Active.
        if note.membership == Membership::Trashed {
            if note.prior_membership.is_none() {
                note.prior_membership = Some(PriorMembership::Active);
            }
            if note.trashed_at.is_none() {
                note.trashed_at = Some(note.updated_at);
            }
        }
    }
    // Regardless of schema: prior state is defined iff trashed.
    if note.membership != Membership::Trashed {
        note.prior_membership = None;
        note.trashed_at = None;
    }
    note
}
