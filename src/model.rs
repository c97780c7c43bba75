//! # Domain Model
//!
//! This module defines the aggregates the engine persists: [`Note`] (the
//! root), its owned [`FileAttachment`]s and [`VersionSnapshot`]s, and the
//! decoupled [`CustomTemplate`].
//!
//! ## Notes and lifecycle fields
//!
//! A note is always in exactly one [`Membership`] state. `prior_membership`
//! and `trashed_at` are set while (and only while) the note is trashed;
//! restoring clears both. `updated_at` moves forward on content and
//! metadata mutations but never on pure lifecycle moves, so archiving a
//! note does not shuffle recency ordering.
//!
//! ## Tags
//!
//! Tags are case-normalized to lowercase on entry, deduplicated, and capped
//! at [`MAX_TAGS`] per note. Empty or whitespace-only tags are rejected.
//! Adding a tag the note already carries is a no-op.
//!
//! ## Version history
//!
//! `versions` is a count-capped ring: when a content update replaces the
//! document, the outgoing content is appended as a snapshot and the oldest
//! entries are evicted past the cap. Snapshots are immutable value copies.
//!
//! ## Templates
//!
//! [`CustomTemplate::from_note`] takes a deep value copy of the source
//! note's presentation fields. The template holds no reference back; later
//! edits on either side never affect the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::lifecycle::{Membership, PriorMembership};

/// Maximum number of tags a single note may carry.
pub const MAX_TAGS: usize = 5;

/// One typed block of a note's structured document.
///
/// The engine stores, copies, and renders blocks; what a block *means* is
/// the editor's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph { text: String },
    Heading { level: u8, text: String },
    BulletItem { text: String },
    NumberedItem { text: String },
    Quote { text: String },
    Code { language: Option<String>, text: String },
    Divider,
}

impl ContentBlock {
    /// The block's text content, empty for structural blocks.
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Paragraph { text }
            | ContentBlock::Heading { text, .. }
            | ContentBlock::BulletItem { text }
            | ContentBlock::NumberedItem { text }
            | ContentBlock::Quote { text }
            | ContentBlock::Code { text, .. } => text,
            ContentBlock::Divider => "",
        }
    }
}

/// An ordered sequence of content blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockDocument {
    pub blocks: Vec<ContentBlock>,
}

impl BlockDocument {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    /// A single-paragraph document. Convenient for plain-text callers.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            blocks: vec![ContentBlock::Paragraph {
                text: text.to_string(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Flatten the document to plain text, one line per block.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(ContentBlock::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A file attached to a note. Owned exclusively by its note and removed
/// with it on permanent deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: Uuid,
    pub name: String,
    /// Payload size in bytes, derived from `data` at creation.
    pub size: u64,
    pub mime_type: String,
    /// Inline payload, base64-encoded in the serialized record.
    #[serde(with = "b64")]
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl FileAttachment {
    pub fn new(name: String, mime_type: String, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            size: data.len() as u64,
            mime_type,
            data,
            created_at: Utc::now(),
        }
    }
}

/// An immutable snapshot of a note's content at a past save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub content: BlockDocument,
    pub saved_at: DateTime<Utc>,
}

/// The note aggregate root.
///
/// Fields added after the first stored schema carry `#[serde(default)]` so
/// older records still deserialize; the repository handles the schema tag
/// and invariant repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: BlockDocument,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub passcode_hash: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub attachments: Vec<FileAttachment>,
    pub membership: Membership,
    #[serde(default)]
    pub prior_membership: Option<PriorMembership>,
    #[serde(default)]
    pub trashed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub versions: Vec<VersionSnapshot>,
}

impl Note {
    pub fn new(title: String, content: BlockDocument) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            tags: Vec::new(),
            icon: String::new(),
            is_pinned: false,
            is_locked: false,
            passcode_hash: None,
            is_anonymous: false,
            attachments: Vec::new(),
            membership: Membership::Active,
            prior_membership: None,
            trashed_at: None,
            created_at: now,
            updated_at: now,
            versions: Vec::new(),
        }
    }

    /// Bump `updated_at`, keeping it monotonically non-decreasing even if
    /// the wall clock steps backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }

    /// Add a tag, normalized to lowercase. Returns `Ok(true)` if the tag
    /// was added, `Ok(false)` if the note already carried it.
    pub fn add_tag(&mut self, raw: &str) -> Result<bool, ValidationError> {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag);
        }
        if self.tags.contains(&tag) {
            return Ok(false);
        }
        if self.tags.len() >= MAX_TAGS {
            return Err(ValidationError::TooManyTags(MAX_TAGS));
        }
        self.tags.push(tag);
        Ok(true)
    }

    /// Remove a tag. Returns whether the note carried it.
    pub fn remove_tag(&mut self, raw: &str) -> bool {
        let tag = raw.trim().to_lowercase();
        let before = self.tags.len();
        self.tags.retain(|t| t != &tag);
        self.tags.len() != before
    }

    /// Append the current content as a version snapshot, evicting the
    /// oldest entries past `cap`. Call before replacing the content.
    pub fn remember_version(&mut self, cap: usize) {
        self.versions.push(VersionSnapshot {
            content: self.content.clone(),
            saved_at: Utc::now(),
        });
        if self.versions.len() > cap {
            let overflow = self.versions.len() - cap;
            self.versions.drain(..overflow);
        }
    }

    /// A copy safe to hand to readers that have not verified this note's
    /// passcode: content, history, and attachment payloads are withheld.
    /// For unlocked notes this is a plain clone.
    pub fn redacted(&self) -> Note {
        if !self.is_locked {
            return self.clone();
        }
        Note {
            content: BlockDocument::default(),
            versions: Vec::new(),
            attachments: Vec::new(),
            ..self.clone()
        }
    }
}

/// A reusable template derived from a note.
///
/// Created by deep copy; never aliases the source note's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub content: BlockDocument,
    pub created_at: DateTime<Utc>,
}

impl CustomTemplate {
    /// Value-copy the note's presentation fields into a fresh template.
    pub fn from_note(note: &Note, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: note.title.clone(),
            description,
            icon: note.icon.clone(),
            content: note.content.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> Note {
        Note::new("Test".to_string(), BlockDocument::from_text("hello"))
    }

    #[test]
    fn new_note_is_active_with_matching_timestamps() {
        let n = note();
        assert_eq!(n.membership, Membership::Active);
        assert_eq!(n.created_at, n.updated_at);
        assert!(n.prior_membership.is_none());
        assert!(n.trashed_at.is_none());
    }

    #[test]
    fn add_tag_normalizes_case() {
        let mut n = note();
        assert!(n.add_tag("Work").unwrap());
        assert_eq!(n.tags, vec!["work"]);
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut n = note();
        assert!(n.add_tag("work").unwrap());
        assert!(!n.add_tag("WORK").unwrap());
        assert_eq!(n.tags.len(), 1);
    }

    #[test]
    fn add_tag_rejects_empty() {
        let mut n = note();
        assert_eq!(n.add_tag("   "), Err(ValidationError::EmptyTag));
    }

    #[test]
    fn add_tag_enforces_cap() {
        let mut n = note();
        for tag in ["a", "b", "c", "d", "e"] {
            n.add_tag(tag).unwrap();
        }
        assert_eq!(
            n.add_tag("f"),
            Err(ValidationError::TooManyTags(MAX_TAGS))
        );
        assert_eq!(n.tags.len(), MAX_TAGS);
    }

    #[test]
    fn duplicate_add_never_counts_against_cap() {
        let mut n = note();
        for _ in 0..20 {
            n.add_tag("same").unwrap();
        }
        assert_eq!(n.tags, vec!["same"]);
    }

    #[test]
    fn remove_tag_is_case_insensitive() {
        let mut n = note();
        n.add_tag("work").unwrap();
        assert!(n.remove_tag("Work"));
        assert!(!n.remove_tag("work"));
        assert!(n.tags.is_empty());
    }

    #[test]
    fn remember_version_evicts_oldest() {
        let mut n = note();
        for i in 0..5 {
            n.content = BlockDocument::from_text(&format!("v{}", i));
            n.remember_version(3);
        }
        assert_eq!(n.versions.len(), 3);
        // Oldest surviving snapshot is v2, newest is v4
        assert_eq!(n.versions[0].content.plain_text(), "v2");
        assert_eq!(n.versions[2].content.plain_text(), "v4");
    }

    #[test]
    fn touch_is_monotonic() {
        let mut n = note();
        let before = n.updated_at;
        n.touch();
        assert!(n.updated_at >= before);
    }

    #[test]
    fn redacted_withholds_content_for_locked_notes() {
        let mut n = note();
        n.attachments
            .push(FileAttachment::new("a.png".into(), "image/png".into(), vec![1, 2]));
        n.remember_version(10);
        n.is_locked = true;
        n.passcode_hash = Some("$argon2id$stub".to_string());

        let redacted = n.redacted();
        assert!(redacted.content.is_empty());
        assert!(redacted.versions.is_empty());
        assert!(redacted.attachments.is_empty());
        assert_eq!(redacted.title, n.title);
        assert!(redacted.is_locked);
    }

    #[test]
    fn redacted_is_identity_for_unlocked_notes() {
        let n = note();
        assert_eq!(n.redacted(), n);
    }

    #[test]
    fn attachment_size_derived_from_payload() {
        let att = FileAttachment::new("doc.pdf".into(), "application/pdf".into(), vec![0u8; 42]);
        assert_eq!(att.size, 42);
    }

    #[test]
    fn attachment_payload_roundtrips_as_base64() {
        let att = FileAttachment::new("bin".into(), "application/octet-stream".into(), vec![0, 255, 7]);
        let json = serde_json::to_string(&att).unwrap();
        assert!(json.contains("\"data\":\"AP8H\""));
        let loaded: FileAttachment = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.data, vec![0, 255, 7]);
    }

    #[test]
    fn template_is_a_value_copy() {
        let mut n = note();
        n.icon = "📌".to_string();
        let tpl = CustomTemplate::from_note(&n, "Meeting notes".to_string());
        assert_eq!(tpl.title, "Test");
        assert_eq!(tpl.icon, "📌");
        assert_ne!(tpl.id, n.id);

        // Mutating the note must not reach the template
        n.title = "Changed".to_string();
        n.content = BlockDocument::from_text("changed");
        assert_eq!(tpl.title, "Test");
        assert_eq!(tpl.content.plain_text(), "hello");
    }

    #[test]
    fn legacy_note_without_new_fields_deserializes() {
        let id = Uuid::new_v4();
        // Record shape before attachments, lock, and prior-state tracking
        let json = format!(
            r#"{{
            "id": "{}",
            "title": "Legacy",
            "membership": "Active",
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2023-01-02T00:00:00Z"
        }}"#,
            id
        );

        let loaded: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.id, id);
        assert!(loaded.content.is_empty());
        assert!(loaded.attachments.is_empty());
        assert!(!loaded.is_locked);
        assert!(loaded.prior_membership.is_none());
    }

    #[test]
    fn content_block_tagging_roundtrips() {
        let doc = BlockDocument::new(vec![
            ContentBlock::Heading {
                level: 1,
                text: "Title".into(),
            },
            ContentBlock::Divider,
            ContentBlock::Code {
                language: Some("rust".into()),
                text: "fn main() {}".into(),
            },
        ]);
        let json = serde_json::to_string(&doc).unwrap();
        let loaded: BlockDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, doc);
    }
}
