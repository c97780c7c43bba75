//! # Jotkeep Architecture
//!
//! Jotkeep is a **UI-agnostic note persistence and lifecycle engine**. The
//! editor chrome, dialogs, theming, and navigation that sit on top of it
//! are external collaborators; this crate owns every note's durable state
//! and nothing else.
//!
//! ## The Layer Stack
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  UI / editor / export collaborators (not in this crate)     │
//! │  - Call store operations, render the derived views          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Notes Store (store.rs)                                     │
//! │  - The only owner of the in-memory cache                    │
//! │  - Optimistic apply, rollback on persistence failure        │
//! │  - Derived views: active / archived / trashed               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Repository (repo.rs)                                       │
//! │  - Aggregate ⇄ keyed JSON records, schema tag + migration   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Adapter (storage/)                                 │
//! │  - Async get/set/remove/keys contract                       │
//! │  - FsAdapter (production), MemAdapter (fallback, testing)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure logic lives beside the stack: the lifecycle state machine
//! (`lifecycle.rs`) computes transitions without I/O, and passcode hashing
//! (`lock.rs`) never sees the cache.
//!
//! ## Key Principle: Failures Degrade, Never Corrupt
//!
//! Every mutation is applied to the cache first and persisted second. If
//! persistence fails, the cache is restored to its exact pre-mutation
//! state and the error surfaces to the caller. A failed operation means
//! "it did not happen" — the views and the durable store never disagree.
//!
//! ## Getting Started
//!
//! ```no_run
//! use jotkeep::{select_adapter, BlockDocument, EngineConfig, NoteStore};
//!
//! # async fn run() -> jotkeep::Result<()> {
//! let config = EngineConfig::default();
//! let store = NoteStore::new(select_adapter(&config), config);
//! store.load().await?;
//!
//! let note = store
//!     .create_note("Hello", BlockDocument::from_text("first note"))
//!     .await?;
//! store.add_tag(note.id, "inbox").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod repo;
pub mod storage;
pub mod store;

pub use config::EngineConfig;
pub use error::{EngineError, Result, ValidationError};
pub use export::ExportFormat;
pub use lifecycle::{Membership, PriorMembership};
pub use model::{
    BlockDocument, ContentBlock, CustomTemplate, FileAttachment, Note, VersionSnapshot, MAX_TAGS,
};
pub use repo::NoteRepository;
pub use storage::{select_adapter, FsAdapter, MemAdapter, StorageAdapter};
pub use store::{BulkReport, NotePatch, NoteStore};
