//! # Notevault Architecture
//!
//! Notevault is the storage core of a per-user notes service: a flat-file,
//! JSON-backed document store that survives concurrent access, process
//! crashes, and evolving data shapes. It is a **UI-agnostic library** — the
//! chat transport, command dispatch, and auth logic are callers, not
//! residents.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Caller (bot command layer, not in this crate)              │
//! │  - Renders results, owns the conversation                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Lifecycle Layer (lifecycle.rs)                             │
//! │  - Pure mutations on a decoded Record                       │
//! │  - add / update / favorite / soft-delete / restore / purge  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/, backup.rs, integrity.rs)            │
//! │  - DocumentStore: one file per entity, per-key locking      │
//! │  - RegistryStore: the shared account registry               │
//! │  - BackupManager / integrity: archives, restore, sweeps     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Codec + Migration (codec.rs, migrate.rs)                   │
//! │  - Stable pretty JSON, versioned upgrade steps              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The contract in one paragraph
//!
//! Every persisted file is replaced atomically (temp file + rename), so a
//! crash leaves either the old or the new content and never a torn file.
//! Records carry a schema version; old files are upgraded in place by
//! explicit, idempotent migration steps on first touch, and files that do
//! not decode at all are quarantined rather than destroyed. Same-key
//! read-modify-write cycles are serialized through a per-key lock; distinct
//! keys run in parallel. At process start, [`integrity::run`] archives the
//! whole store and refuses to proceed if anything fails to decode.
//!
//! ## Typical caller flow
//!
//! ```no_run
//! use notevault::{config::VaultPaths, integrity, lifecycle, store::DocumentStore};
//!
//! # fn main() -> notevault::Result<()> {
//! let paths = VaultPaths::resolve()?;
//! integrity::run(&paths)?; // before serving anything
//!
//! let store = DocumentStore::open(paths.data_dir)?;
//! store.with_entity("6065778458", |record| {
//!     lifecycle::add_section(record, "Groceries".into(), None, "milk, eggs".into());
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`model`]: `Record`, `Section`, settings, current schema version
//! - [`codec`]: stable JSON encode/decode
//! - [`migrate`]: ordered, versioned upgrade steps
//! - [`lifecycle`]: pure record mutations
//! - [`store`]: atomic writes, the document store, the registry
//! - [`backup`]: per-entity snapshots, full exports, validated restore
//! - [`integrity`]: pre-start archive and decode sweep
//! - [`config`]: on-disk layout
//! - [`error`]: error types

pub mod backup;
pub mod codec;
pub mod config;
pub mod error;
pub mod integrity;
pub mod lifecycle;
pub mod migrate;
pub mod model;
pub mod store;

pub use error::{Result, VaultError};
pub use model::{Record, Section, Settings, Theme, SCHEMA_VERSION};
