//! # Storage Layer
//!
//! One file per entity key plus one registry file, all written through the
//! same atomic temp-file-and-rename path.
//!
//! ## On-disk layout
//!
//! ```text
//! <root>/
//! ├── users.json                   # account registry (RegistryStore)
//! ├── data/
//! │   ├── <key>.json               # one Record per entity (DocumentStore)
//! │   └── <key>.json.corrupt.bak   # quarantined files, never auto-deleted
//! └── backups/
//!     ├── prestart_<ts>.tar.gz     # pre-start archives (integrity check)
//!     └── export_<ts>.tar.gz       # on-demand full exports
//! ```
//!
//! ## Concurrency discipline
//!
//! - [`DocumentStore`] keeps a lock per entity key; a read-modify-write
//!   cycle through [`DocumentStore::with_entity`] holds that lock for the
//!   whole span, so same-key cycles never interleave and distinct keys
//!   never wait on each other.
//! - [`RegistryStore`] is effectively a single entity and carries one lock
//!   of its own.
//!
//! No cross-key transactions exist, and none are needed: every operation
//! touches exactly one file.

pub mod atomic;
pub mod document;
pub mod registry;

pub use atomic::write_atomic;
pub use document::{DocumentStore, EnsureOutcome};
pub use registry::{Account, RegistryStore};
