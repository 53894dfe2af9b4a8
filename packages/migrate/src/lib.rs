//! # migrate — move personal movie notes out of shared documents
//!
//! One-shot reshaping of a document store where user-specific annotations used
//! to live in the wrong place:
//!
//! - Shared Items (`movies/{id}`) carried `rating`, `review`, `favorite`,
//!   `watched` and `wantToWatch`, which are per-user data.
//! - User Records (`users/{uid}`) carried an embedded `movies` array of those
//!   annotations.
//!
//! After a run, Shared Items hold no personal fields and every annotation lives
//! in its own Personal Note at `users/{uid}/my_movies/{id}`.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`migration`] | [`Migration::run`], the read → strip → relocate sequence, and its [`MigrationReport`] |
//! | [`strip`] | Personal-Field Stripper: plans field deletions on Shared Items |
//! | [`relocate`] | Note Relocator: embedded pass and the opt-in legacy broadcast pass |
//! | [`notes`] | Personal field names and Personal Note defaults |
//! | [`settings`] | Layered config (`migrate.toml` + `MIGRATE__*` env) |
//! | [`error`] | [`MigrateError`] |
//! | [`logging`] | `tracing-subscriber` setup for the binary |
//!
//! The store itself (paths, documents, write ops, chunked batches and backends)
//! comes from the `store` crate.

pub mod error;
pub mod logging;
pub mod migration;
pub mod notes;
pub mod relocate;
pub mod settings;
pub mod strip;

pub use error::{MigrateError, Phase};
pub use migration::{Migration, MigrationReport};
pub use settings::{Backend, Layout, Settings};
