//! # Settings
//!
//! Layered configuration, lowest priority first:
//!
//! 1. built-in defaults (see [`Settings::default`]);
//! 2. an optional `migrate.toml` in the working directory;
//! 3. environment variables prefixed `MIGRATE`, nested with `__`
//!    (`MIGRATE__MIGRATION__CHUNK_SIZE=100`, `MIGRATE__FIRESTORE__ACCESS_TOKEN=...`).
//!
//! ```toml
//! [store]
//! backend = "firestore"      # or "file"
//! path = "./data"            # file backend only
//!
//! [firestore]
//! project_id = "my-project"
//! emulator_host = "localhost:8080"
//!
//! [collections]
//! items = "movies"
//! users = "users"
//! notes = "my_movies"
//! embedded_field = "movies"
//!
//! [migration]
//! chunk_size = 500
//! legacy_broadcast = false
//! dry_run = false
//! ```

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use store::{CollectionPath, FirestoreConfig, MAX_BATCH_SIZE};

use crate::error::MigrateError;

pub const CONFIG_FILE: &str = "migrate.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Firestore,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StoreSettings {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            path: PathBuf::from("./data"),
        }
    }
}

/// Where Shared Items, User Records and Personal Notes live.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CollectionSettings {
    pub items: String,
    pub users: String,
    /// Per-user subcollection holding Personal Notes.
    pub notes: String,
    /// Legacy array field on User Records.
    pub embedded_field: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            items: "movies".into(),
            users: "users".into(),
            notes: "my_movies".into(),
            embedded_field: "movies".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MigrationSettings {
    pub chunk_size: usize,
    /// Copy personal values left on Shared Items to every user.
    pub legacy_broadcast: bool,
    pub dry_run: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            chunk_size: MAX_BATCH_SIZE,
            legacy_broadcast: false,
            dry_run: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    #[serde(default)]
    pub firestore: FirestoreConfig,
    pub collections: CollectionSettings,
    pub migration: MigrationSettings,
}

/// Resolved collection paths.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub items: CollectionPath,
    pub users: CollectionPath,
    pub notes: String,
    pub embedded_field: String,
}

impl Settings {
    /// Load from `migrate.toml` (if present) and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file(Path::new(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let config = Config::builder()
            .set_default("store.backend", "file")?
            .set_default("store.path", defaults.store.path.to_string_lossy().into_owned())?
            .set_default("firestore.database", defaults.firestore.database)?
            .set_default("collections.items", defaults.collections.items)?
            .set_default("collections.users", defaults.collections.users)?
            .set_default("collections.notes", defaults.collections.notes)?
            .set_default("collections.embedded_field", defaults.collections.embedded_field)?
            .set_default("migration.chunk_size", defaults.migration.chunk_size as u64)?
            .set_default("migration.legacy_broadcast", defaults.migration.legacy_broadcast)?
            .set_default("migration.dry_run", defaults.migration.dry_run)?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("MIGRATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the migration cannot run with.
    pub fn validate(&self) -> Result<(), MigrateError> {
        let chunk = self.migration.chunk_size;
        if chunk == 0 || chunk > MAX_BATCH_SIZE {
            return Err(MigrateError::InvalidSettings(format!(
                "migration.chunk_size must be between 1 and {MAX_BATCH_SIZE}, got {chunk}"
            )));
        }
        if self.store.backend == Backend::Firestore && self.firestore.project_id.is_empty() {
            return Err(MigrateError::InvalidSettings(
                "firestore.project_id is required for the firestore backend".into(),
            ));
        }
        if self.collections.embedded_field.is_empty() {
            return Err(MigrateError::InvalidSettings(
                "collections.embedded_field must not be empty".into(),
            ));
        }
        self.collections.layout().map(|_| ())
    }
}

impl CollectionSettings {
    pub fn layout(&self) -> Result<Layout, MigrateError> {
        let invalid = |name: &str, value: &str| {
            MigrateError::InvalidSettings(format!("collections.{name} is not a valid id: {value:?}"))
        };
        let items = CollectionPath::root(&self.items).map_err(|_| invalid("items", &self.items))?;
        let users = CollectionPath::root(&self.users).map_err(|_| invalid("users", &self.users))?;
        if self.notes.is_empty() || self.notes.contains('/') {
            return Err(invalid("notes", &self.notes));
        }
        Ok(Layout {
            items,
            users,
            notes: self.notes.clone(),
            embedded_field: self.embedded_field.clone(),
        })
    }
}
