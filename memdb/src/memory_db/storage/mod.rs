// FICHIER : memdb/src/memory_db/storage/mod.rs

pub mod file_storage;
pub mod sync;

use crate::utils::env;
use crate::utils::json;
use crate::utils::prelude::*;
use crate::utils::Duration;
use std::path::PathBuf;

pub use file_storage::{FileBackend, SnapshotBackend};
pub use sync::PersistenceSync;

// --- CONFIGURATION ---

pub const ENV_FILE: &str = "MEMDB_FILE";
pub const ENV_COALESCE_MS: &str = "MEMDB_COALESCE_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDbConfig {
    /// Fichier snapshot. `None` = moteur purement en mémoire.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Fenêtre de regroupement des écritures après la première demande.
    #[serde(default, with = "millis")]
    pub coalesce_window: Duration,
}

impl MemoryDbConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    /// Surcharge par variables d'environnement (`MEMDB_FILE`, `MEMDB_COALESCE_MS`).
    pub fn from_env() -> RaiseResult<Self> {
        let mut cfg = Self::default();
        if let Some(file) = env::get_optional(ENV_FILE) {
            cfg.file = Some(PathBuf::from(file));
        }
        if let Some(ms) = env::get_parsed::<u64>(ENV_COALESCE_MS)? {
            cfg.coalesce_window = Duration::from_millis(ms);
        }
        Ok(cfg)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// --- SNAPSHOT (format disque) ---

/// `{ "ids": {collection: compteur}, "models": {collection: {id: "<json>"}} }`
/// Les documents restent des chaînes JSON : décoder puis ré-encoder un
/// fichier inchangé redonne exactement les mêmes octets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub ids: IndexMap<String, u64>,
    #[serde(default)]
    pub models: IndexMap<String, IndexMap<String, String>>,
}

impl Snapshot {
    pub fn decode(content: &str) -> RaiseResult<Self> {
        json::parse(content)
    }

    pub fn encode(&self) -> RaiseResult<String> {
        json::stringify_pretty(self)
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.models.get(collection).map_or(0, |m| m.len())
    }
}
