// FICHIER : memdb/src/memory_db/collections/mod.rs

//! Collections en mémoire : tables d'enregistrements + compteurs d'ids.

use crate::memory_db::storage::Snapshot;
use crate::utils::prelude::*;

pub mod ids;
pub mod manager;
pub mod table;

pub use ids::{id_key, IdGenerator};
pub use table::RecordTable;

/// État complet d'une instance : la seule source de vérité en mémoire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pub ids: IdGenerator,
    pub models: IndexMap<String, RecordTable>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Déclare la collection (table vide + compteur) si elle n'existe pas.
    pub fn define(&mut self, collection: &str) -> &mut RecordTable {
        self.ids.ensure(collection);
        self.models.entry(collection.to_string()).or_default()
    }

    pub fn table(&self, collection: &str) -> Option<&RecordTable> {
        self.models.get(collection)
    }

    pub fn table_mut(&mut self, collection: &str) -> Option<&mut RecordTable> {
        self.models.get_mut(collection)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Reconstruit l'état depuis un snapshot disque.
    /// Les clés numériques déjà présentes sont observées par le générateur.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut ids = IdGenerator::from_counters(snapshot.ids);
        let mut models = IndexMap::with_capacity(snapshot.models.len());

        for (name, records) in snapshot.models {
            for key in records.keys() {
                ids.observe(&name, &Value::String(key.clone()));
            }
            models.insert(name, RecordTable::from_serialized(records));
        }

        Self { ids, models }
    }

    /// Copie figée de l'état, prête à être encodée.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            ids: self.ids.counters().clone(),
            models: self
                .models
                .iter()
                .map(|(name, table)| (name.clone(), table.serialized().clone()))
                .collect(),
        }
    }
}
