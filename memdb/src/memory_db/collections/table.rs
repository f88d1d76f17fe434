// FICHIER : memdb/src/memory_db/collections/table.rs

//! Table d'enregistrements d'une collection : clé d'id -> document sérialisé.
//! La forme texte est la représentation de référence (c'est elle qui part sur disque).

use crate::utils::json;
use crate::utils::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    records: IndexMap<String, String>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_serialized(records: IndexMap<String, String>) -> Self {
        Self { records }
    }

    pub fn serialized(&self) -> &IndexMap<String, String> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insère ou remplace le document (une clé existante garde sa position).
    pub fn put(&mut self, key: String, document: &Value) -> RaiseResult<()> {
        let body = json::stringify(document)?;
        self.records.insert(key, body);
        Ok(())
    }

    pub fn get(&self, key: &str) -> RaiseResult<Option<Value>> {
        match self.records.get(key) {
            Some(body) => Ok(Some(json::parse(body)?)),
            None => Ok(None),
        }
    }

    /// Retire le document en conservant l'ordre des autres.
    pub fn remove(&mut self, key: &str) -> bool {
        self.records.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    /// Tous les documents désérialisés, dans l'ordre de la table.
    pub fn entries(&self) -> RaiseResult<Vec<(String, Value)>> {
        self.records
            .iter()
            .map(|(k, body)| Ok((k.clone(), json::parse(body)?)))
            .collect()
    }

    pub fn documents(&self) -> RaiseResult<Vec<Value>> {
        self.records.values().map(|body| json::parse(body)).collect()
    }
}
