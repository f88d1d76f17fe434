// FICHIER : memdb/src/memory_db/collections/ids.rs

//! Générateur d'identifiants par collection.
//! Le compteur stocké est le *prochain* id auto à émettre (démarre à 1).

use crate::utils::prelude::*;

/// Clé de stockage d'un id : sa forme texte (`5` et `"5"` désignent le même document).
pub fn id_key(id: &Value) -> RaiseResult<String> {
    match id {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        // Un flottant entier prend la même clé que l'entier correspondant
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => {
                Ok((f as u64).to_string())
            }
            Some(f) if f.fract() == 0.0 && f < 0.0 && f >= i64::MIN as f64 => {
                Ok((f as i64).to_string())
            }
            _ => Err(AppError::InvalidId(n.to_string())),
        },
        other => Err(AppError::InvalidId(other.to_string())),
    }
}

/// Valeur entière portée par un id, s'il en a une.
fn integral_value(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdGenerator {
    counters: IndexMap<String, u64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counters(counters: IndexMap<String, u64>) -> Self {
        Self { counters }
    }

    pub fn counters(&self) -> &IndexMap<String, u64> {
        &self.counters
    }

    /// Enregistre la collection avec un compteur à 1 si elle est inconnue.
    pub fn ensure(&mut self, collection: &str) {
        if !self.counters.contains_key(collection) {
            self.counters.insert(collection.to_string(), 1);
        }
    }

    /// Prochain id auto-incrémenté (avance le compteur).
    /// Échoue quand le compteur est épuisé au lieu de reboucler.
    pub fn next_id(&mut self, collection: &str) -> RaiseResult<u64> {
        let counter = self.counters.entry(collection.to_string()).or_insert(1);
        let id = *counter;
        *counter = id.checked_add(1).ok_or_else(|| {
            AppError::InvalidId(format!("compteur d'ids épuisé pour '{}'", collection))
        })?;
        Ok(id)
    }

    /// Prend connaissance d'un id fourni par l'appelant ou lu depuis le disque :
    /// les ids auto suivants seront strictement supérieurs.
    pub fn observe(&mut self, collection: &str, id: &Value) {
        let counter = self.counters.entry(collection.to_string()).or_insert(1);
        if let Some(n) = integral_value(id) {
            if n >= *counter {
                *counter = n.saturating_add(1);
            }
        }
    }

    pub fn current(&self, collection: &str) -> Option<u64> {
        self.counters.get(collection).copied()
    }
}
