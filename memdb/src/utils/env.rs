// FICHIER : memdb/src/utils/env.rs

use crate::utils::error::{AppError, RaiseResult};
use std::env;
use std::str::FromStr;

/// Récupère une variable d'environnement (Optionnel).
/// Une valeur vide est traitée comme absente.
pub fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Récupère et parse une variable optionnelle (ex: MEMDB_COALESCE_MS=20).
pub fn get_parsed<T: FromStr>(key: &str) -> RaiseResult<Option<T>> {
    match get_optional(key) {
        None => Ok(None),
        Some(val) => val.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::Config(format!("Impossible de parser la variable : {}", key))
        }),
    }
}
