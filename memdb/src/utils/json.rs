// FICHIER : memdb/src/utils/json.rs

use crate::utils::error::{AppError, RaiseResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

// --- RE-EXPORTS (Single Source of Truth pour le JSON) ---
pub use serde_json::{json, Map, Value};

/// Parse une chaîne JSON en un type T.
/// En cas d'échec, l'extrait fautif est tracé pour le débogage.
pub fn parse<T: DeserializeOwned>(s: &str) -> RaiseResult<T> {
    serde_json::from_str(s).map_err(|e| {
        let snippet: String = s.chars().take(100).collect();
        tracing::warn!(error = %e, snippet = %snippet, "JSON illisible");
        AppError::Serialization(e)
    })
}

/// Convertit un type T en chaîne JSON compacte.
pub fn stringify<T: Serialize>(v: &T) -> RaiseResult<String> {
    Ok(serde_json::to_string(v)?)
}

/// Convertit un type T en chaîne JSON formatée (indentation de 2 espaces).
pub fn stringify_pretty<T: Serialize>(v: &T) -> RaiseResult<String> {
    Ok(serde_json::to_string_pretty(v)?)
}

/// Fusion superficielle : chaque clé de `patch` écrase celle de `base`.
pub fn merge_shallow(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (k, v) in patch {
        base.insert(k.clone(), v.clone());
    }
}
