// FICHIER : memdb/src/utils/error.rs

use serde::Serialize;
use std::io;

// --- RE-EXPORTS ANYHOW ---
pub use anyhow::{anyhow, Context};

// --- GESTION D'ERREUR STRICTE ---

/// Type de résultat standard du moteur mémoire.
pub type RaiseResult<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs du moteur.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Identifiant déjà utilisé : {collection}.id = {id}")]
    DuplicateId { collection: String, id: String },

    #[error("Identifiant invalide : {0}")]
    InvalidId(String),

    #[error("Opérande invalide pour '{operator}' : {reason}")]
    InvalidOperand { operator: String, reason: String },

    #[error("Filtre invalide : {0}")]
    InvalidFilter(String),

    #[error("Tri invalide : {0}")]
    MalformedOrderSpec(String),

    #[error("Introuvable : {0}")]
    NotFound(String),

    #[error("Échec d'écriture du snapshot : {0}")]
    PersistenceWriteFailure(String),

    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur Base de Données : {0}")]
    Database(String),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_operand(operator: &str, reason: impl Into<String>) -> Self {
        AppError::InvalidOperand {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }
}

// Les erreurs remontent vers la couche modèle sous forme de simple chaîne.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
