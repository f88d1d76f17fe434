// FICHIER : memdb/src/utils/mod.rs

// =========================================================================
//  RAISE MEMDB UTILS - Foundation Layer
// =========================================================================

pub mod env;
pub mod error;
pub mod fs;
pub mod json;
pub mod logger;

/// **Data Abstraction** : Manipulation JSON.
pub mod data {
    pub use super::json::{json, merge_shallow, parse, stringify, stringify_pretty, Map, Value};
    pub use indexmap::IndexMap;
    pub use serde::{Deserialize, Serialize};
}

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::data::{json, Deserialize, IndexMap, Map, Serialize, Value};
    pub use super::error::{AppError, RaiseResult};
    pub use tracing::{debug, error, info, instrument, warn};
}

// --> Config & Erreurs
pub use error::{AppError, RaiseResult};
pub use logger::init_logging;

// --> Async Runtime & Sync
pub use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use tokio::sync::{mpsc, oneshot};

// --> Macros externes
pub use async_trait::async_trait;

// --> Collections & Types
pub use std::cmp::Ordering;
pub use std::time::Duration;
