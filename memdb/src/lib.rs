// FICHIER : memdb/src/lib.rs

//! Moteur documentaire embarqué : collections en mémoire, requêtes façon
//! `where`/`order`, snapshot JSON unique synchronisé en tâche de fond.

pub mod memory_db;
pub mod utils;

pub use memory_db::{MemoryDb, MemoryDbConfig};
