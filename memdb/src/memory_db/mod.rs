// FICHIER : memdb/src/memory_db/mod.rs

pub mod collections;
pub mod query;
pub mod storage;

pub use collections::manager::MemoryDb;
pub use storage::MemoryDbConfig;
