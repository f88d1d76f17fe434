// FICHIER : memdb/src/memory_db/collections/manager.rs

use crate::memory_db::collections::{id_key, Store};
use crate::memory_db::query::{
    parse_filter, parse_where, PatternCache, Query, QueryEngine, QueryFilter, QueryResult,
};
use crate::memory_db::storage::{
    FileBackend, MemoryDbConfig, PersistenceSync, Snapshot, SnapshotBackend,
};
use crate::utils::data::merge_shallow;
use crate::utils::prelude::*;
use crate::utils::{Arc, Duration, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Point d'entrée du moteur. Clonable à bas coût : tous les clones partagent
/// le même état et la même tâche d'écriture.
#[derive(Clone)]
pub struct MemoryDb {
    store: Arc<RwLock<Store>>,
    sync: Option<PersistenceSync>,
    patterns: PatternCache,
}

impl std::fmt::Debug for MemoryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDb")
            .field("target", &self.sync.as_ref().map(|s| s.target().to_string()))
            .finish()
    }
}

impl MemoryDb {
    // --- CONSTRUCTION ---

    /// Charge le snapshot configuré (s'il existe) puis démarre la synchronisation.
    pub async fn open(config: MemoryDbConfig) -> RaiseResult<Self> {
        match config.file {
            Some(path) => {
                let backend: Arc<dyn SnapshotBackend> = Arc::new(FileBackend::new(path));
                Self::with_backend(backend, config.coalesce_window).await
            }
            None => Ok(Self::in_memory()),
        }
    }

    /// Moteur sans persistance.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::new())),
            sync: None,
            patterns: PatternCache::default(),
        }
    }

    pub async fn with_backend(
        backend: Arc<dyn SnapshotBackend>,
        coalesce_window: Duration,
    ) -> RaiseResult<Self> {
        let store = match backend.load().await? {
            Some(content) => {
                let snapshot = Snapshot::decode(&content)?;
                let store = Store::from_snapshot(snapshot);
                info!(
                    backend = %backend.describe(),
                    collections = store.models.len(),
                    "📂 Snapshot chargé"
                );
                store
            }
            None => {
                info!(backend = %backend.describe(), "Aucun snapshot : démarrage à vide");
                Store::new()
            }
        };

        let store = Arc::new(RwLock::new(store));
        let sync = PersistenceSync::spawn(Arc::clone(&store), backend, coalesce_window);
        Ok(Self {
            store,
            sync: Some(sync),
            patterns: PatternCache::default(),
        })
    }

    // --- VERROUS & PERSISTANCE ---

    fn read_store(&self) -> RaiseResult<RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|_| AppError::Database("verrou du store empoisonné".into()))
    }

    fn write_store(&self) -> RaiseResult<RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|_| AppError::Database("verrou du store empoisonné".into()))
    }

    /// Attend que l'état courant soit écrit. Sans fichier : immédiat.
    pub async fn flush(&self) -> RaiseResult<()> {
        match &self.sync {
            Some(sync) => sync.flush().await,
            None => Ok(()),
        }
    }

    /// Nombre d'écritures réussies du snapshot (`None` sans persistance).
    pub fn persisted_writes(&self) -> Option<u64> {
        self.sync.as_ref().map(|s| s.stats().writes())
    }

    fn where_filter(&self, clause: Option<&Value>) -> RaiseResult<Option<QueryFilter>> {
        match clause {
            None | Some(Value::Null) => Ok(None),
            Some(c) => {
                let filter = parse_where(c, &self.patterns)?;
                Ok((!filter.is_empty()).then_some(filter))
            }
        }
    }

    // --- ÉCRITURES ---

    /// Insère un document ; l'id vient de `data.id` ou du compteur de la collection.
    #[instrument(skip(self, data))]
    pub async fn create(&self, collection: &str, data: Value) -> RaiseResult<Value> {
        let body = into_object(data)?;
        let id = {
            let mut store = self.write_store()?;
            insert_new(&mut store, collection, body)?
        };
        debug!(%id, "Document créé");
        self.flush().await?;
        Ok(id)
    }

    /// Remplace entièrement le document si `data.id` existe, sinon le crée.
    #[instrument(skip(self, data))]
    pub async fn update_or_create(&self, collection: &str, data: Value) -> RaiseResult<Value> {
        let mut body = into_object(data)?;
        let stored = {
            let mut store = self.write_store()?;
            let existing = match body.get("id").filter(|v| !v.is_null()) {
                Some(id) => {
                    let key = id_key(id)?;
                    store
                        .table(collection)
                        .is_some_and(|t| t.contains(&key))
                        .then_some(key)
                }
                None => None,
            };

            match existing {
                Some(key) => {
                    let table = store.define(collection);
                    // L'id stocké garde sa forme d'origine ("1" ne remplace pas 1)
                    if let Some(id) = table.get(&key)?.and_then(|d| d.get("id").cloned()) {
                        body.insert("id".into(), id);
                    }
                    let doc = Value::Object(body);
                    table.put(key, &doc)?;
                    doc
                }
                None => {
                    let id = insert_new(&mut store, collection, body.clone())?;
                    body.insert("id".into(), id);
                    Value::Object(body)
                }
            }
        };
        debug!(id = %stored["id"], "Document enregistré (upsert)");
        self.flush().await?;
        Ok(stored)
    }

    pub async fn upsert(&self, collection: &str, data: Value) -> RaiseResult<Value> {
        self.update_or_create(collection, data).await
    }

    /// Fusion superficielle de `data` dans le document ; l'id ne change pas.
    #[instrument(skip(self, data))]
    pub async fn update_attributes(
        &self,
        collection: &str,
        id: &Value,
        data: Value,
    ) -> RaiseResult<Value> {
        let key = id_key(id)?;
        let patch = into_object(data)?;
        let merged = {
            let mut store = self.write_store()?;
            let table = store
                .table_mut(collection)
                .ok_or_else(|| AppError::NotFound(format!("{}.id = {}", collection, key)))?;
            let current = table
                .get(&key)?
                .ok_or_else(|| AppError::NotFound(format!("{}.id = {}", collection, key)))?;
            let merged = merge_record(current, &patch);
            table.put(key, &merged)?;
            merged
        };
        self.flush().await?;
        Ok(merged)
    }

    /// Fusionne `data` dans chaque document correspondant ; retourne le nombre modifié.
    #[instrument(skip(self, where_clause, data))]
    pub async fn update_all(
        &self,
        collection: &str,
        where_clause: Option<&Value>,
        data: Value,
    ) -> RaiseResult<usize> {
        let filter = self.where_filter(where_clause)?;
        let patch = into_object(data)?;
        let updated = {
            let mut store = self.write_store()?;
            let keys = QueryEngine::new(&store).matching_keys(collection, filter.as_ref())?;
            if let Some(table) = store.table_mut(collection) {
                for key in &keys {
                    if let Some(current) = table.get(key)? {
                        table.put(key.clone(), &merge_record(current, &patch))?;
                    }
                }
            }
            keys.len()
        };
        debug!(updated, "Mise à jour groupée");
        if updated > 0 {
            self.flush().await?;
        }
        Ok(updated)
    }

    /// Supprime par id ; retourne 1 si le document existait, 0 sinon.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, collection: &str, id: &Value) -> RaiseResult<usize> {
        let key = id_key(id)?;
        let removed = {
            let mut store = self.write_store()?;
            store
                .table_mut(collection)
                .is_some_and(|table| table.remove(&key))
        };
        if !removed {
            return Ok(0);
        }
        self.flush().await?;
        Ok(1)
    }

    /// Vide la collection. Le compteur d'ids est conservé.
    #[instrument(skip(self))]
    pub async fn destroy_all(&self, collection: &str) -> RaiseResult<usize> {
        let removed = {
            let mut store = self.write_store()?;
            match store.table_mut(collection) {
                Some(table) => {
                    let n = table.len();
                    table.clear();
                    n
                }
                None => 0,
            }
        };
        debug!(removed, "Collection vidée");
        self.flush().await?;
        Ok(removed)
    }

    #[instrument(skip(self, where_clause))]
    pub async fn destroy_all_where(
        &self,
        collection: &str,
        where_clause: &Value,
    ) -> RaiseResult<usize> {
        let Some(filter) = self.where_filter(Some(where_clause))? else {
            return self.destroy_all(collection).await;
        };
        let removed = {
            let mut store = self.write_store()?;
            let keys = QueryEngine::new(&store).matching_keys(collection, Some(&filter))?;
            if let Some(table) = store.table_mut(collection) {
                for key in &keys {
                    table.remove(key);
                }
            }
            keys.len()
        };
        debug!(removed, "Suppression filtrée");
        if removed > 0 {
            self.flush().await?;
        }
        Ok(removed)
    }

    /// Déclare une collection vide (visible dans le snapshot).
    pub async fn define(&self, collection: &str) -> RaiseResult<()> {
        let created = {
            let mut store = self.write_store()?;
            let known = store.table(collection).is_some();
            store.define(collection);
            !known
        };
        if created {
            self.flush().await?;
        }
        Ok(())
    }

    // --- LECTURES (jamais bloquées par une écriture en cours) ---

    pub async fn find_by_id(&self, collection: &str, id: &Value) -> RaiseResult<Option<Value>> {
        let key = id_key(id)?;
        let store = self.read_store()?;
        match store.table(collection) {
            Some(table) => table.get(&key),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, collection: &str, id: &Value) -> RaiseResult<bool> {
        let key = id_key(id)?;
        let store = self.read_store()?;
        Ok(store.table(collection).is_some_and(|t| t.contains(&key)))
    }

    /// Filtre JSON : `{ where, order, skip | offset, limit, fields }`.
    pub async fn find(&self, collection: &str, filter: &Value) -> RaiseResult<Vec<Value>> {
        let query = parse_filter(collection, filter, &self.patterns)?;
        Ok(self.find_query(query).await?.documents)
    }

    pub async fn find_query(&self, query: Query) -> RaiseResult<QueryResult> {
        let store = self.read_store()?;
        let engine = QueryEngine::new(&store);
        engine.execute_query(&query)
    }

    pub async fn count(&self, collection: &str, where_clause: Option<&Value>) -> RaiseResult<usize> {
        let filter = self.where_filter(where_clause)?;
        let store = self.read_store()?;
        let engine = QueryEngine::new(&store);
        engine.count(collection, filter.as_ref())
    }

    /// `(clé, document)` dans l'ordre de la table.
    pub async fn all(&self, collection: &str) -> RaiseResult<Vec<(String, Value)>> {
        let store = self.read_store()?;
        match store.table(collection) {
            Some(table) => table.entries(),
            None => Ok(Vec::new()),
        }
    }

    pub async fn collections(&self) -> RaiseResult<Vec<String>> {
        Ok(self.read_store()?.collection_names())
    }
}

// --- HELPERS (sous verrou d'écriture) ---

fn into_object(data: Value) -> RaiseResult<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(AppError::InvalidFilter(format!(
            "un document doit être un objet JSON, reçu {}",
            other
        ))),
    }
}

/// Attribue l'id, vérifie l'unicité, puis range le document.
fn insert_new(
    store: &mut Store,
    collection: &str,
    mut body: Map<String, Value>,
) -> RaiseResult<Value> {
    store.define(collection);

    let (key, id) = match body.get("id").filter(|v| !v.is_null()).cloned() {
        Some(id) => {
            let key = id_key(&id)?;
            if store.table(collection).is_some_and(|t| t.contains(&key)) {
                return Err(AppError::DuplicateId {
                    collection: collection.to_string(),
                    id: key,
                });
            }
            store.ids.observe(collection, &id);
            (key, id)
        }
        None => {
            let n = store.ids.next_id(collection)?;
            let key = n.to_string();
            if store.table(collection).is_some_and(|t| t.contains(&key)) {
                return Err(AppError::DuplicateId {
                    collection: collection.to_string(),
                    id: key,
                });
            }
            (key, json!(n))
        }
    };

    body.insert("id".into(), id.clone());
    store.define(collection).put(key, &Value::Object(body))?;
    Ok(id)
}

fn merge_record(current: Value, patch: &Map<String, Value>) -> Value {
    let Value::Object(mut base) = current else {
        return Value::Object(patch.clone());
    };
    let id = base.get("id").cloned();
    merge_shallow(&mut base, patch);
    if let Some(id) = id {
        base.insert("id".into(), id);
    }
    Value::Object(base)
}

// ============================================================================
// TESTS UNITAIRES
// ============================================================================
