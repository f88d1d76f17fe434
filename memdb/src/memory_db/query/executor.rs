// FICHIER : memdb/src/memory_db/query/executor.rs

use crate::utils::json;
use crate::utils::prelude::*;
use crate::utils::Ordering;

use crate::memory_db::collections::Store;
use crate::memory_db::query::{
    matcher, Projection, Query, QueryFilter, QueryResult, SortField, SortOrder,
};

// --- MOTEUR DE REQUÊTE ---

/// Exécute une requête déjà validée sur un état figé (verrou de lecture tenu par l'appelant).
pub struct QueryEngine<'a> {
    store: &'a Store,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn execute_query(&self, query: &Query) -> RaiseResult<QueryResult> {
        // 1. CHARGEMENT (scan complet, dans l'ordre de la table)
        let mut documents = match self.store.table(&query.collection) {
            Some(table) => table.documents()?,
            None => Vec::new(),
        };

        // 2. FILTRAGE
        if let Some(filter) = &query.filter {
            documents.retain(|doc| matcher::matches(doc, filter));
        }

        // 3. TRI (stable : les ex aequo gardent l'ordre de la table)
        if let Some(sort_fields) = &query.sort {
            documents.sort_by(|a, b| compare_docs(a, b, sort_fields));
        }

        let total_count = documents.len() as u64;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(documents.len());

        // 4. PAGINATION
        let mut paged_docs: Vec<Value> = documents.into_iter().skip(offset).take(limit).collect();

        // 5. PROJECTION
        if let Some(projection) = &query.projection {
            for doc in &mut paged_docs {
                *doc = project_fields(doc, projection);
            }
        }

        Ok(QueryResult {
            documents: paged_docs,
            total_count,
            offset: query.offset,
            limit: query.limit,
        })
    }

    /// Clés des enregistrements correspondant au filtre, dans l'ordre de la table.
    pub fn matching_keys(
        &self,
        collection: &str,
        filter: Option<&QueryFilter>,
    ) -> RaiseResult<Vec<String>> {
        let Some(table) = self.store.table(collection) else {
            return Ok(Vec::new());
        };
        Ok(table
            .entries()?
            .into_iter()
            .filter(|(_, doc)| filter.map_or(true, |f| matcher::matches(doc, f)))
            .map(|(key, _)| key)
            .collect())
    }

    pub fn count(&self, collection: &str, filter: Option<&QueryFilter>) -> RaiseResult<usize> {
        match filter {
            None => Ok(self.store.table(collection).map_or(0, |t| t.len())),
            Some(f) => Ok(self.matching_keys(collection, Some(f))?.len()),
        }
    }
}

fn compare_docs(a: &Value, b: &Value, sort_fields: &[SortField]) -> Ordering {
    for s in sort_fields {
        let va = matcher::field_value(a, &s.field);
        let vb = matcher::field_value(b, &s.field);
        let cmp = matcher::sort_compare(va, vb);
        if cmp != Ordering::Equal {
            return match s.order {
                SortOrder::Asc => cmp,
                SortOrder::Desc => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

fn project_fields(doc: &Value, projection: &Projection) -> Value {
    let Value::Object(map) = doc else {
        return doc.clone();
    };
    let mut new_map = json::Map::new();
    match projection {
        Projection::Include(fields) => {
            if fields.is_empty() {
                return doc.clone();
            }
            for field in fields {
                if let Some(val) = matcher::field_value(doc, field) {
                    let output_key = field.split('.').next_back().unwrap_or(field);
                    new_map.insert(output_key.to_string(), val.clone());
                }
            }
        }
        Projection::Exclude(fields) => {
            for (k, v) in map {
                if !fields.iter().any(|f| f == k) {
                    new_map.insert(k.clone(), v.clone());
                }
            }
        }
    }
    Value::Object(new_map)
}

// ============================================================================
// TESTS UNITAIRES
// ============================================================================
