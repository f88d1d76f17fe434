// FICHIER : memdb/src/memory_db/query/pattern.rs

//! Compilation des motifs (`like`, `nlike`, `regexp`) et validation des opérandes.

use super::{ComparisonOperator, Operand};
use crate::utils::prelude::*;
use crate::utils::Arc;
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Motif `like` -> source regex : `%` couvre n'importe quelle suite de
/// caractères (vide comprise, retours à la ligne compris), le reste est littéral.
pub fn like_to_regex_source(pattern: &str) -> String {
    pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(?s:.*)")
}

pub fn compile_like(pattern: &str) -> RaiseResult<Regex> {
    Regex::new(&like_to_regex_source(pattern))
        .map_err(|e| AppError::invalid_operand("like", e.to_string()))
}

/// Compile une regex avec des drapeaux façon JS (`i`, `m`, `s` ; `g` ignoré).
pub fn compile_regexp(operator: &str, source: &str, flags: &str) -> RaiseResult<Regex> {
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'g' => &mut builder,
            other => {
                return Err(AppError::invalid_operand(
                    operator,
                    format!("drapeau de regex inconnu '{}'", other),
                ))
            }
        };
    }
    builder
        .build()
        .map_err(|e| AppError::invalid_operand(operator, e.to_string()))
}

/// `"/^J/i"` -> (`^J`, `i`) ; une chaîne sans délimiteurs est la source entière.
pub fn parse_regexp_literal(literal: &str) -> (&str, &str) {
    if let Some(rest) = literal.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            return (&rest[..end], &rest[end + 1..]);
        }
    }
    (literal, "")
}

/// Objet motif sérialisé : `{"$regex": "<source>", "$options": "<drapeaux>"}`.
pub fn pattern_object(value: &Value) -> Option<(&str, &str)> {
    let obj = value.as_object()?;
    let source = obj.get("$regex")?.as_str()?;
    let flags = match obj.get("$options") {
        None => "",
        Some(v) => v.as_str()?,
    };
    let known = obj.keys().all(|k| k == "$regex" || k == "$options");
    known.then_some((source, flags))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "booléen",
        Value::Number(_) => "nombre",
        Value::String(_) => "chaîne",
        Value::Array(_) => "tableau",
        Value::Object(_) => "objet",
    }
}

/// Vérifie la forme de l'opérande et compile les motifs.
/// Appelée à la construction de la requête, avant tout parcours des données.
pub fn validate_operand(
    operator: ComparisonOperator,
    value: Value,
    cache: Option<&PatternCache>,
) -> RaiseResult<Operand> {
    let keyword = operator.keyword();
    match operator {
        ComparisonOperator::Like | ComparisonOperator::Nlike => {
            if let Value::String(s) = &value {
                let regex = match cache {
                    Some(c) => c.like(s)?,
                    None => compile_like(s)?,
                };
                return Ok(Operand::Pattern(regex));
            }
            match pattern_object(&value) {
                Some((source, flags)) => {
                    Ok(Operand::Pattern(compile_regexp(keyword, source, flags)?))
                }
                None => Err(AppError::invalid_operand(
                    keyword,
                    format!("attendu une chaîne ou un motif, reçu {}", value_kind(&value)),
                )),
            }
        }
        ComparisonOperator::Regexp => {
            if let Value::String(s) = &value {
                let (source, flags) = parse_regexp_literal(s);
                return Ok(Operand::Pattern(compile_regexp(keyword, source, flags)?));
            }
            match pattern_object(&value) {
                Some((source, flags)) => {
                    Ok(Operand::Pattern(compile_regexp(keyword, source, flags)?))
                }
                None => Err(AppError::invalid_operand(
                    keyword,
                    format!("attendu une chaîne ou un motif, reçu {}", value_kind(&value)),
                )),
            }
        }
        ComparisonOperator::Inq | ComparisonOperator::Nin => {
            if value.is_array() {
                Ok(Operand::Value(value))
            } else {
                Err(AppError::invalid_operand(
                    keyword,
                    format!("attendu un tableau, reçu {}", value_kind(&value)),
                ))
            }
        }
        ComparisonOperator::Between => match value.as_array().map(|a| a.len()) {
            Some(2) => Ok(Operand::Value(value)),
            Some(n) => Err(AppError::invalid_operand(
                keyword,
                format!("attendu un tableau de 2 bornes, reçu {} élément(s)", n),
            )),
            None => Err(AppError::invalid_operand(
                keyword,
                format!("attendu un tableau, reçu {}", value_kind(&value)),
            )),
        },
        ComparisonOperator::Eq => match pattern_object(&value) {
            Some((source, flags)) => Ok(Operand::Pattern(compile_regexp(keyword, source, flags)?)),
            None => Ok(Operand::Value(value)),
        },
        _ => Ok(Operand::Value(value)),
    }
}

// --- CACHE LRU DES MOTIFS LIKE ---

#[derive(Debug, Clone)]
pub struct PatternCache {
    // LruCache promeut l'élément lu : même un get demande un accès exclusif
    store: Arc<Mutex<LruCache<String, Regex>>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn like(&self, pattern: &str) -> RaiseResult<Regex> {
        if let Ok(mut guard) = self.store.lock() {
            if let Some(regex) = guard.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = compile_like(pattern)?;
        if let Ok(mut guard) = self.store.lock() {
            guard.put(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
