// FICHIER : memdb/src/memory_db/query/matcher.rs

//! Évaluation des filtres sur un document, avec coercition explicite des types.

use crate::memory_db::query::{
    ComparisonOperator, Condition, FilterOperator, Operand, QueryFilter,
};
use crate::utils::prelude::*;
use crate::utils::Ordering;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

// --- FILTRES ---

/// Un filtre vide laisse tout passer.
pub fn matches(document: &Value, filter: &QueryFilter) -> bool {
    if filter.is_empty() {
        return true;
    }
    let mut conditions = filter
        .conditions
        .iter()
        .map(|c| evaluate_condition(document, c));
    let mut groups = filter.groups.iter().map(|g| matches(document, g));

    match filter.operator {
        FilterOperator::And => conditions.all(|ok| ok) && groups.all(|ok| ok),
        FilterOperator::Or => conditions.any(|ok| ok) || groups.any(|ok| ok),
        FilterOperator::Not => !(conditions.any(|ok| ok) || groups.any(|ok| ok)),
    }
}

pub fn evaluate_condition(document: &Value, condition: &Condition) -> bool {
    let Some(val) = field_value(document, &condition.field) else {
        // Champ absent : seule l'égalité avec null réussit
        return condition.operator == ComparisonOperator::Eq
            && matches!(condition.value, Operand::Value(Value::Null));
    };

    let operand = match &condition.value {
        Operand::Pattern(re) => {
            return match condition.operator {
                ComparisonOperator::Nlike => !val.is_null() && !pattern_matches(val, re),
                _ => pattern_matches(val, re),
            }
        }
        Operand::Value(v) => v,
    };

    match condition.operator {
        ComparisonOperator::Eq => values_equal(val, operand),
        ComparisonOperator::Neq => !values_equal(val, operand),
        ComparisonOperator::Gt => compare_values(val, operand) == Some(Ordering::Greater),
        ComparisonOperator::Gte => matches!(
            compare_values(val, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ComparisonOperator::Lt => compare_values(val, operand) == Some(Ordering::Less),
        ComparisonOperator::Lte => matches!(
            compare_values(val, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ComparisonOperator::Between => match operand.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                matches!(
                    compare_values(val, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare_values(val, high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            _ => false,
        },
        ComparisonOperator::Inq => in_list(val, operand),
        ComparisonOperator::Nin => !in_list(val, operand),
        // Opérandes déjà compilés en motif par la validation
        ComparisonOperator::Like | ComparisonOperator::Nlike | ComparisonOperator::Regexp => false,
    }
}

fn in_list(val: &Value, list: &Value) -> bool {
    let Some(candidates) = list.as_array() else {
        return false;
    };
    candidates.iter().any(|c| values_equal(val, c))
}

/// Les scalaires non-chaîne sont convertis en texte ; un tableau
/// correspond dès qu'un de ses éléments correspond.
fn pattern_matches(val: &Value, re: &Regex) -> bool {
    match val {
        Value::String(s) => re.is_match(s),
        Value::Number(n) => re.is_match(&n.to_string()),
        Value::Bool(b) => re.is_match(if *b { "true" } else { "false" }),
        Value::Array(items) => items.iter().any(|item| pattern_matches(item, re)),
        Value::Null | Value::Object(_) => false,
    }
}

// --- ACCÈS AUX CHAMPS ---

/// Clé exacte d'abord, puis chemin pointé (`address.city`).
pub fn field_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let map = document.as_object()?;
    if let Some(v) = map.get(path) {
        return Some(v);
    }
    if !path.contains('.') {
        return None;
    }
    let mut current = document;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

// --- COERCITION ---

pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn numbers_cmp(a: &serde_json::Number, b: &serde_json::Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn number_vs_str(n: &serde_json::Number, s: &str) -> Option<Ordering> {
    let parsed: f64 = s.trim().parse().ok()?;
    n.as_f64()?.partial_cmp(&parsed)
}

fn strings_cmp(a: &str, b: &str) -> Ordering {
    match (parse_date(a), parse_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

pub fn values_equal(doc_val: &Value, operand: &Value) -> bool {
    match (doc_val, operand) {
        (Value::Null, Value::Null) => true,
        (Value::Number(a), Value::Number(b)) => numbers_cmp(a, b) == Some(Ordering::Equal),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            number_vs_str(n, s) == Some(Ordering::Equal)
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            matches!((*b, s.as_str()), (true, "true") | (false, "false"))
        }
        (Value::String(a), Value::String(b)) => {
            a == b || strings_cmp(a, b) == Ordering::Equal
        }
        // Un tableau stocké est égal à un scalaire qu'il contient
        (Value::Array(items), scalar) if !scalar.is_array() && !scalar.is_object() => {
            items.iter().any(|item| values_equal(item, scalar))
        }
        (a, b) => a == b,
    }
}

/// Comparaison d'ordre pour gt/gte/lt/lte/between ; `None` si incomparable.
pub fn compare_values(doc_val: &Value, operand: &Value) -> Option<Ordering> {
    match (doc_val, operand) {
        (Value::Number(a), Value::Number(b)) => numbers_cmp(a, b),
        (Value::Number(n), Value::String(s)) => number_vs_str(n, s),
        (Value::String(s), Value::Number(n)) => number_vs_str(n, s).map(Ordering::reverse),
        (Value::String(a), Value::String(b)) => Some(strings_cmp(a, b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// --- ORDRE TOTAL POUR LE TRI ---

fn kind_rank(val: Option<&Value>) -> u8 {
    match val {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// absent/null < booléen < nombre < chaîne < tableau < objet.
pub fn sort_compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = kind_rank(a).cmp(&kind_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            numbers_cmp(x, y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => strings_cmp(x, y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (ix, iy) in x.iter().zip(y.iter()) {
                let o = sort_compare(Some(ix), Some(iy));
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => Ordering::Equal,
    }
}

// ============================================================================
// TESTS UNITAIRES
// ============================================================================
