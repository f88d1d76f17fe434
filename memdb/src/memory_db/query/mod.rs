// FICHIER : memdb/src/memory_db/query/mod.rs

//! Moteur de requêtes : filtres, tri, pagination et projection.

use crate::utils::prelude::*;
use regex::Regex;

pub mod executor;
pub mod matcher;
pub mod parser;
pub mod pattern;

pub use executor::QueryEngine;
pub use parser::{parse_filter, parse_order, parse_projection, parse_where, QueryBuilder};
pub use pattern::PatternCache;

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub collection: String,
    pub filter: Option<QueryFilter>,
    pub sort: Option<Vec<SortField>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub projection: Option<Projection>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ..Self::default()
        }
    }
}

/// Noeud logique : conditions directes + sous-groupes (clauses `and` / `or`).
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub operator: FilterOperator,
    pub conditions: Vec<Condition>,
    pub groups: Vec<QueryFilter>,
}

impl QueryFilter {
    pub fn new(operator: FilterOperator) -> Self {
        Self {
            operator,
            conditions: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self {
            operator: FilterOperator::And,
            conditions,
            groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    Inq,
    Nin,
    Like,
    Nlike,
    Regexp,
}

impl ComparisonOperator {
    /// Mot-clé tel qu'il apparaît dans une clause `where`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let op = match keyword {
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "between" => Self::Between,
            "inq" => Self::Inq,
            "nin" => Self::Nin,
            "like" => Self::Like,
            "nlike" => Self::Nlike,
            "regexp" => Self::Regexp,
            _ => return None,
        };
        Some(op)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Between => "between",
            Self::Inq => "inq",
            Self::Nin => "nin",
            Self::Like => "like",
            Self::Nlike => "nlike",
            Self::Regexp => "regexp",
        }
    }
}

/// Opérande validé : valeur JSON, ou motif compilé pour like/nlike/regexp.
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Pattern(Regex),
}

impl Operand {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Pattern(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: Operand,
}

impl Condition {
    /// Construit une condition en validant la forme de l'opérande.
    pub fn new(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: Value,
    ) -> RaiseResult<Self> {
        let value = pattern::validate_operand(operator, value, None)?;
        Ok(Self {
            field: field.into(),
            operator,
            value,
        })
    }

    /// Condition sur un motif déjà compilé (`like`, `nlike`, `regexp` ou égalité).
    pub fn with_pattern(
        field: impl Into<String>,
        operator: ComparisonOperator,
        regex: Regex,
    ) -> RaiseResult<Self> {
        match operator {
            ComparisonOperator::Eq
            | ComparisonOperator::Like
            | ComparisonOperator::Nlike
            | ComparisonOperator::Regexp => Ok(Self {
                field: field.into(),
                operator,
                value: Operand::Pattern(regex),
            }),
            other => Err(AppError::invalid_operand(
                other.keyword(),
                "un motif n'est accepté que par like, nlike et regexp",
            )),
        }
    }

    fn scalar(field: impl Into<String>, operator: ComparisonOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Operand::Value(value),
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Eq, value)
    }

    pub fn neq(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Neq, value)
    }

    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Lte, value)
    }

    pub fn between(field: impl Into<String>, low: Value, high: Value) -> Self {
        Self::scalar(field, ComparisonOperator::Between, Value::Array(vec![low, high]))
    }

    pub fn inq(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::scalar(field, ComparisonOperator::Inq, Value::Array(values))
    }

    pub fn nin(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::scalar(field, ComparisonOperator::Nin, Value::Array(values))
    }

    pub fn like(field: impl Into<String>, pattern: &str) -> RaiseResult<Self> {
        Self::new(field, ComparisonOperator::Like, Value::String(pattern.to_string()))
    }

    pub fn nlike(field: impl Into<String>, pattern: &str) -> RaiseResult<Self> {
        Self::new(field, ComparisonOperator::Nlike, Value::String(pattern.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub documents: Vec<Value>,
    pub total_count: u64,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}
