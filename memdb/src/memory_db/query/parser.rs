// FICHIER : memdb/src/memory_db/query/parser.rs

use super::pattern::{self, PatternCache};
use super::{
    ComparisonOperator, Condition, FilterOperator, Operand, Projection, Query, QueryFilter,
    SortField, SortOrder,
};

use crate::utils::prelude::*;

// --- FILTRE COMPLET ---

/// `{ "where", "order", "skip" | "offset", "limit", "fields" }` -> `Query`.
/// Toute erreur de forme est levée ici, avant le moindre parcours des données.
/// Les clés inconnues sont ignorées.
pub fn parse_filter(collection: &str, filter: &Value, cache: &PatternCache) -> RaiseResult<Query> {
    let mut query = Query::new(collection);
    let obj = match filter {
        Value::Null => return Ok(query),
        Value::Object(obj) => obj,
        other => {
            return Err(AppError::InvalidFilter(format!(
                "le filtre doit être un objet, reçu {}",
                other
            )))
        }
    };

    if let Some(clause) = obj.get("where").filter(|v| !v.is_null()) {
        let parsed = parse_where(clause, cache)?;
        if !parsed.is_empty() {
            query.filter = Some(parsed);
        }
    }
    if let Some(order) = obj.get("order").filter(|v| !v.is_null()) {
        query.sort = Some(parse_order(order)?);
    }

    query.offset = match parse_count(obj.get("skip"), "skip")? {
        Some(n) => Some(n),
        None => parse_count(obj.get("offset"), "offset")?,
    };
    query.limit = parse_count(obj.get("limit"), "limit")?;

    if let Some(fields) = obj.get("fields").filter(|v| !v.is_null()) {
        query.projection = Some(parse_projection(fields)?);
    }

    Ok(query)
}

fn parse_count(value: Option<&Value>, key: &str) -> RaiseResult<Option<usize>> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(n) => Ok(Some(n as usize)),
        None => Err(AppError::InvalidFilter(format!(
            "'{}' doit être un entier positif",
            key
        ))),
    }
}

// --- CLAUSE WHERE ---

pub fn parse_where(clause: &Value, cache: &PatternCache) -> RaiseResult<QueryFilter> {
    let mut filter = QueryFilter::new(FilterOperator::And);
    let obj = match clause {
        Value::Null => return Ok(filter),
        Value::Object(obj) => obj,
        other => {
            return Err(AppError::InvalidFilter(format!(
                "clause where invalide : {}",
                other
            )))
        }
    };

    for (key, value) in obj {
        match key.as_str() {
            "and" | "or" => {
                let operator = if key == "and" {
                    FilterOperator::And
                } else {
                    FilterOperator::Or
                };
                let branches = value.as_array().ok_or_else(|| {
                    AppError::InvalidFilter(format!("'{}' attend un tableau de clauses", key))
                })?;
                let mut group = QueryFilter::new(operator);
                for branch in branches {
                    group.groups.push(parse_where(branch, cache)?);
                }
                filter.groups.push(group);
            }
            // Négation : aucune des clauses ne doit correspondre
            "not" => {
                let mut group = QueryFilter::new(FilterOperator::Not);
                match value {
                    Value::Array(branches) => {
                        for branch in branches {
                            group.groups.push(parse_where(branch, cache)?);
                        }
                    }
                    Value::Object(_) => group.groups.push(parse_where(value, cache)?),
                    _ => {
                        return Err(AppError::InvalidFilter(
                            "'not' attend une clause ou un tableau de clauses".into(),
                        ))
                    }
                }
                // `not: {}` ne filtre rien
                group.groups.retain(|g| !g.is_empty());
                filter.groups.push(group);
            }
            field => filter
                .conditions
                .extend(parse_field_clause(field, value, cache)?),
        }
    }

    Ok(filter)
}

/// Un objet dont toutes les clés sont des opérateurs donne une condition
/// par opérateur ; tout autre valeur est une égalité.
fn parse_field_clause(
    field: &str,
    value: &Value,
    cache: &PatternCache,
) -> RaiseResult<Vec<Condition>> {
    let ops = match value.as_object() {
        Some(ops) if !ops.is_empty() && pattern::pattern_object(value).is_none() => ops,
        _ => {
            let operand = pattern::validate_operand(ComparisonOperator::Eq, value.clone(), Some(cache))?;
            return Ok(vec![Condition {
                field: field.to_string(),
                operator: ComparisonOperator::Eq,
                value: operand,
            }]);
        }
    };

    let is_operator = |k: &str| ComparisonOperator::from_keyword(k).is_some() || k == "options";
    let operator_keys = ops.keys().filter(|k| is_operator(k)).count();
    if operator_keys == 0 {
        // Égalité structurelle sur un sous-objet
        return Ok(vec![Condition::eq(field, value.clone())]);
    }
    if operator_keys != ops.len() {
        return Err(AppError::InvalidFilter(format!(
            "le champ '{}' mélange opérateurs et valeurs",
            field
        )));
    }

    let flags = match ops.get("options") {
        None => None,
        Some(Value::String(f)) => Some(f.as_str()),
        Some(_) => {
            return Err(AppError::InvalidFilter(
                "'options' doit être une chaîne de drapeaux".into(),
            ))
        }
    };

    let mut conditions = Vec::with_capacity(ops.len());
    for (keyword, operand) in ops {
        let Some(operator) = ComparisonOperator::from_keyword(keyword) else {
            continue;
        };
        let value = match (operator, operand, flags) {
            // `{ like: "a%", options: "i" }`
            (ComparisonOperator::Like | ComparisonOperator::Nlike, Value::String(p), Some(f)) => {
                Operand::Pattern(pattern::compile_regexp(
                    operator.keyword(),
                    &pattern::like_to_regex_source(p),
                    f,
                )?)
            }
            (ComparisonOperator::Regexp, Value::String(src), Some(f)) => Operand::Pattern(
                pattern::compile_regexp(operator.keyword(), src, f)?,
            ),
            _ => pattern::validate_operand(operator, operand.clone(), Some(cache))?,
        };
        conditions.push(Condition {
            field: field.to_string(),
            operator,
            value,
        });
    }
    Ok(conditions)
}

// --- TRI ---

/// `"vip ASC, seq DESC"` ou `["vip ASC", "seq DESC"]`.
pub fn parse_order(order: &Value) -> RaiseResult<Vec<SortField>> {
    let specs: Vec<&str> = match order {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| AppError::MalformedOrderSpec(item.to_string()))
            })
            .collect::<RaiseResult<_>>()?,
        other => return Err(AppError::MalformedOrderSpec(other.to_string())),
    };

    let mut out = Vec::new();
    for spec in specs {
        for clause in spec.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            out.push(parse_single_sort_spec(clause)?);
        }
    }
    Ok(out)
}

fn parse_single_sort_spec(clause: &str) -> RaiseResult<SortField> {
    let tokens: Vec<&str> = clause.split_whitespace().collect();
    let (field, order) = match tokens.as_slice() {
        [field] => (*field, SortOrder::Asc),
        [field, dir] if dir.eq_ignore_ascii_case("asc") => (*field, SortOrder::Asc),
        [field, dir] if dir.eq_ignore_ascii_case("desc") => (*field, SortOrder::Desc),
        _ => return Err(AppError::MalformedOrderSpec(clause.to_string())),
    };
    Ok(SortField {
        field: field.to_string(),
        order,
    })
}

// --- PROJECTION ---

pub fn parse_projection(fields: &Value) -> RaiseResult<Projection> {
    match fields {
        Value::String(f) => Ok(Projection::Include(vec![f.clone()])),
        Value::Array(items) => {
            let names = items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        AppError::InvalidFilter(format!("nom de champ invalide : {}", v))
                    })
                })
                .collect::<RaiseResult<Vec<String>>>()?;
            let Some(first) = names.first() else {
                return Err(AppError::InvalidFilter("projection vide".into()));
            };

            let is_exclude = first.starts_with('-');
            let cleaned: Vec<String> = names
                .iter()
                .map(|f| f.trim_start_matches(['+', '-']).to_string())
                .collect();
            if is_exclude {
                Ok(Projection::Exclude(cleaned))
            } else {
                Ok(Projection::Include(cleaned))
            }
        }
        Value::Object(map) => {
            let mut included = Vec::new();
            let mut excluded = Vec::new();
            for (name, flag) in map {
                match flag.as_bool() {
                    Some(true) => included.push(name.clone()),
                    Some(false) => excluded.push(name.clone()),
                    None => {
                        return Err(AppError::InvalidFilter(format!(
                            "projection '{}' : booléen attendu",
                            name
                        )))
                    }
                }
            }
            if included.is_empty() {
                Ok(Projection::Exclude(excluded))
            } else {
                Ok(Projection::Include(included))
            }
        }
        other => Err(AppError::InvalidFilter(format!(
            "projection invalide : {}",
            other
        ))),
    }
}

// --- CONSTRUCTEUR TYPÉ ---

pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        let col_str: String = collection.into();
        Self {
            query: Query::new(&col_str),
        }
    }

    pub fn where_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.where_cond(Condition::eq(field, value))
    }

    pub fn where_cond(mut self, condition: Condition) -> Self {
        self.root().conditions.push(condition);
        self
    }

    /// Ajoute un groupe `or` au filtre racine.
    pub fn where_any(mut self, conditions: Vec<Condition>) -> Self {
        let mut group = QueryFilter::new(FilterOperator::Or);
        group.conditions = conditions;
        self.root().groups.push(group);
        self
    }

    fn root(&mut self) -> &mut QueryFilter {
        self.query
            .filter
            .get_or_insert_with(|| QueryFilter::new(FilterOperator::And))
    }

    pub fn select(mut self, fields: Vec<String>) -> RaiseResult<Self> {
        self.query.projection = Some(parse_projection(&Value::from(fields))?);
        Ok(self)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        let sort_field = SortField {
            field: field.into(),
            order,
        };
        self.query.sort.get_or_insert_with(Vec::new).push(sort_field);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

// ============================================================================
// TESTS UNITAIRES
// ============================================================================
