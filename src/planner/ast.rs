//! Query expression tree
//!
//! Backend-agnostic representation of the driver and join queries. The
//! tree only carries what the overlap join needs: exact terms, inclusive
//! ranges, nested sub-document groups and conjunction.

use serde_json::{json, Map, Value};

use crate::filter::{FilterExpression, FilterOperator};

/// A query expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// Exact match: field == value
    Term { field: String, value: String },
    /// Inclusive range: gte <= field <= lte
    Range {
        field: String,
        gte: Option<String>,
        lte: Option<String>,
    },
    /// Some element of the nested array at `path` matches `query`
    Nested { path: String, query: Box<QueryExpr> },
    /// All clauses must match
    Bool { must: Vec<QueryExpr> },
}

impl QueryExpr {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryExpr::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryExpr::Range {
            field: field.into(),
            gte: Some(value.into()),
            lte: None,
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryExpr::Range {
            field: field.into(),
            gte: None,
            lte: Some(value.into()),
        }
    }

    pub fn nested(path: impl Into<String>, query: QueryExpr) -> Self {
        QueryExpr::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    pub fn all(must: Vec<QueryExpr>) -> Self {
        QueryExpr::Bool { must }
    }

    /// Map a parsed filter onto a predicate, optionally under a field prefix
    pub fn from_filter(filter: &FilterExpression, prefix: Option<&str>) -> Self {
        let field = match prefix {
            Some(prefix) => format!("{}.{}", prefix, filter.field()),
            None => filter.field().to_string(),
        };

        match filter.operator() {
            FilterOperator::Equals => QueryExpr::term(field, filter.value()),
            FilterOperator::GreaterOrEqual => QueryExpr::gte(field, filter.value()),
            FilterOperator::LessOrEqual => QueryExpr::lte(field, filter.value()),
        }
    }

    /// Lower to the search backend's JSON query DSL
    pub fn to_dsl(&self) -> Value {
        match self {
            QueryExpr::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            QueryExpr::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), Value::String(gte.clone()));
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), Value::String(lte.clone()));
                }
                json!({ "range": { field.as_str(): bounds } })
            }
            QueryExpr::Nested { path, query } => json!({
                "nested": { "path": path, "query": query.to_dsl() }
            }),
            QueryExpr::Bool { must } => json!({
                "bool": { "must": must.iter().map(QueryExpr::to_dsl).collect::<Vec<_>>() }
            }),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Accepts `asc`, `desc` and the legacy spelling `dsc`, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" | "dsc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `field,direction`. Returns `None` unless there are exactly two
    /// non-empty parts and the direction is recognised.
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [field, direction] if !field.is_empty() => Some(Self {
                field: field.to_string(),
                direction: SortDirection::parse(direction)?,
            }),
            _ => None,
        }
    }

    /// Parse an optional request value, falling back to `default` when it
    /// is absent, blank or malformed
    pub fn parse_or(value: Option<&str>, default: &SortSpec) -> Self {
        value
            .filter(|v| !v.trim().is_empty())
            .and_then(Self::parse)
            .unwrap_or_else(|| default.clone())
    }

    pub fn to_dsl(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.direction.as_str() } })
    }
}
