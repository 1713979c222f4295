//! Predicate builder
//!
//! Driver filters address top-level document fields. Join filters address
//! fields of the nested event sub-documents, so they are rewritten under
//! the nested path and evaluated inside the nested group.

use crate::filter::FilterExpression;

use super::ast::QueryExpr;

/// Top-level field holding the caller name on every document
pub const CALLER_FIELD: &str = "caller";

/// Fields a driver row must carry for a join to be attempted
pub const JOIN_KEY_FIELDS: [&str; 4] = ["chrom_number", "start", "end", "sample_id"];

/// Coordinates matched across callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub chrom_number: String,
    pub start: String,
    pub end: String,
    pub sample_id: String,
}

impl JoinKey {
    /// Extract the key through a field lookup.
    ///
    /// Returns the names of the missing fields when any is absent.
    pub fn extract<F>(lookup: F) -> Result<Self, Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chrom_number = lookup("chrom_number");
        let start = lookup("start");
        let end = lookup("end");
        let sample_id = lookup("sample_id");

        match (chrom_number, start, end, sample_id) {
            (Some(chrom_number), Some(start), Some(end), Some(sample_id)) => Ok(JoinKey {
                chrom_number,
                start,
                end,
                sample_id,
            }),
            (chrom_number, start, end, sample_id) => {
                let present = [
                    chrom_number.is_some(),
                    start.is_some(),
                    end.is_some(),
                    sample_id.is_some(),
                ];
                Err(JOIN_KEY_FIELDS
                    .iter()
                    .zip(present)
                    .filter(|(_, present)| !present)
                    .map(|(field, _)| *field)
                    .collect())
            }
        }
    }
}

/// Builds driver and join queries
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    nested_path: String,
}

impl PredicateBuilder {
    pub fn new(nested_path: impl Into<String>) -> Self {
        Self {
            nested_path: nested_path.into(),
        }
    }

    pub fn nested_path(&self) -> &str {
        &self.nested_path
    }

    fn nested_field(&self, field: &str) -> String {
        format!("{}.{}", self.nested_path, field)
    }

    /// `caller == driver` AND every driver filter on its top-level field
    pub fn build_driver_query(&self, driver: &str, filters: &[FilterExpression]) -> QueryExpr {
        let mut must = Vec::with_capacity(filters.len() + 1);
        must.push(QueryExpr::term(CALLER_FIELD, driver));
        must.extend(filters.iter().map(|f| QueryExpr::from_filter(f, None)));
        QueryExpr::all(must)
    }

    /// `caller == join_caller` AND a nested event matching the driver
    /// caller, the row's coordinates and every join filter
    pub fn build_join_query(
        &self,
        key: &JoinKey,
        driver: &str,
        join_caller: &str,
        filters: &[FilterExpression],
    ) -> QueryExpr {
        let mut nested = vec![
            QueryExpr::term(self.nested_field(CALLER_FIELD), driver),
            QueryExpr::term(self.nested_field("chrom_number"), key.chrom_number.as_str()),
            QueryExpr::term(self.nested_field("end"), key.end.as_str()),
            QueryExpr::term(self.nested_field("sample_id"), key.sample_id.as_str()),
            QueryExpr::term(self.nested_field("start"), key.start.as_str()),
        ];
        nested.extend(
            filters
                .iter()
                .map(|f| QueryExpr::from_filter(f, Some(&self.nested_path))),
        );

        QueryExpr::all(vec![
            QueryExpr::term(CALLER_FIELD, join_caller),
            QueryExpr::nested(self.nested_path.as_str(), QueryExpr::all(nested)),
        ])
    }
}
