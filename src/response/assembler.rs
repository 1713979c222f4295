//! Response assembler

use std::iter;

use crate::backend::RawPage;

use super::types::{CombinedResult, JoinResult, RowResult};

/// Nest each driver row with its join results.
///
/// `per_row_joins[i]` belongs to `driver_page.hits[i]`; a row without an
/// entry gets no joins. Joins keep the order they are given in.
pub fn assemble(driver_page: RawPage, per_row_joins: Vec<Vec<JoinResult>>) -> CombinedResult {
    let RawPage { total, hits, next } = driver_page;

    let rows = hits
        .into_iter()
        .zip(per_row_joins.into_iter().chain(iter::repeat_with(Vec::new)))
        .map(|(driver_row, joins)| RowResult { driver_row, joins })
        .collect();

    CombinedResult {
        total_driver_hits: total,
        driver_cursor: next,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Hit, ScrollId};
    use serde_json::json;

    fn page(ids: &[&str], next: Option<&str>) -> RawPage {
        RawPage {
            total: 40,
            hits: ids.iter().map(|id| Hit::new("idx", *id)).collect(),
            next: next.map(ScrollId::new),
        }
    }

    #[test]
    fn test_assemble_pairs_rows_with_joins() {
        let joins = vec![
            vec![JoinResult::failed(1, "mutect", "x")],
            vec![JoinResult::hits(1, "mutect", RawPage::default())],
        ];
        let result = assemble(page(&["a", "b"], Some("drv")), joins);

        assert_eq!(result.total_driver_hits, 40);
        assert_eq!(result.driver_cursor, Some(ScrollId::new("drv")));
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].driver_row.id, "a");
        assert!(result.rows[0].joins[0].is_failed());
        assert!(!result.rows[1].joins[0].is_failed());
    }

    #[test]
    fn test_assemble_without_joins() {
        let result = assemble(page(&["a"], None), Vec::new());
        assert!(result.rows[0].joins.is_empty());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["result_total"], 40);
        assert_eq!(value["scroll_id"], serde_json::Value::Null);
        assert_eq!(value["combined_results"][0], json!({"dataset-0": {"_index": "idx", "_id": "a", "fields": {}}}));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let make = || {
            assemble(
                page(&["a", "b"], None),
                vec![vec![JoinResult::skipped(1, "m", "r")], vec![]],
            )
        };
        assert_eq!(make(), make());
    }
}
