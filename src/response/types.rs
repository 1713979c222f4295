//! Result types

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::backend::{Hit, RawPage, ScrollId};

/// Outcome of one join query
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The query ran; `cursor` continues it when more rows remain
    Hits {
        cursor: Option<ScrollId>,
        rows: Vec<Hit>,
    },
    /// The query failed; other joins are unaffected
    Failed { reason: String },
    /// No query was issued because the driver row lacks join-key fields
    Skipped { reason: String },
}

/// Rows of one secondary caller joined to one driver row
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    /// Position of the caller in the request's caller list (driver is 0)
    pub caller_index: usize,
    pub caller: String,
    pub outcome: JoinOutcome,
}

impl JoinResult {
    pub fn hits(caller_index: usize, caller: impl Into<String>, page: RawPage) -> Self {
        Self {
            caller_index,
            caller: caller.into(),
            outcome: JoinOutcome::Hits {
                cursor: page.next,
                rows: page.hits,
            },
        }
    }

    pub fn failed(caller_index: usize, caller: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            caller_index,
            caller: caller.into(),
            outcome: JoinOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn skipped(caller_index: usize, caller: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            caller_index,
            caller: caller.into(),
            outcome: JoinOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn cursor(&self) -> Option<&ScrollId> {
        match &self.outcome {
            JoinOutcome::Hits { cursor, .. } => cursor.as_ref(),
            _ => None,
        }
    }

    pub fn rows(&self) -> &[Hit] {
        match &self.outcome {
            JoinOutcome::Hits { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, JoinOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, JoinOutcome::Skipped { .. })
    }

    /// Key of this result inside its row object
    pub fn dataset_key(&self) -> String {
        dataset_key(self.caller_index)
    }
}

pub(crate) fn dataset_key(index: usize) -> String {
    format!("dataset-{}", index)
}

impl Serialize for JoinResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("scroll_id", &self.cursor())?;
        map.serialize_entry("hits", self.rows())?;
        match &self.outcome {
            JoinOutcome::Hits { .. } => {}
            JoinOutcome::Failed { reason } => map.serialize_entry("error", reason)?,
            JoinOutcome::Skipped { reason } => map.serialize_entry("skipped", reason)?,
        }
        map.end()
    }
}

/// One driver row with its joins, in caller order
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    pub driver_row: Hit,
    pub joins: Vec<JoinResult>,
}

impl Serialize for RowResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.joins.len() + 1))?;
        map.serialize_entry(&dataset_key(0), &self.driver_row)?;
        for join in &self.joins {
            map.serialize_entry(&join.dataset_key(), join)?;
        }
        map.end()
    }
}

/// A page of driver rows joined against every secondary caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedResult {
    #[serde(rename = "result_total")]
    pub total_driver_hits: u64,

    #[serde(rename = "scroll_id")]
    pub driver_cursor: Option<ScrollId>,

    #[serde(rename = "combined_results")]
    pub rows: Vec<RowResult>,
}

/// Raw page returned when continuing a join stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubScrollPage {
    pub scroll_id: Option<ScrollId>,
    pub hits: Vec<Hit>,
}

impl From<RawPage> for SubScrollPage {
    fn from(page: RawPage) -> Self {
        Self {
            scroll_id: page.next,
            hits: page.hits,
        }
    }
}

/// Any successful overlap response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OverlapResponse {
    Combined(CombinedResult),
    SubPage(SubScrollPage),
}
