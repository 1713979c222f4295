//! Request parsing
//!
//! Turns the flat parameter map into a [`QueryRequest`]. Every filter list
//! is parsed here, so a malformed expression rejects the request before
//! any backend call.

use std::collections::HashMap;

use tracing::debug;

use crate::backend::ScrollId;
use crate::config::EngineConfig;
use crate::filter::{parse_list, FilterExpression};
use crate::planner::SortSpec;

use super::errors::{OverlapError, OverlapResult};

pub const PARAM_CALLERS: &str = "callers";
pub const PARAM_OUTPUT: &str = "output";
pub const PARAM_LEGACY_FILTER: &str = "filter";
pub const PARAM_SORT: &str = "sort-dataset-0";
pub const PARAM_INDICES: &str = "indices";
pub const PARAM_SCROLL_ID: &str = "scrollId";
pub const PARAM_SUB_SCROLL_ID: &str = "subScrollId";

/// Parameter holding the filter list of dataset slot `index`
pub fn filter_param(index: usize) -> String {
    format!("filter-{}", index)
}

/// How the request was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    NewQuery,
    ResumeDriver,
    ResumeSub,
}

/// A caller paired with the filters of its dataset slot
#[derive(Debug, Clone, PartialEq)]
pub struct CallerSlot {
    /// Position in the caller list; 0 is the driver
    pub index: usize,
    pub caller: String,
    pub filters: Vec<FilterExpression>,
}

/// Ordered callers: the driver and the secondary callers joined to it
#[derive(Debug, Clone, PartialEq)]
pub struct CallerSet {
    pub driver: CallerSlot,
    pub secondary: Vec<CallerSlot>,
}

impl CallerSet {
    /// Parse a comma-separated caller list and pair each caller with its
    /// `filter-N` list
    pub fn parse(params: &HashMap<String, String>) -> OverlapResult<Self> {
        let list = params
            .get(PARAM_CALLERS)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(OverlapError::MissingCallers)?;

        let mut slots = Vec::new();
        for (index, caller) in list.split(',').map(str::trim).enumerate() {
            if caller.is_empty() {
                return Err(OverlapError::invalid_param(
                    PARAM_CALLERS,
                    format!("empty caller name at position {}", index),
                ));
            }

            let param = filter_param(index);
            let filters = parse_list(params.get(&param).map(String::as_str))
                .map_err(|e| OverlapError::malformed_filter(param, e))?;

            slots.push(CallerSlot {
                index,
                caller: caller.to_string(),
                filters,
            });
        }

        let mut slots = slots.into_iter();
        let driver = slots.next().ok_or(OverlapError::MissingCallers)?;
        Ok(Self {
            driver,
            secondary: slots.collect(),
        })
    }

    /// Callers in list order, driver first
    pub fn iter(&self) -> impl Iterator<Item = &CallerSlot> {
        std::iter::once(&self.driver).chain(self.secondary.iter())
    }
}

/// Where the driver page comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DriverMode {
    /// Run the driver query
    New,
    /// Continue an existing driver stream
    Resume(ScrollId),
}

/// A new query or a driver continuation, both of which fan out joins
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub driver_mode: DriverMode,
    pub callers: CallerSet,
    pub output_fields: Vec<String>,
    pub sort: SortSpec,
    pub indices: Vec<String>,
    pub page_size: usize,
    pub sub_page_size: usize,
}

/// A classified overlap request
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    Join(JoinRequest),
    ResumeSub(ScrollId),
}

impl QueryRequest {
    /// Classify and parse a request.
    ///
    /// `subScrollId` takes precedence and needs nothing else. Otherwise a
    /// caller list is required and `scrollId` selects a driver
    /// continuation.
    pub fn from_params(params: &HashMap<String, String>, config: &EngineConfig) -> OverlapResult<Self> {
        if let Some(cursor) = non_blank(params, PARAM_SUB_SCROLL_ID) {
            return Ok(QueryRequest::ResumeSub(ScrollId::new(cursor)));
        }

        let callers = CallerSet::parse(params)?;

        if let Some(legacy) = non_blank(params, PARAM_LEGACY_FILTER) {
            debug!(filter = legacy, "ignoring legacy 'filter' parameter");
        }

        let driver_mode = match non_blank(params, PARAM_SCROLL_ID) {
            Some(cursor) => DriverMode::Resume(ScrollId::new(cursor)),
            None => DriverMode::New,
        };

        let fallback = config
            .sort_spec()
            .unwrap_or_else(|_| SortSpec::desc("chrom_number"));
        let sort = SortSpec::parse_or(params.get(PARAM_SORT).map(String::as_str), &fallback);

        Ok(QueryRequest::Join(JoinRequest {
            driver_mode,
            callers,
            output_fields: split_list(params.get(PARAM_OUTPUT), &config.default_output),
            sort,
            indices: split_list(params.get(PARAM_INDICES), &config.default_indices),
            page_size: config.driver_page_size,
            sub_page_size: config.sub_page_size,
        }))
    }

    pub fn mode(&self) -> RequestMode {
        match self {
            QueryRequest::ResumeSub(_) => RequestMode::ResumeSub,
            QueryRequest::Join(join) => match join.driver_mode {
                DriverMode::New => RequestMode::NewQuery,
                DriverMode::Resume(_) => RequestMode::ResumeDriver,
            },
        }
    }
}

fn non_blank<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Split a comma-separated list, dropping blank entries; an absent or
/// blank list yields `default`
fn split_list(value: Option<&String>, default: &[String]) -> Vec<String> {
    let items: Vec<String> = value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    if items.is_empty() {
        default.to_vec()
    } else {
        items
    }
}
