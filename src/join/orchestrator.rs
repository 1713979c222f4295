//! Join orchestrator

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::backend::{Hit, SearchBackend, SearchRequest};
use crate::config::EngineConfig;
use crate::cursor::CursorManager;
use crate::planner::{JoinKey, PredicateBuilder};
use crate::response::{assemble, CombinedResult, JoinResult, OverlapResponse};

use super::errors::OverlapResult;
use super::request::{CallerSlot, DriverMode, JoinRequest, QueryRequest};

/// Runs overlap requests against a search backend
#[derive(Debug, Clone)]
pub struct JoinOrchestrator {
    cursors: CursorManager,
    builder: PredicateBuilder,
    config: EngineConfig,
}

impl JoinOrchestrator {
    pub fn new(backend: Arc<dyn SearchBackend>, config: EngineConfig) -> Self {
        Self {
            cursors: CursorManager::new(backend, config.scroll_ttl()),
            builder: PredicateBuilder::new(config.nested_path.as_str()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a parameter map and run it
    pub async fn handle(&self, params: &HashMap<String, String>) -> OverlapResult<OverlapResponse> {
        let request = QueryRequest::from_params(params, &self.config)?;
        self.run(&request).await
    }

    /// Run a classified request
    pub async fn run(&self, request: &QueryRequest) -> OverlapResult<OverlapResponse> {
        let started = Instant::now();
        let mode = request.mode();

        let response = match request {
            QueryRequest::ResumeSub(cursor) => {
                let page = self.cursors.resume_sub(cursor).await?;
                OverlapResponse::SubPage(page.into())
            }
            QueryRequest::Join(join) => OverlapResponse::Combined(self.run_join(join).await?),
        };

        info!(
            mode = ?mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "overlap request completed"
        );
        Ok(response)
    }

    async fn run_join(&self, request: &JoinRequest) -> OverlapResult<CombinedResult> {
        debug!(
            driver = %request.callers.driver.caller,
            callers = request.callers.secondary.len() + 1,
            indices = ?request.indices,
            "running overlap join"
        );

        let driver_page = match &request.driver_mode {
            DriverMode::New => {
                let driver = &request.callers.driver;
                let search = SearchRequest {
                    indices: request.indices.clone(),
                    query: self.builder.build_driver_query(&driver.caller, &driver.filters),
                    sort: Some(request.sort.clone()),
                    fields: request.output_fields.clone(),
                    size: request.page_size,
                    scroll_ttl: self.cursors.ttl(),
                };
                self.cursors.execute(&search).await?
            }
            DriverMode::Resume(cursor) => self.cursors.resume_driver(cursor).await?,
        };

        let joins = self.fan_out(request, &driver_page.hits).await;
        Ok(assemble(driver_page, joins))
    }

    /// Issue one join query per (row, secondary caller) and collect the
    /// results per row in caller order
    async fn fan_out(&self, request: &JoinRequest, rows: &[Hit]) -> Vec<Vec<JoinResult>> {
        let secondary = &request.callers.secondary;
        let mut slots: Vec<Vec<Option<JoinResult>>> =
            rows.iter().map(|_| vec![None; secondary.len()]).collect();

        let mut pending = Vec::with_capacity(rows.len() * secondary.len());
        for (row_index, row) in rows.iter().enumerate() {
            match JoinKey::extract(|field| row.field_str(field)) {
                Ok(key) => {
                    for (pos, slot) in secondary.iter().enumerate() {
                        pending.push((row_index, pos, key.clone(), slot));
                    }
                }
                Err(missing) => {
                    let reason = format!("driver row is missing join fields: {}", missing.join(", "));
                    warn!(row_index, row = %row.id, missing = ?missing, "skipping joins for driver row");
                    for (pos, slot) in secondary.iter().enumerate() {
                        slots[row_index][pos] =
                            Some(JoinResult::skipped(slot.index, slot.caller.as_str(), reason.clone()));
                    }
                }
            }
        }

        debug!(
            rows = rows.len(),
            joins = pending.len(),
            concurrency = self.config.join_concurrency,
            "fanning out join queries"
        );

        let queries: Vec<_> = pending
            .into_iter()
            .map(|(row_index, pos, key, slot)| async move {
                let result = self.run_join_query(request, row_index, &key, slot).await;
                (row_index, pos, result)
            })
            .collect();

        let completed: Vec<(usize, usize, JoinResult)> = stream::iter(queries)
            .buffer_unordered(self.config.join_concurrency.max(1))
            .collect()
            .await;

        for (row_index, pos, result) in completed {
            slots[row_index][pos] = Some(result);
        }

        slots
            .into_iter()
            .map(|row| row.into_iter().flatten().collect())
            .collect()
    }

    async fn run_join_query(
        &self,
        request: &JoinRequest,
        row_index: usize,
        key: &JoinKey,
        slot: &CallerSlot,
    ) -> JoinResult {
        let search = SearchRequest {
            indices: request.indices.clone(),
            query: self.builder.build_join_query(
                key,
                &request.callers.driver.caller,
                &slot.caller,
                &slot.filters,
            ),
            sort: None,
            fields: request.output_fields.clone(),
            size: request.sub_page_size,
            scroll_ttl: self.cursors.ttl(),
        };

        match self.cursors.execute(&search).await {
            Ok(page) => JoinResult::hits(slot.index, slot.caller.as_str(), page),
            Err(e) => {
                warn!(
                    row_index,
                    caller_index = slot.index,
                    caller = %slot.caller,
                    error = %e,
                    "join query failed"
                );
                JoinResult::failed(slot.index, slot.caller.as_str(), e.to_string())
            }
        }
    }
}
