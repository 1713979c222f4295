//! Elasticsearch backend over HTTP
//!
//! Uses the scroll API: `POST /{indices}/_search?scroll=<ttl>` opens a
//! context, `POST /_search/scroll` continues it. Unknown or expired
//! contexts answer 404.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::warn;

use super::errors::{BackendError, BackendResult};
use super::page::{Hit, RawPage, ScrollId, SearchRequest};
use super::{BackendFuture, SearchBackend};

/// Search backend talking to an Elasticsearch cluster
#[derive(Debug, Clone)]
pub struct ElasticBackend {
    client: Client,
    base_url: String,
}

impl ElasticBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, url: String, body: Value) -> BackendResult<(StatusCode, Value)> {
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok((status, Value::String(body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok((status, body))
    }

    /// Release a scroll context the caller will never continue.
    /// Failures only cost cluster memory until the keep-alive lapses.
    async fn clear_scroll(&self, cursor: ScrollId) {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll_id": [cursor.as_str()] });

        match self.client.delete(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(scroll_id = %cursor, status = response.status().as_u16(), "clear scroll rejected");
            }
            Err(e) => {
                warn!(scroll_id = %cursor, error = %e, "clear scroll failed");
            }
        }
    }

    async fn run_search(&self, request: &SearchRequest) -> BackendResult<RawPage> {
        let url = format!(
            "{}/{}/_search?scroll={}",
            self.base_url,
            request.indices.join(","),
            keep_alive(request.scroll_ttl)
        );

        let (status, body) = self.post(url, search_body(request)).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::IndexNotFound(request.indices.join(",")));
        }
        if !status.is_success() {
            return Err(error_status(status, body));
        }

        let mut page = parse_page(body)?;
        if page.hits.is_empty() || page.hits.len() as u64 >= page.total {
            if let Some(cursor) = page.next.take() {
                self.clear_scroll(cursor).await;
            }
        }
        Ok(page)
    }

    async fn run_scroll(&self, cursor: &ScrollId, ttl: Duration) -> BackendResult<RawPage> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll": keep_alive(ttl), "scroll_id": cursor.as_str() });

        let (status, body) = self.post(url, body).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::CursorNotFound(cursor.to_string()));
        }
        if !status.is_success() {
            return Err(error_status(status, body));
        }

        let mut page = parse_page(body)?;
        if page.hits.is_empty() {
            if let Some(cursor) = page.next.take() {
                self.clear_scroll(cursor).await;
            }
        }
        Ok(page)
    }
}

impl SearchBackend for ElasticBackend {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BackendFuture<'a, RawPage> {
        Box::pin(self.run_search(request))
    }

    fn scroll<'a>(&'a self, cursor: &'a ScrollId, ttl: Duration) -> BackendFuture<'a, RawPage> {
        Box::pin(self.run_scroll(cursor, ttl))
    }
}

fn keep_alive(ttl: Duration) -> String {
    format!("{}s", ttl.as_secs().max(1))
}

fn error_status(status: StatusCode, body: Value) -> BackendError {
    BackendError::Status {
        status: status.as_u16(),
        body: match body {
            Value::String(s) => s,
            other => other.to_string(),
        },
    }
}

/// Request body for a search
pub(crate) fn search_body(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": request.query.to_dsl(),
        "size": request.size,
        "fields": request.fields,
        "_source": false,
    });
    if let Some(sort) = &request.sort {
        body["sort"] = json!([sort.to_dsl()]);
    }
    body
}

/// Decode a search or scroll response body
pub(crate) fn parse_page(body: Value) -> BackendResult<RawPage> {
    let hits = body
        .get("hits")
        .ok_or_else(|| BackendError::InvalidResponse("missing 'hits'".to_string()))?;

    // Older clusters report a bare number, newer ones {"value": n, "relation": ..}
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    };

    let hits: Vec<Hit> = match hits.get("hits") {
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| BackendError::InvalidResponse(format!("bad hit list: {}", e)))?,
        None => Vec::new(),
    };

    let next = body
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(ScrollId::new);

    Ok(RawPage { total, hits, next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{QueryExpr, SortSpec};

    #[test]
    fn test_search_body() {
        let request = SearchRequest {
            indices: vec!["denormalized_data".to_string()],
            query: QueryExpr::all(vec![QueryExpr::term("caller", "varscan")]),
            sort: Some(SortSpec::desc("chrom_number")),
            fields: vec!["start".to_string(), "end".to_string()],
            size: 20,
            scroll_ttl: Duration::from_secs(600),
        };

        assert_eq!(
            search_body(&request),
            json!({
                "query": {"bool": {"must": [{"term": {"caller": "varscan"}}]}},
                "size": 20,
                "fields": ["start", "end"],
                "_source": false,
                "sort": [{"chrom_number": {"order": "desc"}}]
            })
        );
    }

    #[test]
    fn test_parse_page_total_shapes() {
        let modern = json!({
            "_scroll_id": "abc",
            "hits": {"total": {"value": 42, "relation": "eq"}, "hits": [
                {"_index": "i", "_id": "1", "fields": {"start": [100]}}
            ]}
        });
        let page = parse_page(modern).unwrap();
        assert_eq!(page.total, 42);
        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.next, Some(ScrollId::new("abc")));

        let legacy = json!({"hits": {"total": 3, "hits": []}});
        let page = parse_page(legacy).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_parse_page_rejects_missing_hits() {
        assert!(matches!(
            parse_page(json!({"error": "boom"})),
            Err(BackendError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_keep_alive() {
        assert_eq!(keep_alive(Duration::from_secs(600)), "600s");
        assert_eq!(keep_alive(Duration::from_millis(10)), "1s");
    }

    #[test]
    fn test_base_url_trimmed() {
        let backend = ElasticBackend::new("http://localhost:9200/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:9200");
    }
}
