//! HTTP search provider
//!
//! This module implements [`SearchProvider`] against a JSON product-search API:
//! - Building the HTTP client with the crate's user agent
//! - Encoding term, location, page size and cursor as query parameters
//! - Attaching the bearer token from the injected credential provider
//! - Retrying 429/5xx/timeouts with a fixed delay
//! - Reading entities and the reported total from loosely shaped responses

use crate::config::ApiConfig;
use crate::entity::Entity;
use crate::provider::{CredentialProvider, PageResult, SearchProvider, SearchRequest, TransportError};
use crate::{ConfigError, SweepError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Response fields that may hold the entity array, in precedence order
const ENTITY_ARRAY_FIELDS: &[&str] = &["data", "products", "results"];

type TotalExtractor = fn(&Value) -> Option<u64>;

/// Reported-total precedence
const TOTAL_EXTRACTORS: &[TotalExtractor] = &[pagination_total, plain_total, total_count];

/// Builds an HTTP client for the search API
///
/// # Arguments
///
/// * `timeout_secs` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let user_agent = format!("catalog-sweep/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Search provider backed by a JSON HTTP API
pub struct HttpSearchProvider {
    client: Client,
    endpoint: Url,
    credentials: Arc<dyn CredentialProvider>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpSearchProvider {
    /// Creates a provider from the API configuration
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, SweepError> {
        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| base.join(&config.search_path))
            .map_err(|e| ConfigError::InvalidUrl(format!("{}{}: {}", config.base_url, config.search_path, e)))?;

        let client = build_http_client(config.timeout_secs)?;

        Ok(Self {
            client,
            endpoint,
            credentials,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Builds the request URL for one search call
    pub fn request_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("filter.term", &request.term)
            .append_pair("filter.locationId", &request.location_id)
            .append_pair("filter.limit", &request.page_size.to_string())
            .append_pair("filter.start", &request.cursor.to_string());
        url
    }

    /// Performs one attempt, with no retry
    async fn send_once(&self, request: &SearchRequest) -> Result<PageResult, TransportError> {
        let mut builder = self
            .client
            .get(self.request_url(request))
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = self.credentials.bearer_token().await? {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        parse_search_response(&body)
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, request: &SearchRequest) -> Result<PageResult, TransportError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Search for '{}' (start {}) failed: {}. Retry {}/{} in {:?}",
                        request.term,
                        request.cursor,
                        e,
                        attempt,
                        self.max_retries,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reads a page out of a search response body
///
/// Accepts a bare array, or an object whose entities sit under one of
/// `data`, `products` or `results`. The total is taken from
/// `meta.pagination.total`, `total` or `totalCount`, whichever comes first.
pub fn parse_search_response(body: &Value) -> Result<PageResult, TransportError> {
    let array = match body {
        Value::Array(items) => items,
        Value::Object(_) => ENTITY_ARRAY_FIELDS
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_array))
            .ok_or_else(|| {
                TransportError::Decode(format!(
                    "no entity array (expected one of {:?})",
                    ENTITY_ARRAY_FIELDS
                ))
            })?,
        other => {
            return Err(TransportError::Decode(format!(
                "unexpected response body: {}",
                truncate(&other.to_string(), 80)
            )))
        }
    };

    let entities = array.iter().cloned().map(Entity::new).collect();
    let reported_total = TOTAL_EXTRACTORS.iter().find_map(|extract| extract(body));

    Ok(PageResult::new(entities, reported_total))
}

fn pagination_total(body: &Value) -> Option<u64> {
    body.get("meta")?.get("pagination")?.get("total")?.as_u64()
}

fn plain_total(body: &Value) -> Option<u64> {
    body.get("total")?.as_u64()
}

fn total_count(body: &Value) -> Option<u64> {
    body.get("totalCount")?.as_u64()
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
