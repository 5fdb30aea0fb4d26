//! Scripted in-memory provider for unit tests

use crate::entity::Entity;
use crate::provider::{PageResult, SearchProvider, SearchRequest, TransportError};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Answers `(term, cursor)` pairs from a script; anything unscripted is an empty page
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    responses: HashMap<(String, u32), Result<PageResult, TransportError>>,
    calls: Mutex<Vec<SearchRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, term: &str, cursor: u32, page: PageResult) -> Self {
        self.responses.insert((term.to_string(), cursor), Ok(page));
        self
    }

    pub(crate) fn with_error(mut self, term: &str, cursor: u32, error: TransportError) -> Self {
        self.responses.insert((term.to_string(), cursor), Err(error));
        self
    }

    pub(crate) fn calls(&self) -> Vec<SearchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(&self, request: &SearchRequest) -> Result<PageResult, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .get(&(request.term.clone(), request.cursor))
            .cloned()
            .unwrap_or_else(|| Ok(PageResult::empty()))
    }
}

/// `count` entities keyed `{prefix}-{n}`
pub(crate) fn products(prefix: &str, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|n| Entity::new(json!({ "productId": format!("{}-{}", prefix, n) })))
        .collect()
}

pub(crate) fn page(entities: Vec<Entity>, reported_total: Option<u64>) -> PageResult {
    PageResult::new(entities, reported_total)
}
