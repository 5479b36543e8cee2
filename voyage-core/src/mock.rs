//! In-process collaborators for tests and offline runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::provider::{ContextFields, ContextProvider, Prompt, ProviderError, SearchProvider, TextGenerator};
use crate::search::SearchQuery;

/// Returns the same raw batch for every query, or a fixed error
pub struct MockSearchProvider {
    result: Result<Vec<Value>, ProviderError>,
    calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new(records: Vec<Value>) -> Self {
        Self { result: Ok(records), calls: AtomicUsize::new(0) }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { result: Err(error), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<Value>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Serves fixed weather, optionally failing for every lookup
pub struct MockContextProvider {
    fields: ContextFields,
    fail: bool,
    calls: AtomicUsize,
}

impl MockContextProvider {
    pub fn new(fields: ContextFields) -> Self {
        Self { fields, fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn unavailable() -> Self {
        Self { fields: ContextFields::default(), fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for MockContextProvider {
    async fn get_context(&self, location: &str, _date: NaiveDate) -> Result<ContextFields, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Unavailable(format!("no forecast for {}", location)));
        }
        Ok(self.fields.clone())
    }
}

/// Replays queued responses in order; an exhausted queue fails every call
pub struct MockTextGenerator {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockTextGenerator {
    pub fn scripted(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::scripted(Vec::new())
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        let next = self.responses.lock().ok().and_then(|mut queue| queue.pop_front());
        next.unwrap_or_else(|| Err(ProviderError::Unavailable("generator offline".to_string())))
    }
}
