// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{RawResult, StoreClient};
use crate::error::StoreError;

#[derive(Default)]
struct FakeState {
    responses: HashMap<String, RawResult>,
    default_response: Option<RawResult>,
    submit_failures: VecDeque<StoreError>,
    append_failures: VecDeque<StoreError>,
    submitted: Vec<String>,
    appended: Vec<String>,
}

/// In-process store double. Replays scripted query responses, records every
/// submit and append, and can be told to fail the next N calls.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeState>,
    delay: Option<Duration>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `delay` (used to exercise timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Respond to `query` (exact text) with `result`.
    pub fn respond(&self, query: &str, result: RawResult) {
        self.state().responses.insert(query.to_string(), result);
    }

    /// Response for queries without a scripted answer. Without one they fail.
    pub fn respond_to_all(&self, result: RawResult) {
        self.state().default_response = Some(result);
    }

    pub fn fail_next_submit(&self, err: StoreError) {
        self.state().submit_failures.push_back(err);
    }

    pub fn fail_next_append(&self, err: StoreError) {
        self.state().append_failures.push_back(err);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state().submitted.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state().submitted.len()
    }

    pub fn appended(&self) -> Vec<String> {
        self.state().appended.clone()
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn submit(&self, query: &str) -> Result<RawResult, StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        state.submitted.push(query.to_string());
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }
        state
            .responses
            .get(query)
            .or(state.default_response.as_ref())
            .cloned()
            .ok_or_else(|| StoreError::Query(format!("no scripted response for: {query}")))
    }

    async fn append(&self, update: &str) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        if let Some(err) = state.append_failures.pop_front() {
            return Err(err);
        }
        state.appended.push(update.to_string());
        Ok(())
    }
}

/// Shorthand for building a `RawResult` from string literals in tests.
pub fn raw(columns: &[&str], rows: &[&[Option<&str>]]) -> RawResult {
    RawResult {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
            .collect(),
    }
}
