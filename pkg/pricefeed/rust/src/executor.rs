// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::error::StoreError;
use crate::result::QueryResult;
use crate::store::StoreClient;

/// Memoizing front for `StoreClient::submit`.
///
/// Results are cached by exact query text for `ttl`. Store failures come back
/// as an error-flagged empty result and are never cached, so the next call
/// retries.
#[derive(Clone)]
pub struct CachedExecutor {
    store: Arc<dyn StoreClient>,
    cache: Arc<ResultCache>,
    ttl: Duration,
    timeout: Duration,
}

impl CachedExecutor {
    pub fn new(
        store: Arc<dyn StoreClient>,
        cache: Arc<ResultCache>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            timeout,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn execute(&self, text: &str) -> Arc<QueryResult> {
        if let Some(hit) = self.cache.get_fresh(text, self.ttl) {
            tracing::debug!(ttl_ms = self.ttl.as_millis() as u64, "Query cache hit");
            return hit;
        }

        match self.submit(text).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache.insert(text, result.clone());
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query failed");
                Arc::new(QueryResult::failed(&e))
            }
        }
    }

    async fn submit(&self, text: &str) -> Result<QueryResult, StoreError> {
        let raw = tokio::time::timeout(self.timeout, self.store.submit(text))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        Ok(QueryResult::from_raw(raw))
    }
}
