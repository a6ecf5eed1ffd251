// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Process-wide result cache keyed by exact query text.
//!
//! Freshness is checked on every read against the caller's TTL, so executors
//! with different TTLs can share one cache. Entries older than the cache's
//! retention (the longest reader TTL) are dropped on every insert, so
//! one-off query texts do not accumulate. The lock is never held across an
//! await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::result::QueryResult;

struct CacheEntry {
    result: Arc<QueryResult>,
    fetched_at: Instant,
}

pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    retention: Duration,
}

impl ResultCache {
    /// `retention` must cover the longest TTL any reader passes to
    /// [`ResultCache::get_fresh`].
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached result for `key` if it was fetched less than `ttl` ago.
    /// Entries past the retention are evicted; entries that are only stale
    /// for this reader stay for readers with a longer TTL.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<Arc<QueryResult>> {
        let mut entries = self.entries();
        let age = entries.get(key)?.fetched_at.elapsed();
        if age < ttl {
            return entries.get(key).map(|entry| entry.result.clone());
        }
        if age >= self.retention {
            entries.remove(key);
        }
        None
    }

    /// Store `result` as fetched now and drop every entry past the retention.
    /// Last writer wins.
    pub fn insert(&self, key: impl Into<String>, result: Arc<QueryResult>) {
        let retention = self.retention;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < retention);
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, "Dropped expired cache entries");
        }
        entries.insert(
            key.into(),
            CacheEntry {
                result,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
