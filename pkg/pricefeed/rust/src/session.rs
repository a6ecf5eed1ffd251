// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Per-session selection state for the on-demand panel.
//!
//! `Idle` → `Selected` → `Executed`. Selecting another key moves back to
//! `Selected` but keeps the previous result visible; only an explicit execute
//! replaces the executed key and result, and it replaces both together.
//!
//! Sessions are dropped after an idle period and the store holds at most a
//! fixed number of them, evicting the least recently touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::result::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Selected,
    Executed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub key: String,
    pub result: Arc<QueryResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSession {
    selected: Option<String>,
    executed: Option<ExecutedQuery>,
}

impl DashboardSession {
    pub fn phase(&self) -> SessionPhase {
        match (&self.selected, &self.executed) {
            (None, _) => SessionPhase::Idle,
            (Some(sel), Some(exec)) if *sel == exec.key => SessionPhase::Executed,
            (Some(_), _) => SessionPhase::Selected,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn executed(&self) -> Option<&ExecutedQuery> {
        self.executed.as_ref()
    }

    pub fn select(&mut self, key: impl Into<String>) {
        self.selected = Some(key.into());
    }

    /// Store the result of executing `key`.
    ///
    /// A selection made while the query was running is kept: the session then
    /// shows the new selection next to the result it has not run yet.
    pub fn record_execution(&mut self, key: impl Into<String>, result: Arc<QueryResult>) {
        let key = key.into();
        if self.selected.is_none() {
            self.selected = Some(key.clone());
        }
        self.executed = Some(ExecutedQuery { key, result });
    }
}

struct SessionEntry {
    session: DashboardSession,
    touched: Instant,
}

/// Sessions keyed by an opaque client-chosen id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Lock the map and drop sessions idle for longer than the TTL.
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let idle_ttl = self.idle_ttl;
        sessions.retain(|_, entry| entry.touched.elapsed() < idle_ttl);
        sessions
    }

    /// Snapshot of a session; unknown or expired ids are idle. Reading an
    /// existing session counts as activity.
    pub fn get(&self, id: &str) -> DashboardSession {
        let mut sessions = self.sessions();
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.touched = Instant::now();
                entry.session.clone()
            }
            None => DashboardSession::default(),
        }
    }

    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut DashboardSession) -> R) -> R {
        let mut sessions = self.sessions();
        if !sessions.contains_key(id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(session = %oldest, "Session limit reached, dropping least recent");
                sessions.remove(&oldest);
            }
        }
        let entry = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionEntry {
                session: DashboardSession::default(),
                touched: Instant::now(),
            });
        entry.touched = Instant::now();
        f(&mut entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::raw;

    fn result(v: &str) -> Arc<QueryResult> {
        Arc::new(QueryResult::from_raw(raw(&["valor"], &[&[Some(v)]])))
    }

    #[test]
    fn test_state_machine() {
        let mut session = DashboardSession::default();
        assert_eq!(session.phase(), SessionPhase::Idle);

        session.select("hourly_avg_24h");
        assert_eq!(session.phase(), SessionPhase::Selected);
        assert!(session.executed().is_none());

        session.record_execution("hourly_avg_24h", result("1"));
        assert_eq!(session.phase(), SessionPhase::Executed);
    }

    #[test]
    fn test_reselect_keeps_previous_result_until_execute() {
        let mut session = DashboardSession::default();
        session.record_execution("hourly_avg_24h", result("1"));

        session.select("spikes_7d");
        assert_eq!(session.phase(), SessionPhase::Selected);
        let kept = session.executed().unwrap();
        assert_eq!(kept.key, "hourly_avg_24h");

        session.record_execution("spikes_7d", result("2"));
        let replaced = session.executed().unwrap();
        assert_eq!(replaced.key, "spikes_7d");
        assert_eq!(replaced.result.rows[0][0].as_text(), Some("2"));
        assert_eq!(session.selected(), Some("spikes_7d"));
    }

    #[test]
    fn test_selection_made_during_execution_survives() {
        let mut session = DashboardSession::default();
        session.select("hourly_avg_24h");
        // execution of hourly_avg_24h is in flight when the user picks another key
        session.select("spikes_7d");
        session.record_execution("hourly_avg_24h", result("1"));

        assert_eq!(session.selected(), Some("spikes_7d"));
        assert_eq!(session.executed().unwrap().key, "hourly_avg_24h");
        assert_eq!(session.phase(), SessionPhase::Selected);
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(1800), 10_000)
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_isolates_sessions() {
        let store = store();
        store.update("a", |s| s.select("latest_20"));

        assert_eq!(store.get("a").phase(), SessionPhase::Selected);
        assert_eq!(store.get("b").phase(), SessionPhase::Idle);
        assert_eq!(store.len(), 1, "reading does not create sessions");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_dropped() {
        let store = store();
        for i in 0..100 {
            store.update(&format!("s{i}"), |s| s.select("latest_20"));
        }
        store.update("active", |s| s.select("spikes_7d"));
        assert_eq!(store.len(), 101);

        tokio::time::advance(Duration::from_secs(1000)).await;
        assert_eq!(store.get("active").phase(), SessionPhase::Selected);

        tokio::time::advance(Duration::from_secs(1000)).await;
        assert_eq!(store.len(), 1, "only the session read 1000s ago is left");
        assert_eq!(store.get("active").selected(), Some("spikes_7d"));
        assert_eq!(store.get("s0").phase(), SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_is_capped_by_least_recent() {
        let store = SessionStore::new(Duration::from_secs(1800), 3);
        for id in ["a", "b", "c"] {
            store.update(id, |s| s.select("latest_20"));
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        store.get("a");
        store.update("d", |s| s.select("latest_20"));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b").phase(), SessionPhase::Idle);
        assert_eq!(store.get("a").phase(), SessionPhase::Selected);
        assert_eq!(store.get("d").phase(), SessionPhase::Selected);
    }
}
