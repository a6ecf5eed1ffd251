// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Dashboard facade: catalog, the always-visible live panel, per-session
//! on-demand queries, ad-hoc queries and CSV export.
//!
//! Every action runs query → normalize → dispatch to completion and returns a
//! self-contained [`Panel`].

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::cache::ResultCache;
use crate::catalog::{Catalog, QueryDefinition, VisualizationKind, infer_kind, title_from_key};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::executor::CachedExecutor;
use crate::export;
use crate::normalize::normalize;
use crate::render::{Dispatcher, RenderSpec};
use crate::result::QueryResult;
use crate::session::{SessionPhase, SessionStore};
use crate::store::StoreClient;

/// Key used for ad-hoc query panels.
pub const CUSTOM_QUERY_KEY: &str = "custom";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub key: String,
    pub title: String,
    pub kind: VisualizationKind,
    pub query: String,
    pub result: QueryResult,
    pub render: RenderSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session: String,
    pub phase: SessionPhase,
    /// Selected definition, including its query text for display.
    pub selected: Option<QueryDefinition>,
    pub executed: Option<Panel>,
}

pub struct Dashboard {
    queries_dir: PathBuf,
    live_key: String,
    catalog: RwLock<Arc<Catalog>>,
    live: CachedExecutor,
    analysis: CachedExecutor,
    dispatcher: Dispatcher,
    sessions: SessionStore,
}

impl Dashboard {
    /// Build the dashboard and load the catalog once.
    pub fn new(store: Arc<dyn StoreClient>, config: &DashboardConfig, store_timeout: Duration) -> Self {
        let cache = Arc::new(ResultCache::new(config.live_ttl.max(config.query_ttl)));
        let catalog = Catalog::load(&config.queries_dir);
        Self {
            queries_dir: config.queries_dir.clone(),
            live_key: config.live_query_key.clone(),
            catalog: RwLock::new(Arc::new(catalog)),
            live: CachedExecutor::new(store.clone(), cache.clone(), config.live_ttl, store_timeout),
            analysis: CachedExecutor::new(store, cache, config.query_ttl, store_timeout),
            dispatcher: Dispatcher::new(config.currency_prefix.as_str()),
            sessions: SessionStore::new(config.session_idle_ttl, config.max_sessions),
        }
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the query directory and swap the catalog in one step.
    pub fn reload_catalog(&self) -> Arc<Catalog> {
        let fresh = Arc::new(Catalog::load(&self.queries_dir));
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = fresh.clone();
        tracing::info!(queries = fresh.len(), "Reloaded query catalog");
        fresh
    }

    fn definition(&self, key: &str) -> Result<QueryDefinition, DashboardError> {
        self.catalog()
            .get(key)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownKey(key.to_string()))
    }

    fn panel(&self, key: &str, title: &str, kind: VisualizationKind, query: &str, result: &QueryResult) -> Panel {
        Panel {
            key: key.to_string(),
            title: title.to_string(),
            kind,
            query: query.to_string(),
            render: self.dispatcher.dispatch(kind, result),
            result: result.clone(),
        }
    }

    async fn run(executor: &CachedExecutor, text: &str) -> Arc<QueryResult> {
        let raw = executor.execute(text).await;
        Arc::new(normalize(raw.as_ref().clone()))
    }

    /// The fixed live slot. Independent of every session.
    pub async fn live_panel(&self) -> Result<Panel, DashboardError> {
        let def = self.definition(&self.live_key)?;
        let result = Self::run(&self.live, &def.text).await;
        Ok(self.panel(&def.key, &def.title, def.kind, &def.text, &result))
    }

    /// Run a catalog query without touching any session.
    pub async fn execute_query(&self, key: &str) -> Result<Panel, DashboardError> {
        let def = self.definition(key)?;
        let result = Self::run(&self.analysis, &def.text).await;
        Ok(self.panel(&def.key, &def.title, def.kind, &def.text, &result))
    }

    /// Run ad-hoc query text, rendered as `kind`.
    pub async fn execute_text(&self, text: &str, kind: VisualizationKind) -> Result<Panel, DashboardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DashboardError::EmptyQuery);
        }
        let result = Self::run(&self.analysis, text).await;
        Ok(self.panel(CUSTOM_QUERY_KEY, "Custom Query", kind, text, &result))
    }

    pub fn select(&self, session: &str, key: &str) -> Result<SessionView, DashboardError> {
        self.definition(key)?;
        self.sessions.update(session, |s| s.select(key));
        Ok(self.session_view(session))
    }

    /// Execute the session's selected query and store its result, replacing
    /// the previous key and result together. A selection made while the
    /// query runs is kept.
    pub async fn execute(&self, session: &str) -> Result<SessionView, DashboardError> {
        let key = self
            .sessions
            .get(session)
            .selected()
            .map(str::to_string)
            .ok_or(DashboardError::NothingSelected)?;
        let def = self.definition(&key)?;
        let result = Self::run(&self.analysis, &def.text).await;
        self.sessions
            .update(session, |s| s.record_execution(def.key.as_str(), result));
        Ok(self.session_view(session))
    }

    pub fn session_view(&self, session: &str) -> SessionView {
        let state = self.sessions.get(session);
        let catalog = self.catalog();
        let executed = state.executed().map(|exec| match catalog.get(&exec.key) {
            Some(def) => self.panel(&def.key, &def.title, def.kind, &def.text, &exec.result),
            None => self.panel(
                &exec.key,
                &title_from_key(&exec.key),
                infer_kind(&exec.key),
                "",
                &exec.result,
            ),
        });
        SessionView {
            session: session.to_string(),
            phase: state.phase(),
            selected: state.selected().and_then(|key| catalog.get(key).cloned()),
            executed,
        }
    }

    /// CSV of the session's executed result, with its download name.
    pub fn export_csv(&self, session: &str) -> Result<(String, Vec<u8>), DashboardError> {
        let state = self.sessions.get(session);
        let exec = state.executed().ok_or(DashboardError::NothingExecuted)?;
        let bytes = export::to_csv(&exec.result)?;
        Ok((export::csv_file_name(&exec.key), bytes))
    }
}
