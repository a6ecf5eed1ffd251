// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Store boundary: the SPARQL endpoint that observations are written to and
//! dashboard queries are evaluated against.
//!
//! - `fuseki` - HTTP client for a SPARQL 1.1 query/update endpoint pair
//! - `fake` - in-process store double that records appends and replays
//!   scripted query responses

pub mod fake;
pub mod fuseki;

use async_trait::async_trait;

use crate::error::StoreError;

pub use fake::FakeStore;
pub use fuseki::{Credentials, FusekiClient};

/// Untyped tabular response from the store: column names plus one optional
/// string per column per row (unbound variables are `None`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawResult {
    /// Build a result, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self, StoreError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(StoreError::Query(format!(
                "row {idx} has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(StoreError::Query(format!("duplicate column: {dup}")));
        }
        Ok(Self { columns, rows })
    }
}

/// Port for the external queryable store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Evaluate a read query and return its bindings.
    async fn submit(&self, query: &str) -> Result<RawResult, StoreError>;

    /// Apply an update (e.g. `INSERT DATA { ... }`).
    async fn append(&self, update: &str) -> Result<(), StoreError>;
}
