// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Tabular query results as seen by the dashboard: raw store bindings wrapped
//! with per-column types, an optional failure marker and normalization notes.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::store::RawResult;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Instant(DateTime<Utc>),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Instant(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Instant(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Untyped store strings, either not yet normalized or left as-is.
    Raw,
    Numeric,
    Temporal,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connectivity,
    Timeout,
    Auth,
    Query,
}

/// Why a result carries no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&StoreError> for QueryFailure {
    fn from(err: &StoreError) -> Self {
        let kind = match err {
            StoreError::Connectivity(_) => FailureKind::Connectivity,
            StoreError::Timeout(_) => FailureKind::Timeout,
            StoreError::Auth { .. } => FailureKind::Auth,
            StoreError::Query(_) => FailureKind::Query,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// A column that normalization had to leave untyped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationWarning {
    pub column: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NormalizationWarning>,
}

impl QueryResult {
    /// Wrap a store response. Every column starts out `Raw`.
    pub fn from_raw(raw: RawResult) -> Self {
        let column_types = vec![ColumnType::Raw; raw.columns.len()];
        let rows = raw
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map_or(Value::Null, Value::Text))
                    .collect()
            })
            .collect();
        Self {
            columns: raw.columns,
            column_types,
            rows,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Error-flagged empty result.
    pub fn failed(err: &StoreError) -> Self {
        Self {
            columns: Vec::new(),
            column_types: Vec::new(),
            rows: Vec::new(),
            error: Some(err.into()),
            warnings: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over one column's cells.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }
}
