// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure talking to the SPARQL store, on either the query or update endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connectivity(String),
    #[error("store call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("store rejected credentials (HTTP {status})")]
    Auth { status: u16 },
    #[error("query failed: {0}")]
    Query(String),
}

/// Failure obtaining a price sample from the producer's upstream source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("price feed request failed: {0}")]
    Request(String),
    #[error("price feed returned HTTP {0}")]
    Status(u16),
    #[error("price feed response unusable: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("query directory does not exist: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read query directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("STORE_USER and STORE_PASSWORD must be set together")]
    PartialCredentials,
    #[error("PRICE_FEED_POINTER must be a JSON pointer starting with '/': {0}")]
    InvalidPointer(String),
}

/// Why a single producer tick was abandoned.
#[derive(Error, Debug)]
pub enum TickError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by dashboard actions that are not query failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DashboardError {
    #[error("unknown query key: {0}")]
    UnknownKey(String),
    #[error("no query selected")]
    NothingSelected,
    #[error("no executed result to export")]
    NothingExecuted,
    #[error("query text is empty")]
    EmptyQuery,
    #[error("export failed: {0}")]
    Export(String),
}
