// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Query catalog: one `<key>.rq` file per query, kind inferred from the key.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CatalogError;

pub const QUERY_EXTENSION: &str = "rq";

/// Rendering strategy for a query's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualizationKind {
    TimeSeries,
    AggregateBar,
    RangeBand,
    SeverityScatter,
    ScalarMetric,
}

impl VisualizationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VisualizationKind::TimeSeries => "time-series",
            VisualizationKind::AggregateBar => "aggregate-bar",
            VisualizationKind::RangeBand => "range-band",
            VisualizationKind::SeverityScatter => "severity-scatter",
            VisualizationKind::ScalarMetric => "scalar-metric",
        }
    }

    /// Parse a kind name; anything unrecognised renders as a time series.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "aggregate-bar" | "bar" => VisualizationKind::AggregateBar,
            "range-band" | "band" | "area" => VisualizationKind::RangeBand,
            "severity-scatter" | "scatter" => VisualizationKind::SeverityScatter,
            "scalar-metric" | "metric" => VisualizationKind::ScalarMetric,
            _ => VisualizationKind::TimeSeries,
        }
    }
}

impl fmt::Display for VisualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key prefix → kind. Evaluated in order, first match wins.
pub const KIND_RULES: &[(&str, VisualizationKind)] = &[
    ("hourly_avg", VisualizationKind::AggregateBar),
    ("daily_high_low", VisualizationKind::RangeBand),
    ("spikes_7d", VisualizationKind::SeverityScatter),
    ("median_last_hour", VisualizationKind::ScalarMetric),
];

pub fn infer_kind(key: &str) -> VisualizationKind {
    KIND_RULES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(VisualizationKind::TimeSeries)
}

/// `spikes_7d` → `Spikes 7D`. A letter is upper-cased when the character
/// before it is not a letter, and lower-cased otherwise.
pub fn title_from_key(key: &str) -> String {
    let mut title = String::with_capacity(key.len());
    let mut prev_is_letter = false;
    for c in key.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if c.is_alphabetic() {
            if prev_is_letter {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            title.push(c);
            prev_is_letter = false;
        }
    }
    title
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDefinition {
    pub key: String,
    pub title: String,
    pub kind: VisualizationKind,
    pub text: String,
}

impl QueryDefinition {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            title: title_from_key(&key),
            kind: infer_kind(&key),
            text: text.into(),
            key,
        }
    }
}

/// Ordered set of query definitions plus an optional notice explaining why
/// it is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    definitions: Vec<QueryDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

impl Catalog {
    pub fn from_definitions(definitions: Vec<QueryDefinition>) -> Self {
        Self {
            definitions,
            notice: None,
        }
    }

    /// Load every `*.rq` file in `dir`. Never fails: an absent, unreadable or
    /// empty directory yields an empty catalog with a notice.
    pub fn load(dir: &Path) -> Self {
        match read_definitions(dir) {
            Ok(definitions) if definitions.is_empty() => {
                let notice = format!("no query files found in {}", dir.display());
                warn!("{notice}");
                Self {
                    definitions,
                    notice: Some(notice),
                }
            }
            Ok(definitions) => {
                debug!(dir = %dir.display(), count = definitions.len(), "Loaded query catalog");
                Self::from_definitions(definitions)
            }
            Err(e) => {
                warn!(error = %e, "Query catalog unavailable, continuing with empty catalog");
                Self {
                    definitions: Vec::new(),
                    notice: Some(e.to_string()),
                }
            }
        }
    }

    pub fn definitions(&self) -> &[QueryDefinition] {
        &self.definitions
    }

    pub fn get(&self, key: &str) -> Option<&QueryDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

fn read_definitions(dir: &Path) -> Result<Vec<QueryDefinition>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::Missing(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut query_files: Vec<PathBuf> = entries
        .filter_map(|e| match e {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| {
            let is_query = path.is_file()
                && path.extension().is_some_and(|ext| ext == QUERY_EXTENSION);
            if !is_query {
                debug!("skipping non-query file: {}", path.display());
            }
            is_query
        })
        .collect();

    query_files.sort();

    let mut definitions = Vec::with_capacity(query_files.len());
    for path in query_files {
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => {
                warn!("skipping {}: file is empty", path.display());
            }
            Ok(text) => definitions.push(QueryDefinition::new(key, text.trim())),
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(definitions)
}
