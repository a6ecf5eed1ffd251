// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Maps a normalized result and its visualization kind to a chart-agnostic
//! render spec. Pure: no fetching, no state.

use std::cmp::Ordering;

use serde::Serialize;

use crate::catalog::VisualizationKind;
use crate::result::{ColumnType, FailureKind, QueryResult, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: Value,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandPoint {
    pub x: Value,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: Value,
    pub severity: f64,
    /// Marker size, `|severity|`.
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderSpec {
    NoData {
        message: String,
    },
    Error {
        kind: FailureKind,
        message: String,
    },
    Invalid {
        reason: String,
    },
    TimeSeries {
        x: String,
        y: String,
        points: Vec<Point>,
        skipped_rows: usize,
    },
    Bar {
        x: String,
        y: String,
        bars: Vec<Point>,
        skipped_rows: usize,
    },
    Band {
        x: String,
        bounds: [String; 2],
        points: Vec<BandPoint>,
        skipped_rows: usize,
    },
    Scatter {
        x: String,
        y: String,
        points: Vec<ScatterPoint>,
        color_domain: [f64; 2],
        skipped_rows: usize,
    },
    Metric {
        value: f64,
        formatted: String,
    },
}

impl RenderSpec {
    fn invalid(reason: impl Into<String>) -> Self {
        RenderSpec::Invalid {
            reason: reason.into(),
        }
    }
}

pub const NO_DATA_MESSAGE: &str = "query returned no rows";

#[derive(Debug, Clone)]
pub struct Dispatcher {
    unit_prefix: String,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new("R$")
    }
}

impl Dispatcher {
    pub fn new(unit_prefix: impl Into<String>) -> Self {
        Self {
            unit_prefix: unit_prefix.into(),
        }
    }

    /// Failure wins over emptiness, emptiness over the kind's column contract.
    pub fn dispatch(&self, kind: VisualizationKind, result: &QueryResult) -> RenderSpec {
        if let Some(failure) = &result.error {
            return RenderSpec::Error {
                kind: failure.kind,
                message: failure.message.clone(),
            };
        }
        if result.is_empty() {
            return RenderSpec::NoData {
                message: NO_DATA_MESSAGE.to_string(),
            };
        }

        match kind {
            VisualizationKind::TimeSeries => time_series(result),
            VisualizationKind::AggregateBar => bar(result),
            VisualizationKind::RangeBand => band(result),
            VisualizationKind::SeverityScatter => scatter(result),
            VisualizationKind::ScalarMetric => self.metric(result),
        }
    }

    fn metric(&self, result: &QueryResult) -> RenderSpec {
        match result.rows[0].first() {
            Some(Value::Number(value)) => RenderSpec::Metric {
                value: *value,
                formatted: format_currency(&self.unit_prefix, *value),
            },
            Some(Value::Null) => RenderSpec::NoData {
                message: "metric value is empty".to_string(),
            },
            Some(other) => RenderSpec::invalid(format!(
                "scalar metric needs a numeric first value, got {other:?}"
            )),
            None => RenderSpec::invalid("scalar metric needs at least one column"),
        }
    }
}

/// `R$ 1,234.50`
pub fn format_currency(prefix: &str, value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{prefix} {sign}{grouped}.{frac}")
}

fn require_columns(result: &QueryResult, count: usize, kind: VisualizationKind) -> Option<RenderSpec> {
    (result.columns.len() < count).then(|| {
        RenderSpec::invalid(format!(
            "{kind} needs at least {count} columns, got {}",
            result.columns.len()
        ))
    })
}

fn require_numeric(result: &QueryResult, idx: usize, kind: VisualizationKind) -> Option<RenderSpec> {
    (result.column_types[idx] != ColumnType::Numeric).then(|| {
        RenderSpec::invalid(format!(
            "{kind} needs column '{}' to be numeric, it is {:?}",
            result.columns[idx], result.column_types[idx]
        ))
    })
}

/// Ordered axes need instants or numbers. An all-null axis is let through so
/// the rows are reported as skipped.
fn require_axis(result: &QueryResult, kind: VisualizationKind) -> Option<RenderSpec> {
    let axis_type = result.column_types[0];
    let ordered = matches!(axis_type, ColumnType::Temporal | ColumnType::Numeric);
    (!ordered && result.column(0).any(|v| !v.is_null())).then(|| {
        RenderSpec::invalid(format!(
            "{kind} needs column '{}' to be a time or number axis, it is {axis_type:?}",
            result.columns[0]
        ))
    })
}

/// Rows whose required cells are all present, as (axis, values).
fn complete_rows<'a>(
    result: &'a QueryResult,
    value_cols: &'a [usize],
) -> impl Iterator<Item = (&'a Value, Vec<f64>)> + 'a {
    result.rows.iter().filter_map(move |row| {
        let x = row.first().filter(|v| !v.is_null())?;
        let values = value_cols
            .iter()
            .map(|&idx| row.get(idx).and_then(Value::as_f64))
            .collect::<Option<Vec<_>>>()?;
        Some((x, values))
    })
}

fn compare_axis(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Instant(a), Value::Instant(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn points(result: &QueryResult, sort: bool) -> (Vec<Point>, usize) {
    let mut points: Vec<Point> = complete_rows(result, &[1])
        .map(|(x, values)| Point {
            x: x.clone(),
            y: values[0],
        })
        .collect();
    if sort {
        points.sort_by(|a, b| compare_axis(&a.x, &b.x));
    }
    let skipped = result.rows.len() - points.len();
    (points, skipped)
}

fn all_skipped(total: usize) -> RenderSpec {
    RenderSpec::NoData {
        message: format!("all {total} rows have missing values"),
    }
}

fn time_series(result: &QueryResult) -> RenderSpec {
    let kind = VisualizationKind::TimeSeries;
    if let Some(invalid) = require_columns(result, 2, kind)
        .or_else(|| require_axis(result, kind))
        .or_else(|| require_numeric(result, 1, kind))
    {
        return invalid;
    }
    let (points, skipped_rows) = points(result, true);
    if points.is_empty() {
        return all_skipped(skipped_rows);
    }
    RenderSpec::TimeSeries {
        x: result.columns[0].clone(),
        y: result.columns[1].clone(),
        points,
        skipped_rows,
    }
}

fn bar(result: &QueryResult) -> RenderSpec {
    let kind = VisualizationKind::AggregateBar;
    if let Some(invalid) =
        require_columns(result, 2, kind).or_else(|| require_numeric(result, 1, kind))
    {
        return invalid;
    }
    let (bars, skipped_rows) = points(result, false);
    if bars.is_empty() {
        return all_skipped(skipped_rows);
    }
    RenderSpec::Bar {
        x: result.columns[0].clone(),
        y: result.columns[1].clone(),
        bars,
        skipped_rows,
    }
}

fn band(result: &QueryResult) -> RenderSpec {
    let kind = VisualizationKind::RangeBand;
    if let Some(invalid) = require_columns(result, 3, kind)
        .or_else(|| require_axis(result, kind))
        .or_else(|| require_numeric(result, 1, kind))
        .or_else(|| require_numeric(result, 2, kind))
    {
        return invalid;
    }
    let mut points: Vec<BandPoint> = complete_rows(result, &[1, 2])
        .map(|(x, v)| BandPoint {
            x: x.clone(),
            low: v[0].min(v[1]),
            high: v[0].max(v[1]),
        })
        .collect();
    points.sort_by(|a, b| compare_axis(&a.x, &b.x));
    let skipped_rows = result.rows.len() - points.len();
    if points.is_empty() {
        return all_skipped(skipped_rows);
    }
    RenderSpec::Band {
        x: result.columns[0].clone(),
        bounds: [result.columns[1].clone(), result.columns[2].clone()],
        points,
        skipped_rows,
    }
}

fn scatter(result: &QueryResult) -> RenderSpec {
    let kind = VisualizationKind::SeverityScatter;
    if let Some(invalid) =
        require_columns(result, 2, kind).or_else(|| require_numeric(result, 1, kind))
    {
        return invalid;
    }
    let points: Vec<ScatterPoint> = complete_rows(result, &[1])
        .map(|(x, v)| ScatterPoint {
            x: x.clone(),
            severity: v[0],
            size: v[0].abs(),
        })
        .collect();
    let skipped_rows = result.rows.len() - points.len();
    if points.is_empty() {
        return all_skipped(skipped_rows);
    }
    let color_domain = points.iter().fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], p| {
        [lo.min(p.severity), hi.max(p.severity)]
    });
    RenderSpec::Scatter {
        x: result.columns[0].clone(),
        y: result.columns[1].clone(),
        points,
        color_domain,
        skipped_rows,
    }
}
