// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Column typing for untyped store results.
//!
//! Each column is converted as a unit: either every non-null cell takes the
//! column's new type or the column is left exactly as it was.
//!
//! Coercion order:
//! - columns whose name carries a temporal hint as a whole `_`-separated
//!   token, optionally plural (`hour`, `hora`, `day`, `dia`, `date`, `data`,
//!   `timestamp`; so `dia` and `day_bucket` but not `media` or
//!   `metadata`): date/time strings, then epoch numbers. The
//!   epoch unit is picked once per column from the largest magnitude
//!   (> 1e14 nanoseconds, > 1e11 milliseconds, otherwise seconds). If neither
//!   fits, the column stays raw and a warning is recorded.
//! - all other columns: numbers, then date/time strings, then categorical text.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::result::{ColumnType, NormalizationWarning, QueryResult, Value};

static TEMPORAL_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|_)(hour|hora|day|dia|date|data|timestamp)s?(_|$)")
        .expect("invalid regex")
});

/// Naive layouts, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];

const NANOS_THRESHOLD: f64 = 1e14;
const MILLIS_THRESHOLD: f64 = 1e11;

pub fn is_temporal_hint(column: &str) -> bool {
    TEMPORAL_HINT.is_match(column)
}

/// Structured date/time parse: RFC 3339, ISO-like naive timestamps (UTC) or a
/// plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EpochNumber {
    Int(i64),
    Float(f64),
}

impl EpochNumber {
    fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        s.parse::<i64>()
            .map(EpochNumber::Int)
            .ok()
            .or_else(|| parse_number(s).map(EpochNumber::Float))
    }

    fn magnitude(self) -> f64 {
        match self {
            EpochNumber::Int(v) => (v as f64).abs(),
            EpochNumber::Float(v) => v.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Milliseconds,
    Nanoseconds,
}

impl EpochUnit {
    /// Unit implied by the largest absolute value in a column.
    pub fn for_magnitude(max_abs: f64) -> Self {
        if max_abs > NANOS_THRESHOLD {
            EpochUnit::Nanoseconds
        } else if max_abs > MILLIS_THRESHOLD {
            EpochUnit::Milliseconds
        } else {
            EpochUnit::Seconds
        }
    }

    fn per_second(self) -> f64 {
        match self {
            EpochUnit::Seconds => 1.0,
            EpochUnit::Milliseconds => 1e3,
            EpochUnit::Nanoseconds => 1e9,
        }
    }

    fn to_instant(self, n: EpochNumber) -> Option<DateTime<Utc>> {
        match (self, n) {
            (EpochUnit::Seconds, EpochNumber::Int(v)) => DateTime::from_timestamp(v, 0),
            (EpochUnit::Milliseconds, EpochNumber::Int(v)) => DateTime::from_timestamp_millis(v),
            (EpochUnit::Nanoseconds, EpochNumber::Int(v)) => Some(DateTime::from_timestamp_nanos(v)),
            (unit, EpochNumber::Float(v)) => {
                let total = v / unit.per_second();
                let secs = total.floor();
                if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
                    return None;
                }
                let nanos = (((total - secs) * 1e9).round() as u32).min(999_999_999);
                DateTime::from_timestamp(secs as i64, nanos)
            }
        }
    }
}

enum Outcome {
    Typed(ColumnType, Vec<Value>),
    Unchanged,
    Untyped(String),
}

/// Type every `Raw` column of `result`. Never fails; columns that cannot be
/// converted are reported in `result.warnings`.
pub fn normalize(mut result: QueryResult) -> QueryResult {
    if result.is_error() {
        return result;
    }

    for idx in 0..result.columns.len() {
        if result.column_types.get(idx) != Some(&ColumnType::Raw) {
            continue;
        }

        let cells: Vec<&str> = result
            .rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(Value::as_text))
            .collect();

        match coerce(&result.columns[idx], &cells) {
            Outcome::Typed(column_type, values) => {
                let mut values = values.into_iter();
                for row in &mut result.rows {
                    if let Some(cell) = row.get_mut(idx).filter(|c| !c.is_null()) {
                        if let Some(value) = values.next() {
                            *cell = value;
                        }
                    }
                }
                result.column_types[idx] = column_type;
            }
            Outcome::Unchanged => {}
            Outcome::Untyped(reason) => {
                tracing::debug!(column = %result.columns[idx], %reason, "Column left untyped");
                result.warnings.push(NormalizationWarning {
                    column: result.columns[idx].clone(),
                    reason,
                });
            }
        }
    }
    result
}

fn coerce(column: &str, cells: &[&str]) -> Outcome {
    if cells.is_empty() {
        return Outcome::Unchanged;
    }

    if is_temporal_hint(column) {
        if let Some(values) = all_datetimes(cells) {
            return Outcome::Typed(ColumnType::Temporal, values);
        }
        return match epoch_instants(cells) {
            Ok(values) => Outcome::Typed(ColumnType::Temporal, values),
            Err(bad) => Outcome::Untyped(format!(
                "value {bad:?} is neither a date/time nor an epoch number"
            )),
        };
    }

    if let Some(values) = cells
        .iter()
        .map(|s| parse_number(s).map(Value::Number))
        .collect::<Option<Vec<_>>>()
    {
        return Outcome::Typed(ColumnType::Numeric, values);
    }
    if let Some(values) = all_datetimes(cells) {
        return Outcome::Typed(ColumnType::Temporal, values);
    }
    Outcome::Typed(
        ColumnType::Categorical,
        cells.iter().map(|s| Value::Text(s.to_string())).collect(),
    )
}

fn all_datetimes(cells: &[&str]) -> Option<Vec<Value>> {
    cells
        .iter()
        .map(|s| parse_datetime(s).map(Value::Instant))
        .collect()
}

/// Convert the whole column with one unit, or return the first offending cell.
fn epoch_instants<'a>(cells: &[&'a str]) -> Result<Vec<Value>, &'a str> {
    let numbers = cells
        .iter()
        .map(|s| EpochNumber::parse(s).ok_or(*s))
        .collect::<Result<Vec<_>, _>>()?;
    let max_abs = numbers
        .iter()
        .map(|n| n.magnitude())
        .fold(0.0_f64, f64::max);
    let unit = EpochUnit::for_magnitude(max_abs);

    numbers
        .iter()
        .zip(cells)
        .map(|(n, s)| unit.to_instant(*n).map(Value::Instant).ok_or(*s))
        .collect()
}
