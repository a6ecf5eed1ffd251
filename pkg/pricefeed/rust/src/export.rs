// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! CSV export of a normalized result. Numeric columns are written as
//! floats, everything else as text (instants in RFC 3339).

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, StringBuilder};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::DashboardError;
use crate::result::{ColumnType, QueryResult, Value};

pub fn to_record_batch(result: &QueryResult) -> Result<RecordBatch, DashboardError> {
    let capacity = result.rows.len();
    let mut fields = Vec::with_capacity(result.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(result.columns.len());

    for (idx, name) in result.columns.iter().enumerate() {
        if result.column_types[idx] == ColumnType::Numeric {
            let mut builder = Float64Builder::with_capacity(capacity);
            for cell in result.column(idx) {
                builder.append_option(cell.as_f64());
            }
            fields.push(Field::new(name, DataType::Float64, true));
            arrays.push(Arc::new(builder.finish()));
        } else {
            let mut builder = StringBuilder::with_capacity(capacity, capacity * 24);
            for cell in result.column(idx) {
                match cell {
                    Value::Null => builder.append_null(),
                    other => builder.append_value(other.to_string()),
                }
            }
            fields.push(Field::new(name, DataType::Utf8, true));
            arrays.push(Arc::new(builder.finish()));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .map_err(|e| DashboardError::Export(e.to_string()))
}

/// CSV bytes with a header row. A result without columns exports as empty.
pub fn to_csv(result: &QueryResult) -> Result<Vec<u8>, DashboardError> {
    if result.columns.is_empty() {
        return Ok(Vec::new());
    }
    let batch = to_record_batch(result)?;
    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    writer
        .write(&batch)
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    Ok(writer.into_inner())
}

/// Download name for an exported query.
pub fn csv_file_name(key: &str) -> String {
    format!("{key}.csv")
}
