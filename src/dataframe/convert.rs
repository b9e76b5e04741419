//! Arrow conversion for DataFrame tables
//!
//! Provides utilities for inferring a table's columns from an Arrow schema
//! and converting between Arrow RecordBatches and row batches.

use super::cells::{decode_cell, encode_cell, ordered_columns, CellValue};
use super::models::{validate_columns, Column, ColumnType, DataFrame, DataType};
use crate::error::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt16Array,
    UInt32Array, UInt8Array,
};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Map an Arrow type to the column type that can hold it losslessly
pub fn column_data_type(arrow_type: &ArrowType) -> Option<DataType> {
    match arrow_type {
        ArrowType::Boolean => Some(DataType::Bool),
        ArrowType::Int8
        | ArrowType::Int16
        | ArrowType::Int32
        | ArrowType::UInt8
        | ArrowType::UInt16 => Some(DataType::Int32),
        ArrowType::Int64 | ArrowType::UInt32 => Some(DataType::Int64),
        ArrowType::Float32 => Some(DataType::Float32),
        ArrowType::Float64 => Some(DataType::Float64),
        ArrowType::Utf8 | ArrowType::LargeUtf8 => Some(DataType::String),
        ArrowType::Timestamp(_, _) => Some(DataType::Timestamp),
        _ => None,
    }
}

/// Infer a table's columns from an Arrow schema.
///
/// `index_column` becomes the INDEX column; other nullable fields become
/// NULLABLE columns.
pub fn infer_columns(schema: &Schema, index_column: &str) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let data_type = column_data_type(field.data_type()).ok_or_else(|| {
            Error::invalid_argument(format!(
                "column '{}' has unsupported Arrow type {}",
                field.name(),
                field.data_type()
            ))
        })?;

        let column_type = if field.name() == index_column {
            if !matches!(
                data_type,
                DataType::Int32 | DataType::Int64 | DataType::Timestamp
            ) {
                return Err(Error::invalid_argument(format!(
                    "index column '{index_column}' must be an integer or timestamp, not {data_type:?}"
                )));
            }
            ColumnType::Index
        } else if field.is_nullable() {
            ColumnType::Nullable
        } else {
            ColumnType::Normal
        };

        columns.push(Column::new(field.name().clone(), data_type, column_type));
    }

    if !columns.iter().any(|c| c.column_type == ColumnType::Index) {
        return Err(Error::invalid_argument(format!(
            "index column '{index_column}' is not in the schema"
        )));
    }
    validate_columns(&columns)?;
    Ok(columns)
}

/// Arrow schema matching a table's columns
pub fn arrow_schema(columns: &[&Column]) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|column| Field::new(&column.name, arrow_type(column.data_type), column.is_nullable()))
        .collect();
    Schema::new(fields)
}

fn arrow_type(data_type: DataType) -> ArrowType {
    match data_type {
        DataType::Bool => ArrowType::Boolean,
        DataType::Int32 => ArrowType::Int32,
        DataType::Int64 => ArrowType::Int64,
        DataType::Float32 => ArrowType::Float32,
        DataType::Float64 => ArrowType::Float64,
        DataType::String => ArrowType::Utf8,
        DataType::Timestamp => ArrowType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
    }
}

/// Convert an Arrow RecordBatch to a row batch naming every column
pub fn record_batch_to_frame(batch: &RecordBatch) -> Result<DataFrame> {
    let schema = batch.schema();
    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    let mut data = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut cells = Vec::with_capacity(batch.num_columns());
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let value = array_value(batch.column(col_idx).as_ref(), row, field.name())?;
            cells.push(encode_cell(&value));
        }
        data.push(cells);
    }

    Ok(DataFrame::new(names, data))
}

/// Convert a row batch to an Arrow RecordBatch using the table's columns
pub fn frame_to_record_batch(frame: &DataFrame, columns: &[Column]) -> Result<RecordBatch> {
    let ordered = ordered_columns(columns, frame)?;
    let schema = Arc::new(arrow_schema(&ordered));

    if frame.data.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    if let Some((row_idx, row)) = frame
        .data
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != ordered.len())
    {
        return Err(Error::invalid_argument(format!(
            "row {row_idx} has {} values but {} columns are expected",
            row.len(),
            ordered.len()
        )));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(ordered.len());
    for (col_idx, column) in ordered.iter().enumerate() {
        let mut values = Vec::with_capacity(frame.data.len());
        for row in &frame.data {
            values.push(decode_cell(row[col_idx].as_deref(), column)?);
        }
        arrays.push(build_array(&values, column)?);
    }

    RecordBatch::try_new(schema, arrays).map_err(|e| Error::Decode {
        message: format!("Failed to create RecordBatch: {e}"),
    })
}

/// Build an Arrow array from typed cells of one column
fn build_array(values: &[CellValue], column: &Column) -> Result<ArrayRef> {
    let mismatch = |value: &CellValue| {
        Error::cell_parse(
            &column.name,
            format!("{value:?}"),
            format!("expected a {:?} value", column.data_type),
        )
    };

    macro_rules! collect {
        ($array:ty, $variant:ident) => {{
            let items = values
                .iter()
                .map(|v| match v {
                    CellValue::$variant(x) => Ok(Some(x.clone())),
                    CellValue::Null => Ok(None),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(<$array>::from(items)) as ArrayRef
        }};
    }

    let array = match column.data_type {
        DataType::Bool => collect!(BooleanArray, Bool),
        DataType::Int32 => collect!(Int32Array, Int32),
        DataType::Int64 => collect!(Int64Array, Int64),
        DataType::Float32 => collect!(Float32Array, Float32),
        DataType::Float64 => collect!(Float64Array, Float64),
        DataType::String => collect!(StringArray, String),
        DataType::Timestamp => {
            let items = values
                .iter()
                .map(|v| match v {
                    CellValue::Timestamp(ts) => ts.timestamp_nanos_opt().map(Some).ok_or_else(|| {
                        Error::cell_parse(&column.name, ts.to_rfc3339(), "out of nanosecond range")
                    }),
                    CellValue::Null => Ok(None),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(TimestampNanosecondArray::from(items).with_timezone("UTC")) as ArrayRef
        }
    };

    Ok(array)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::decode(format!(
            "column '{name}' could not be read as {}",
            array.data_type()
        ))
    })
}

fn timestamp(value: i64, unit: &TimeUnit, name: &str) -> Result<DateTime<Utc>> {
    let (secs, nanos) = match unit {
        TimeUnit::Second => (value, 0),
        TimeUnit::Millisecond => (value.div_euclid(1_000), value.rem_euclid(1_000) * 1_000_000),
        TimeUnit::Microsecond => (value.div_euclid(1_000_000), value.rem_euclid(1_000_000) * 1_000),
        TimeUnit::Nanosecond => (value.div_euclid(1_000_000_000), value.rem_euclid(1_000_000_000)),
    };
    DateTime::from_timestamp(secs, nanos as u32)
        .ok_or_else(|| Error::cell_parse(name, value.to_string(), "timestamp out of range"))
}

/// Read a single array element as a typed cell
fn array_value(array: &dyn Array, row: usize, name: &str) -> Result<CellValue> {
    if array.is_null(row) {
        return Ok(CellValue::Null);
    }

    let value = match array.data_type() {
        ArrowType::Boolean => CellValue::Bool(downcast::<BooleanArray>(array, name)?.value(row)),
        ArrowType::Int8 => CellValue::Int32(downcast::<Int8Array>(array, name)?.value(row).into()),
        ArrowType::Int16 => {
            CellValue::Int32(downcast::<Int16Array>(array, name)?.value(row).into())
        }
        ArrowType::Int32 => CellValue::Int32(downcast::<Int32Array>(array, name)?.value(row)),
        ArrowType::UInt8 => {
            CellValue::Int32(downcast::<UInt8Array>(array, name)?.value(row).into())
        }
        ArrowType::UInt16 => {
            CellValue::Int32(downcast::<UInt16Array>(array, name)?.value(row).into())
        }
        ArrowType::Int64 => CellValue::Int64(downcast::<Int64Array>(array, name)?.value(row)),
        ArrowType::UInt32 => {
            CellValue::Int64(downcast::<UInt32Array>(array, name)?.value(row).into())
        }
        ArrowType::Float32 => {
            CellValue::Float32(downcast::<Float32Array>(array, name)?.value(row))
        }
        ArrowType::Float64 => {
            CellValue::Float64(downcast::<Float64Array>(array, name)?.value(row))
        }
        ArrowType::Utf8 => {
            CellValue::String(downcast::<StringArray>(array, name)?.value(row).to_string())
        }
        ArrowType::LargeUtf8 => CellValue::String(
            downcast::<LargeStringArray>(array, name)?
                .value(row)
                .to_string(),
        ),
        ArrowType::Timestamp(unit, _) => {
            let raw = match unit {
                TimeUnit::Second => downcast::<TimestampSecondArray>(array, name)?.value(row),
                TimeUnit::Millisecond => {
                    downcast::<TimestampMillisecondArray>(array, name)?.value(row)
                }
                TimeUnit::Microsecond => {
                    downcast::<TimestampMicrosecondArray>(array, name)?.value(row)
                }
                TimeUnit::Nanosecond => {
                    downcast::<TimestampNanosecondArray>(array, name)?.value(row)
                }
            };
            CellValue::Timestamp(timestamp(raw, unit, name)?)
        }
        other => {
            return Err(Error::invalid_argument(format!(
                "column '{name}' has unsupported Arrow type {other}"
            )))
        }
    };

    Ok(value)
}
