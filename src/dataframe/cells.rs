//! Typed cell values and their wire text
//!
//! The service moves every cell as a string. Floats are written with the
//! shortest digits that parse back to the same value, and timestamps as
//! RFC 3339 UTC with only as many fractional digits as they need.

use super::models::{Column, DataFrame, DataType};
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// One typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Data type this value belongs to, `None` for null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(DataType::Bool),
            Self::Int32(_) => Some(DataType::Int32),
            Self::Int64(_) => Some(DataType::Int64),
            Self::Float32(_) => Some(DataType::Float32),
            Self::Float64(_) => Some(DataType::Float64),
            Self::String(_) => Some(DataType::String),
            Self::Timestamp(_) => Some(DataType::Timestamp),
        }
    }
}

/// Wire text of a cell; `None` for null
pub fn encode_cell(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Null => None,
        CellValue::Bool(v) => Some(v.to_string()),
        CellValue::Int32(v) => Some(v.to_string()),
        CellValue::Int64(v) => Some(v.to_string()),
        CellValue::Float32(v) => Some(format_f32(*v)),
        CellValue::Float64(v) => Some(format_f64(*v)),
        CellValue::String(v) => Some(v.clone()),
        CellValue::Timestamp(v) => Some(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

/// Parse a cell's wire text according to its column
pub fn decode_cell(text: Option<&str>, column: &Column) -> Result<CellValue> {
    let Some(text) = text else {
        if column.is_nullable() {
            return Ok(CellValue::Null);
        }
        return Err(Error::cell_parse(
            &column.name,
            "null",
            "column is not nullable",
        ));
    };

    let fail = |message: String| Error::cell_parse(&column.name, text, message);

    match column.data_type {
        DataType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(CellValue::Bool(true)),
            "false" => Ok(CellValue::Bool(false)),
            _ => Err(fail("expected true or false".to_string())),
        },
        DataType::Int32 => text
            .parse()
            .map(CellValue::Int32)
            .map_err(|e| fail(e.to_string())),
        DataType::Int64 => text
            .parse()
            .map(CellValue::Int64)
            .map_err(|e| fail(e.to_string())),
        DataType::Float32 => parse_f32(text)
            .map(CellValue::Float32)
            .ok_or_else(|| fail("not a number".to_string())),
        DataType::Float64 => parse_f64(text)
            .map(CellValue::Float64)
            .ok_or_else(|| fail("not a number".to_string())),
        DataType::String => Ok(CellValue::String(text.to_string())),
        DataType::Timestamp => DateTime::parse_from_rfc3339(text)
            .map(|ts| CellValue::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| fail(e.to_string())),
    }
}

/// Build a row batch from typed rows, in the given column order
pub fn frame_from_values(columns: &[Column], rows: &[Vec<CellValue>]) -> Result<DataFrame> {
    let mut data = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(Error::invalid_argument(format!(
                "row {index} has {} values but {} columns are declared",
                row.len(),
                columns.len()
            )));
        }
        let mut cells = Vec::with_capacity(row.len());
        for (value, column) in row.iter().zip(columns) {
            if let Some(actual) = value.data_type() {
                if actual != column.data_type {
                    return Err(Error::invalid_argument(format!(
                        "row {index}: column '{}' is {:?} but got a {:?} value",
                        column.name, column.data_type, actual
                    )));
                }
            }
            cells.push(encode_cell(value));
        }
        data.push(cells);
    }

    let names = columns.iter().map(|c| c.name.clone()).collect();
    Ok(DataFrame::new(names, data))
}

/// Parse a row batch back into typed rows.
///
/// When the frame names its columns they are matched to `columns` by name;
/// otherwise rows are taken to follow `columns` in order.
pub fn values_from_frame(columns: &[Column], frame: &DataFrame) -> Result<Vec<Vec<CellValue>>> {
    let ordered = ordered_columns(columns, frame)?;

    frame
        .data
        .iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != ordered.len() {
                return Err(Error::invalid_argument(format!(
                    "row {index} has {} values but {} columns are expected",
                    row.len(),
                    ordered.len()
                )));
            }
            row.iter()
                .zip(&ordered)
                .map(|(cell, column)| decode_cell(cell.as_deref(), column))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

/// The table columns a frame's cells correspond to, in cell order
pub(crate) fn ordered_columns<'a>(columns: &'a [Column], frame: &DataFrame) -> Result<Vec<&'a Column>> {
    match &frame.columns {
        Some(names) => names
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .find(|c| &c.name == name)
                    .ok_or_else(|| Error::invalid_argument(format!("unknown column '{name}'")))
            })
            .collect(),
        None => Ok(columns.iter().collect()),
    }
}

// ============================================================================
// Floats
// ============================================================================

fn format_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        String::from(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else if v != 0.0 && !(1e-5..1e16).contains(&v.abs()) {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

fn format_f32(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        String::from(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else if v != 0.0 && !(1e-5..1e16).contains(&v.abs()) {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

fn parse_f64(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

fn parse_f32(text: &str) -> Option<f32> {
    match text {
        "NaN" => Some(f32::NAN),
        "Infinity" => Some(f32::INFINITY),
        "-Infinity" => Some(f32::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case(0.1; "tenth")]
    #[test_case(1.0 / 3.0; "third")]
    #[test_case(f64::MAX; "max")]
    #[test_case(f64::MIN_POSITIVE; "min positive")]
    #[test_case(5e-324; "smallest subnormal")]
    #[test_case(-123_456.789; "negative")]
    #[test_case(1e16; "exponent boundary")]
    fn test_f64_round_trip(v: f64) {
        let text = format_f64(v);
        assert_eq!(parse_f64(&text), Some(v), "{text}");
    }

    #[test_case(0.1; "tenth")]
    #[test_case(f32::MAX; "max")]
    #[test_case(f32::MIN_POSITIVE; "min positive")]
    #[test_case(-2.5; "negative")]
    fn test_f32_round_trip(v: f32) {
        let text = format_f32(v);
        assert_eq!(parse_f32(&text), Some(v), "{text}");
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(format_f64(f64::INFINITY), "Infinity");
        assert_eq!(format_f64(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_f32(f32::NAN), "NaN");
        assert!(parse_f64("NaN").unwrap().is_nan());
        assert_eq!(parse_f32("-Infinity"), Some(f32::NEG_INFINITY));
        assert_eq!(format_f64(1e20), "1e20");
        assert_eq!(format_f64(2.5), "2.5");
    }

    #[test]
    fn test_timestamp_keeps_nanoseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let text = encode_cell(&CellValue::Timestamp(ts)).unwrap();
        assert_eq!(text, "2023-11-14T22:13:20.123456789Z");

        let column = Column::normal("t", DataType::Timestamp);
        assert_eq!(
            decode_cell(Some(text.as_str()), &column).unwrap(),
            CellValue::Timestamp(ts)
        );
    }

    #[test]
    fn test_timestamp_with_offset_is_normalized() {
        let column = Column::normal("t", DataType::Timestamp);
        let value = decode_cell(Some("2024-01-01T02:00:00+02:00"), &column).unwrap();
        assert_eq!(
            value,
            CellValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_null_handling() {
        let nullable = Column::nullable("n", DataType::Int32);
        assert_eq!(decode_cell(None, &nullable).unwrap(), CellValue::Null);

        let normal = Column::normal("n", DataType::Int32);
        let err = decode_cell(None, &normal).unwrap_err();
        assert!(err.to_string().contains("not nullable"));
    }

    #[test_case(DataType::Bool, "yes"; "bool")]
    #[test_case(DataType::Int32, "3000000000"; "int32 overflow")]
    #[test_case(DataType::Int64, "1.5"; "int64 fraction")]
    #[test_case(DataType::Float64, "abc"; "float")]
    #[test_case(DataType::Timestamp, "yesterday"; "timestamp")]
    fn test_decode_rejects(data_type: DataType, text: &str) {
        let column = Column::normal("c", data_type);
        let err = decode_cell(Some(text), &column).unwrap_err();
        assert!(matches!(err, Error::CellParse { .. }));
    }

    #[test]
    fn test_frame_round_trip() {
        let columns = vec![
            Column::index("i", DataType::Int64),
            Column::nullable("f", DataType::Float64),
            Column::normal("b", DataType::Bool),
            Column::nullable("s", DataType::String),
        ];
        let rows = vec![
            vec![
                CellValue::Int64(1),
                CellValue::Float64(f64::MIN_POSITIVE),
                CellValue::Bool(true),
                CellValue::String("a,b".to_string()),
            ],
            vec![
                CellValue::Int64(i64::MAX),
                CellValue::Null,
                CellValue::Bool(false),
                CellValue::Null,
            ],
        ];

        let frame = frame_from_values(&columns, &rows).unwrap();
        assert_eq!(frame.data[1][1], None);
        assert_eq!(values_from_frame(&columns, &frame).unwrap(), rows);
    }

    #[test]
    fn test_values_from_frame_reorders_by_name() {
        let columns = vec![
            Column::index("i", DataType::Int32),
            Column::normal("s", DataType::String),
        ];
        let frame = DataFrame::new(
            vec!["s".to_string(), "i".to_string()],
            vec![vec![Some("x".to_string()), Some("7".to_string())]],
        );
        let rows = values_from_frame(&columns, &frame).unwrap();
        assert_eq!(
            rows,
            vec![vec![CellValue::String("x".to_string()), CellValue::Int32(7)]]
        );
    }

    #[test]
    fn test_frame_from_values_type_mismatch() {
        let columns = vec![Column::index("i", DataType::Int32)];
        let err = frame_from_values(&columns, &[vec![CellValue::Int64(1)]]).unwrap_err();
        assert!(err.is_usage());
    }
}
