//! Request and response models for the DataFrame service
//!
//! Field names are snake_case in Rust and lowerCamelCase on the wire.

use crate::error::{Error, Result};
use crate::pagination::ContinuationPage;
use crate::types::Properties;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Columns
// ============================================================================

/// Primitive type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Timestamp,
}

/// Role of a column within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Non-null, non-index column
    #[default]
    Normal,
    /// The table's single index column
    Index,
    /// Column whose cells may be null
    Nullable,
}

/// A column descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_type,
            properties: Properties::new(),
        }
    }

    pub fn index(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, ColumnType::Index)
    }

    pub fn normal(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, ColumnType::Normal)
    }

    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, ColumnType::Nullable)
    }

    pub fn is_nullable(&self) -> bool {
        self.column_type == ColumnType::Nullable
    }
}

/// Check a table schema: unique column names and exactly one index column
pub fn validate_columns(columns: &[Column]) -> Result<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(Error::invalid_argument(format!(
                "duplicate column name '{}'",
                column.name
            )));
        }
    }

    let indexes = columns
        .iter()
        .filter(|c| c.column_type == ColumnType::Index)
        .count();
    if indexes != 1 {
        return Err(Error::invalid_argument(format!(
            "a table needs exactly one INDEX column, found {indexes}"
        )));
    }
    Ok(())
}

// ============================================================================
// Tables
// ============================================================================

/// Metadata of a stored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub workspace: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata_revision: Option<u64>,
    #[serde(default)]
    pub rows_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default = "default_true")]
    pub supports_append: bool,
    #[serde(default)]
    pub properties: Properties,
}

fn default_true() -> bool {
    true
}

impl TableMetadata {
    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Request body for creating a table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

impl CreateTableRequest {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_columns(&self.columns)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateTableResponse {
    pub id: String,
}

/// Field to sort tables by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderBy {
    CreatedAt,
    MetadataModifiedAt,
    Name,
    NumberOfRows,
    RowsModifiedAt,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "CREATED_AT",
            Self::MetadataModifiedAt => "METADATA_MODIFIED_AT",
            Self::Name => "NAME",
            Self::NumberOfRows => "NUMBER_OF_ROWS",
            Self::RowsModifiedAt => "ROWS_MODIFIED_AT",
        }
    }
}

/// Query-string parameters of `GET /tables`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTablesRequest {
    pub take: Option<u32>,
    pub id: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub order_by_descending: Option<bool>,
    pub workspace: Vec<String>,
    pub continuation_token: Option<String>,
}

/// Body of `POST /query-tables`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTablesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substitutions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by_descending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// A page of table metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedTables {
    pub tables: Vec<TableMetadata>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl ContinuationPage for PagedTables {
    type Item = TableMetadata;

    fn into_parts(self) -> (Vec<TableMetadata>, Option<String>) {
        (self.tables, self.continuation_token)
    }
}

// ============================================================================
// Table modification
// ============================================================================

/// Column properties to change; a `None` value removes the property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadataPatch {
    pub name: String,
    pub properties: std::collections::HashMap<String, Option<String>>,
}

/// Body of `PATCH /tables/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyTableRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_revision: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<std::collections::HashMap<String, Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnMetadataPatch>>,
}

/// One table's changes in a bulk modification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadataModification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_revision: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<std::collections::HashMap<String, Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnMetadataPatch>>,
}

/// Body of `POST /modify-tables`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyTablesRequest {
    pub tables: Vec<TableMetadataModification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
}

/// Outcome of a bulk operation that may partially fail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResponse {
    #[serde(default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkOperationResponse {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of `POST /delete-tables`; `None` when every table was deleted
pub type DeleteTablesResponse = Option<BulkOperationResponse>;

/// Result of `POST /modify-tables`; `None` when every table was modified
pub type ModifyTablesResponse = Option<BulkOperationResponse>;

// ============================================================================
// Row data
// ============================================================================

/// A row-oriented batch: every cell is a string or null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFrame {
    /// Column order of `data`; the table's order when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    pub data: Vec<Vec<Option<String>>>,
}

impl DataFrame {
    pub fn new(columns: Vec<String>, data: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns: Some(columns),
            data,
        }
    }

    /// A batch whose rows follow the table's column order
    pub fn without_columns(data: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns: None,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check that every row is as wide as the declared columns, or as
    /// the first row when no columns are declared
    pub fn validate(&self) -> Result<()> {
        let width = match (&self.columns, self.data.first()) {
            (Some(columns), _) => columns.len(),
            (None, Some(first)) => first.len(),
            (None, None) => return Ok(()),
        };
        if let Some((index, row)) = self
            .data
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            let expected = if self.columns.is_some() {
                "columns are declared"
            } else {
                "values are in row 0"
            };
            return Err(Error::invalid_argument(format!(
                "row {index} has {} values but {width} {expected}",
                row.len()
            )));
        }
        Ok(())
    }
}

/// Body of a JSON append
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendTableDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<DataFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_data: Option<bool>,
}

impl AppendTableDataRequest {
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame: Some(frame),
            end_of_data: None,
        }
    }

    #[must_use]
    pub fn with_end_of_data(mut self, end_of_data: bool) -> Self {
        self.end_of_data = Some(end_of_data);
        self
    }

    /// A request that only flushes, sending no rows
    pub fn flush(end_of_data: bool) -> Self {
        Self {
            frame: None,
            end_of_data: Some(end_of_data),
        }
    }
}

/// Query-string parameters of `GET /tables/{id}/data`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetTableDataRequest {
    pub columns: Vec<String>,
    pub order_by: Vec<String>,
    pub order_by_descending: Option<bool>,
    pub take: Option<u32>,
    pub continuation_token: Option<String>,
}

/// Comparison used by a column filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperation {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Contains,
    NotContains,
}

/// Row filter on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilter {
    pub column: String,
    pub operation: FilterOperation,
    pub value: Option<String>,
}

impl ColumnFilter {
    pub fn new(
        column: impl Into<String>,
        operation: FilterOperation,
        value: Option<impl Into<String>>,
    ) -> Self {
        Self {
            column: column.into(),
            operation,
            value: value.map(Into::into),
        }
    }
}

/// Sort key for row queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOrderBy {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descending: Option<bool>,
}

/// Body of `POST /tables/{id}/query-data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTableDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ColumnFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<ColumnOrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// A page of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedTableRows {
    pub frame: DataFrame,
    #[serde(default)]
    pub total_row_count: u64,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl ContinuationPage for PagedTableRows {
    type Item = Vec<Option<String>>;

    fn into_parts(self) -> (Vec<Vec<Option<String>>>, Option<String>) {
        (self.frame.data, self.continuation_token)
    }
}

/// Unpaged rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRows {
    pub frame: DataFrame,
}

/// How decimation picks rows within each interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecimationMethod {
    #[default]
    Lossy,
    MaxMin,
    EntryExit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecimationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<DecimationMethod>,
}

/// Body of `POST /tables/{id}/query-decimated-data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDecimatedDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ColumnFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimation: Option<DecimationOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    #[default]
    Csv,
}

/// Body of `POST /tables/{id}/export-data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTableDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ColumnFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<ColumnOrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    pub response_format: ExportFormat,
}

// ============================================================================
// API capability descriptor
// ============================================================================

/// Availability and version of one service operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub available: bool,
    pub version: u32,
}

/// Operations advertised by the v1 API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsV1 {
    #[serde(default)]
    pub create_tables: Option<Operation>,
    #[serde(default)]
    pub delete_tables: Option<Operation>,
    #[serde(default)]
    pub modify_metadata: Option<Operation>,
    #[serde(default)]
    pub list_tables: Option<Operation>,
    #[serde(default)]
    pub read_data: Option<Operation>,
    #[serde(default)]
    pub write_data: Option<Operation>,
}

/// Response of `GET /nidataframe`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub operations: OperationsV1,
}

impl ApiInfo {
    /// Version of the write-data operation, if the server advertises it
    pub fn write_data_version(&self) -> Option<u32> {
        self.operations.write_data.map(|op| op.version)
    }
}
