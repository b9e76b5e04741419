//! DataFrame service module
//!
//! Tables of typed columns, stored by SystemLink and moved as string cells
//! (JSON) or columnar batches (Arrow IPC).
//!
//! # Overview
//!
//! - [`DataFrameClient`] wraps every service endpoint, plus streams that
//!   walk paginated listings and row queries to the end.
//! - [`AppendData`] is the input of an append. JSON and Arrow payloads are
//!   picked from its variant, and a 400 on an Arrow append is explained
//!   when the server predates Arrow ingestion.
//! - [`CellValue`] and the conversion functions move rows between the wire
//!   text, typed values, and Arrow record batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use systemlink_clients::dataframe::{DataFrameClient, ListTablesRequest};
//! use systemlink_clients::HttpConfiguration;
//! use futures::TryStreamExt;
//!
//! let client = DataFrameClient::new(&HttpConfiguration::from_env()?)?;
//! let tables: Vec<_> = client
//!     .list_all_tables(ListTablesRequest::default())
//!     .try_collect()
//!     .await?;
//! client.append_table_data(&tables[0].id, batch, Some(true)).await?;
//! ```

mod append;
mod cells;
mod client;
mod convert;
mod models;

pub use append::{
    encode_arrow_stream, plan_append, reclassify_arrow_error, AppendData, AppendPlan,
    WriteCapability, ARROW_STREAM_CONTENT_TYPE, ARROW_WRITE_DATA_VERSION,
};
pub use cells::{decode_cell, encode_cell, frame_from_values, values_from_frame, CellValue};
pub use client::DataFrameClient;
pub use convert::{
    arrow_schema, column_data_type, frame_to_record_batch, infer_columns, record_batch_to_frame,
};
pub use models::{
    validate_columns, ApiInfo, AppendTableDataRequest, BulkOperationResponse, Column,
    ColumnFilter, ColumnMetadataPatch, ColumnOrderBy, ColumnType, CreateTableRequest, DataFrame,
    DataType, DecimationMethod, DecimationOptions, DeleteTablesResponse, ExportFormat,
    ExportTableDataRequest, FilterOperation, GetTableDataRequest, ListTablesRequest,
    ModifyTableRequest, ModifyTablesRequest, ModifyTablesResponse, Operation, OperationsV1,
    OrderBy, PagedTableRows, PagedTables, QueryDecimatedDataRequest, QueryTableDataRequest,
    QueryTablesRequest, TableMetadata, TableMetadataModification, TableRows,
};
