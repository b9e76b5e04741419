//! DataFrame service client

use super::append::{
    encode_arrow_stream, plan_append, reclassify_arrow_error, AppendData, AppendPlan,
    WriteCapability, ARROW_STREAM_CONTENT_TYPE,
};
use super::convert::{frame_to_record_batch, infer_columns};
use super::models::{
    ApiInfo, CreateTableRequest, CreateTableResponse, DataFrame, DeleteTablesResponse,
    ExportTableDataRequest, GetTableDataRequest, ListTablesRequest, ModifyTableRequest,
    ModifyTablesRequest, ModifyTablesResponse, PagedTableRows, PagedTables,
    QueryDecimatedDataRequest, QueryTableDataRequest, QueryTablesRequest, TableMetadata,
    TableRows,
};
use crate::config::HttpConfiguration;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::paginate;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

const SERVICE_PATH: &str = "/nidataframe";
const V1_PATH: &str = "/nidataframe/v1";

/// Client for the SystemLink DataFrame service
#[derive(Debug)]
pub struct DataFrameClient {
    http: HttpClient,
    workspace: Option<String>,
}

impl DataFrameClient {
    /// Connect using a server configuration
    pub fn new(config: &HttpConfiguration) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_auth(config.http_client_config(), config.auth())?;
        Ok(Self {
            http,
            workspace: config.workspace.clone(),
        })
    }

    /// Wrap an already configured transport
    pub fn with_http(http: HttpClient) -> Self {
        Self {
            http,
            workspace: None,
        }
    }

    /// Workspace used when a created table names none
    #[must_use]
    pub fn with_default_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    // ========================================================================
    // Service
    // ========================================================================

    /// Operations and versions the server supports
    pub async fn api_info(&self) -> Result<ApiInfo> {
        self.http.get_json(SERVICE_PATH).await
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// One page of tables
    pub async fn list_tables(&self, request: &ListTablesRequest) -> Result<PagedTables> {
        let mut config = RequestConfig::new()
            .query_opt("take", request.take)
            .query_opt("orderBy", request.order_by.map(|o| o.as_str()))
            .query_opt("orderByDescending", request.order_by_descending)
            .query_opt("continuationToken", request.continuation_token.as_deref());
        for id in &request.id {
            config = config.query("id", id);
        }
        for workspace in &request.workspace {
            config = config.query("workspace", workspace);
        }

        self.http
            .request_json(Method::GET, &v1("tables"), config)
            .await
    }

    /// Every table, fetched page by page as the stream is read
    pub fn list_all_tables(
        &self,
        request: ListTablesRequest,
    ) -> impl Stream<Item = Result<TableMetadata>> + '_ {
        paginate(move |token| {
            let mut request = request.clone();
            request.continuation_token = token;
            async move { self.list_tables(&request).await }
        })
    }

    /// Create a table and return its id
    pub async fn create_table(&self, request: &CreateTableRequest) -> Result<String> {
        request.validate()?;
        let created: CreateTableResponse = self.http.post_json(&v1("tables"), request).await?;
        info!("Created table {}", created.id);
        Ok(created.id)
    }

    /// Create a table whose columns mirror an Arrow schema
    pub async fn create_table_from_schema(
        &self,
        name: impl Into<String>,
        schema: &Schema,
        index_column: &str,
    ) -> Result<String> {
        let mut request = CreateTableRequest::new(infer_columns(schema, index_column)?)
            .with_name(name);
        request.workspace = self.workspace.clone();
        self.create_table(&request).await
    }

    /// One page of tables matching a filter
    pub async fn query_tables(&self, request: &QueryTablesRequest) -> Result<PagedTables> {
        self.http.post_json(&v1("query-tables"), request).await
    }

    /// Every table matching a filter
    pub fn query_all_tables(
        &self,
        request: QueryTablesRequest,
    ) -> impl Stream<Item = Result<TableMetadata>> + '_ {
        paginate(move |token| {
            let mut request = request.clone();
            request.continuation_token = token;
            async move { self.query_tables(&request).await }
        })
    }

    pub async fn get_table_metadata(&self, id: &str) -> Result<TableMetadata> {
        self.http.get_json(&table_path(id, "")).await
    }

    pub async fn modify_table(&self, id: &str, request: &ModifyTableRequest) -> Result<()> {
        let config = RequestConfig::new().json(serde_json::to_value(request)?);
        self.http
            .request_empty(Method::PATCH, &table_path(id, ""), config)
            .await
    }

    pub async fn delete_table(&self, id: &str) -> Result<()> {
        self.http
            .request_empty(Method::DELETE, &table_path(id, ""), RequestConfig::new())
            .await?;
        info!("Deleted table {}", id);
        Ok(())
    }

    /// Delete several tables; `None` when all of them were deleted
    pub async fn delete_tables(&self, ids: &[String]) -> Result<DeleteTablesResponse> {
        let config = RequestConfig::new().json(json!({ "ids": ids }));
        self.bulk(&v1("delete-tables"), config).await
    }

    /// Modify several tables; `None` when all of them were modified
    pub async fn modify_tables(&self, request: &ModifyTablesRequest) -> Result<ModifyTablesResponse> {
        let config = RequestConfig::new().json(serde_json::to_value(request)?);
        self.bulk(&v1("modify-tables"), config).await
    }

    // A 204 means every item succeeded; a 200 carries the partial outcome.
    async fn bulk<T: DeserializeOwned>(&self, url: &str, config: RequestConfig) -> Result<Option<T>> {
        let response = self.http.request(Method::POST, url, config).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::decode(format!("Unexpected response from {url}: {e}")))
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// One page of rows in index order
    pub async fn get_table_data(
        &self,
        id: &str,
        request: &GetTableDataRequest,
    ) -> Result<PagedTableRows> {
        let mut config = RequestConfig::new()
            .query_opt("orderByDescending", request.order_by_descending)
            .query_opt("take", request.take)
            .query_opt("continuationToken", request.continuation_token.as_deref());
        for column in &request.columns {
            config = config.query("columns", column);
        }
        for column in &request.order_by {
            config = config.query("orderBy", column);
        }

        self.http
            .request_json(Method::GET, &table_path(id, "/data"), config)
            .await
    }

    /// Append rows to a table.
    ///
    /// Record batches are sent as one Arrow IPC stream; everything else as
    /// JSON. `end_of_data` marks the table complete and must not be set
    /// when `data` is a full [`AppendTableDataRequest`](super::AppendTableDataRequest).
    pub async fn append_table_data(
        &self,
        id: &str,
        data: impl Into<AppendData>,
        end_of_data: Option<bool>,
    ) -> Result<()> {
        self.append_table_data_with(id, data, end_of_data, self)
            .await
    }

    /// Append rows, consulting `capability` to explain a rejected Arrow stream
    pub async fn append_table_data_with(
        &self,
        id: &str,
        data: impl Into<AppendData>,
        end_of_data: Option<bool>,
        capability: &dyn WriteCapability,
    ) -> Result<()> {
        let url = table_path(id, "/data");

        match plan_append(data.into(), end_of_data)? {
            AppendPlan::Json(request) => {
                debug!(
                    "Appending {} rows to table {} as JSON",
                    request.frame.as_ref().map_or(0, DataFrame::len),
                    id
                );
                let config = RequestConfig::new().json(serde_json::to_value(&request)?);
                self.http.request_empty(Method::POST, &url, config).await
            }
            AppendPlan::Arrow {
                batches,
                end_of_data,
            } => {
                let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
                debug!(
                    "Appending {} rows in {} batches to table {} as Arrow",
                    rows,
                    batches.len(),
                    id
                );
                let config = RequestConfig::new()
                    .raw(encode_arrow_stream(&batches)?, ARROW_STREAM_CONTENT_TYPE)
                    .query_opt("endOfData", end_of_data);

                match self.http.request_empty(Method::POST, &url, config).await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(reclassify_arrow_error(e, capability).await),
                }
            }
        }
    }

    /// One page of rows matching filters
    pub async fn query_table_data(
        &self,
        id: &str,
        request: &QueryTableDataRequest,
    ) -> Result<PagedTableRows> {
        self.http
            .post_json(&table_path(id, "/query-data"), request)
            .await
    }

    /// Every row matching filters, fetched page by page
    pub fn query_all_table_data<'a>(
        &'a self,
        id: &'a str,
        request: QueryTableDataRequest,
    ) -> impl Stream<Item = Result<Vec<Option<String>>>> + 'a {
        paginate(move |token| {
            let mut request = request.clone();
            request.continuation_token = token;
            async move { self.query_table_data(id, &request).await }
        })
    }

    /// Every row matching filters, as one typed record batch
    pub async fn query_table_data_as_batch(
        &self,
        id: &str,
        request: QueryTableDataRequest,
    ) -> Result<RecordBatch> {
        let metadata = self.get_table_metadata(id).await?;
        let names = request.columns.clone().unwrap_or_else(|| {
            metadata.columns.iter().map(|c| c.name.clone()).collect()
        });

        let rows: Vec<Vec<Option<String>>> = self
            .query_all_table_data(id, request)
            .try_collect()
            .await?;
        debug!("Read {} rows from table {}", rows.len(), id);

        frame_to_record_batch(&DataFrame::new(names, rows), &metadata.columns)
    }

    /// Rows reduced to a bounded number of points per interval
    pub async fn query_decimated_data(
        &self,
        id: &str,
        request: &QueryDecimatedDataRequest,
    ) -> Result<TableRows> {
        self.http
            .post_json(&table_path(id, "/query-decimated-data"), request)
            .await
    }

    /// Export matching rows; the body is returned as the server sent it
    pub async fn export_table_data(
        &self,
        id: &str,
        request: &ExportTableDataRequest,
    ) -> Result<Bytes> {
        let config = RequestConfig::new().json(serde_json::to_value(request)?);
        self.http
            .request_bytes(Method::POST, &table_path(id, "/export-data"), config)
            .await
    }
}

#[async_trait]
impl WriteCapability for DataFrameClient {
    async fn write_data_version(&self) -> Result<Option<u32>> {
        Ok(self.api_info().await?.write_data_version())
    }
}

fn v1(path: &str) -> String {
    format!("{V1_PATH}/{path}")
}

fn table_path(id: &str, suffix: &str) -> String {
    format!("{V1_PATH}/tables/{id}{suffix}")
}
