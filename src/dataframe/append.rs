//! Table append ingestion
//!
//! An append accepts several shapes of input. [`plan_append`] resolves the
//! input and the separate end-of-data flag into exactly one request, either
//! a JSON body or an Arrow IPC stream, before anything is sent:
//!
//! | input                     | end_of_data | request                        |
//! |---------------------------|-------------|--------------------------------|
//! | `AppendTableDataRequest`  | must be unset | JSON, as given               |
//! | `DataFrame`               | optional    | JSON `{frame, endOfData?}`     |
//! | nothing                   | required    | JSON `{endOfData}`             |
//! | no record batches         | required    | JSON `{endOfData}`             |
//! | one or more record batches| optional    | Arrow stream, `?endOfData=`    |

use super::models::{AppendTableDataRequest, DataFrame};
use crate::error::{Error, Result};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

/// Content type of an Arrow IPC stream body
pub const ARROW_STREAM_CONTENT_TYPE: &str = "application/vnd.apache.arrow.stream";

/// Lowest write-data operation version that accepts Arrow streams
pub const ARROW_WRITE_DATA_VERSION: u32 = 2;

/// Data to append to a table
#[derive(Debug, Clone)]
pub enum AppendData {
    /// A complete request, sent as JSON
    Request(AppendTableDataRequest),
    /// A row batch, sent as JSON
    Frame(DataFrame),
    /// No rows; only the end-of-data flag is sent
    Nothing,
    /// Columnar batches, concatenated into one Arrow stream
    Batches(Vec<RecordBatch>),
}

impl AppendData {
    /// Collect record batches from any iterator
    pub fn batches(batches: impl IntoIterator<Item = RecordBatch>) -> Self {
        Self::Batches(batches.into_iter().collect())
    }
}

impl From<AppendTableDataRequest> for AppendData {
    fn from(request: AppendTableDataRequest) -> Self {
        Self::Request(request)
    }
}

impl From<DataFrame> for AppendData {
    fn from(frame: DataFrame) -> Self {
        Self::Frame(frame)
    }
}

impl From<RecordBatch> for AppendData {
    fn from(batch: RecordBatch) -> Self {
        Self::Batches(vec![batch])
    }
}

impl From<Vec<RecordBatch>> for AppendData {
    fn from(batches: Vec<RecordBatch>) -> Self {
        Self::Batches(batches)
    }
}

impl<T: Into<AppendData>> From<Option<T>> for AppendData {
    fn from(data: Option<T>) -> Self {
        data.map_or(Self::Nothing, Into::into)
    }
}

/// The single request an append resolves to
#[derive(Debug, Clone)]
pub enum AppendPlan {
    /// JSON body posted to the data endpoint
    Json(AppendTableDataRequest),
    /// Arrow stream posted to the data endpoint
    Arrow {
        /// Batches in send order, all with the same schema
        batches: Vec<RecordBatch>,
        /// Sent as the `endOfData` query parameter when set
        end_of_data: Option<bool>,
    },
}

impl AppendPlan {
    pub fn is_arrow(&self) -> bool {
        matches!(self, Self::Arrow { .. })
    }
}

/// Resolve append input into one request, or fail without touching the network
pub fn plan_append(data: AppendData, end_of_data: Option<bool>) -> Result<AppendPlan> {
    match data {
        AppendData::Request(request) => {
            if end_of_data.is_some() {
                return Err(Error::invalid_argument(
                    "end_of_data must not be provided separately when passing an AppendTableDataRequest",
                ));
            }
            if let Some(frame) = &request.frame {
                frame.validate()?;
            }
            Ok(AppendPlan::Json(request))
        }

        AppendData::Frame(frame) => {
            frame.validate()?;
            Ok(AppendPlan::Json(AppendTableDataRequest {
                frame: Some(frame),
                end_of_data,
            }))
        }

        AppendData::Nothing => {
            let end_of_data = end_of_data.ok_or_else(|| {
                Error::invalid_argument("end_of_data must be provided when data is None")
            })?;
            Ok(AppendPlan::Json(AppendTableDataRequest::flush(end_of_data)))
        }

        AppendData::Batches(batches) => {
            let Some(first) = batches.first() else {
                let end_of_data = end_of_data.ok_or_else(|| {
                    Error::invalid_argument(
                        "end_of_data must be provided when the record batch iterator is empty",
                    )
                })?;
                return Ok(AppendPlan::Json(AppendTableDataRequest::flush(end_of_data)));
            };

            let schema = first.schema();
            if let Some(index) = batches.iter().position(|b| b.schema() != schema) {
                return Err(Error::invalid_argument(format!(
                    "record batch {index} has a different schema than the first batch"
                )));
            }

            Ok(AppendPlan::Arrow {
                batches,
                end_of_data,
            })
        }
    }
}

/// Serialize batches into one Arrow IPC stream
pub fn encode_arrow_stream(batches: &[RecordBatch]) -> Result<Bytes> {
    let first = batches
        .first()
        .ok_or_else(|| Error::invalid_argument("no record batches to encode"))?;

    let mut writer = StreamWriter::try_new(Vec::new(), &first.schema())?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    Ok(Bytes::from(writer.into_inner()?))
}

/// Reports which version of the write-data operation a server runs
#[async_trait]
pub trait WriteCapability: Send + Sync {
    /// Version of the write-data operation; `None` when not advertised
    async fn write_data_version(&self) -> Result<Option<u32>>;
}

/// Explain an HTTP 400 on an Arrow append.
///
/// When the server's write-data operation predates Arrow support, or its
/// version can't be determined, the 400 becomes
/// [`Error::ArrowIngestionRejected`]. Everything else passes through unchanged.
pub async fn reclassify_arrow_error(err: Error, capability: &dyn WriteCapability) -> Error {
    let body = match err {
        Error::HttpStatus { status: 400, body } => body,
        other => return other,
    };

    let reason = match capability.write_data_version().await {
        Ok(Some(version)) if version >= ARROW_WRITE_DATA_VERSION => {
            return Error::http_status(400, body);
        }
        Ok(Some(version)) => format!("writeData operation is version {version}"),
        Ok(None) => "server does not advertise a writeData operation".to_string(),
        Err(e) => {
            warn!("Could not read the DataFrame service capabilities: {}", e);
            format!("capability check failed: {e}")
        }
    };

    Error::ArrowIngestionRejected {
        reason,
        status: 400,
        body,
    }
}
