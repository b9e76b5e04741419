// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # SystemLink Clients
//!
//! Async Rust clients for SystemLink Enterprise services.
//!
//! ## Features
//!
//! - **Continuation-Token Pagination**: Any list or query endpoint as one lazy stream
//! - **DataFrame Service**: Tables, row queries, decimation, CSV export
//! - **Arrow Ingestion**: Record batches appended as an Arrow IPC stream, with
//!   rejections from older servers explained
//! - **Resilient HTTP**: Retries with backoff and token-bucket rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use systemlink_clients::dataframe::{DataFrameClient, ListTablesRequest};
//! use systemlink_clients::{HttpConfiguration, Result};
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = HttpConfiguration::from_env()?;
//!     let client = DataFrameClient::new(&config)?;
//!
//!     let tables: Vec<_> = client
//!         .list_all_tables(ListTablesRequest::default())
//!         .try_collect()
//!         .await?;
//!
//!     // Record batches go over the wire as one Arrow stream
//!     client.append_table_data(&tables[0].id, batches, Some(true)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        DataFrameClient                          │
//! │  tables · rows · append (JSON | Arrow) · decimate · export      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬─────────────────────────┐
//! │   Auth   │   HTTP    │   Paginate    │   Cells / Arrow         │
//! ├──────────┼───────────┼───────────────┼─────────────────────────┤
//! │ API Key  │ GET/POST  │ Continuation  │ Typed cells             │
//! │ Basic    │ Retry     │ token stream  │ RecordBatch <-> frame   │
//! │ Bearer   │ Rate Limit│               │ Schema inference        │
//! └──────────┴───────────┴───────────────┴─────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the clients
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Continuation-token pagination
pub mod pagination;

/// Server connection configuration
pub mod config;

/// DataFrame service client
pub mod dataframe;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::HttpConfiguration;
pub use error::{Error, Result};
pub use types::*;

pub use dataframe::{AppendData, DataFrameClient};
pub use pagination::{paginate, ContinuationPage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
