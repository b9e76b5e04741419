//! CLI module
//!
//! Command-line interface for the DataFrame service.
//!
//! # Commands
//!
//! - `api-info` - Show the operations the server supports
//! - `tables` - List every table
//! - `metadata` - Show one table's metadata
//! - `query` - Print a table's rows
//! - `append` - Append rows from an Arrow or JSON file
//! - `export` - Export a table as CSV

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
