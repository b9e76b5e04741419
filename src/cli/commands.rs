//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SystemLink DataFrame service CLI
#[derive(Parser, Debug)]
#[command(name = "systemlink-df")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server configuration file (YAML or JSON); the environment is used when absent
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the operations the server supports
    ApiInfo,

    /// List every table, following continuation tokens
    Tables {
        /// Query filter; lists all tables when absent
        #[arg(long)]
        filter: Option<String>,

        /// Tables requested per page
        #[arg(long)]
        take: Option<u32>,
    },

    /// Show one table's metadata
    Metadata {
        /// Table id
        id: String,
    },

    /// Print a table's rows
    Query {
        /// Table id
        id: String,

        /// Columns to return (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Maximum rows to print
        #[arg(long)]
        take: Option<usize>,
    },

    /// Append rows to a table
    Append {
        /// Table id
        id: String,

        /// Arrow IPC stream file, or newline-delimited JSON (.jsonl/.ndjson) read as Arrow
        #[arg(long, conflicts_with = "rows")]
        arrow: Option<PathBuf>,

        /// JSON file holding a row frame: {"columns": [...], "data": [[...], ...]}
        #[arg(long)]
        rows: Option<PathBuf>,

        /// Mark the table complete (true) or keep it open (false)
        #[arg(long)]
        end_of_data: Option<bool>,
    },

    /// Export a table's rows as CSV
    Export {
        /// Table id
        id: String,

        /// Columns to export (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Destination file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one value per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_append_arrow() {
        let cli = Cli::try_parse_from([
            "systemlink-df",
            "append",
            "t1",
            "--arrow",
            "rows.arrows",
            "--end-of-data",
            "true",
        ])
        .unwrap();

        match cli.command {
            Commands::Append {
                id,
                arrow,
                rows,
                end_of_data,
            } => {
                assert_eq!(id, "t1");
                assert_eq!(arrow, Some(PathBuf::from("rows.arrows")));
                assert!(rows.is_none());
                assert_eq!(end_of_data, Some(true));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_append_sources_conflict() {
        let result = Cli::try_parse_from([
            "systemlink-df",
            "append",
            "t1",
            "--arrow",
            "a.arrows",
            "--rows",
            "b.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_query_columns() {
        let cli = Cli::try_parse_from([
            "systemlink-df",
            "--format",
            "pretty",
            "query",
            "t1",
            "--columns",
            "a,b",
            "--take",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Pretty);
        match cli.command {
            Commands::Query { columns, take, .. } => {
                assert_eq!(columns, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(take, Some(5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
