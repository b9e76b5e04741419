//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::HttpConfiguration;
use crate::dataframe::{
    arrow_schema, AppendData, Column, DataFrame, DataFrameClient, ExportTableDataRequest,
    ListTablesRequest, QueryTableDataRequest, QueryTablesRequest,
};
use crate::error::{Error, Result, ResultExt};
use arrow::ipc::reader::StreamReader;
use arrow::record_batch::RecordBatch;
use futures::{pin_mut, Stream, TryStreamExt};
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Rows requested per page when printing a bounded number of rows
const MAX_PAGE_SIZE: usize = 10_000;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, printing results to stdout
    pub async fn run(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_to(&mut stdout).await
    }

    /// Run the CLI command against the configured server
    pub async fn run_to(&self, out: &mut dyn Write) -> Result<()> {
        let config = self.configuration()?;
        debug!("Using {:?}", config);
        let client = DataFrameClient::new(&config)?;
        self.execute(&client, out).await
    }

    /// Run the CLI command with an existing client
    pub async fn execute(&self, client: &DataFrameClient, out: &mut dyn Write) -> Result<()> {
        match &self.cli.command {
            Commands::ApiInfo => {
                let info = client.api_info().await?;
                self.output(out, &info)
            }
            Commands::Tables { filter, take } => match filter {
                Some(filter) => {
                    let request = QueryTablesRequest {
                        filter: Some(filter.clone()),
                        take: *take,
                        ..Default::default()
                    };
                    self.output_stream(out, client.query_all_tables(request), None)
                        .await
                }
                None => {
                    let request = ListTablesRequest {
                        take: *take,
                        ..Default::default()
                    };
                    self.output_stream(out, client.list_all_tables(request), None)
                        .await
                }
            },
            Commands::Metadata { id } => {
                let metadata = client.get_table_metadata(id).await?;
                self.output(out, &metadata)
            }
            Commands::Query { id, columns, take } => {
                let request = QueryTableDataRequest {
                    columns: non_empty(columns),
                    take: take.map(|t| t.clamp(1, MAX_PAGE_SIZE) as u32),
                    ..Default::default()
                };
                self.output_stream(out, client.query_all_table_data(id, request), *take)
                    .await
            }
            Commands::Append {
                id,
                arrow,
                rows,
                end_of_data,
            } => {
                let data = match (arrow, rows) {
                    (Some(path), _) => AppendData::Batches(load_batches(client, id, path).await?),
                    (None, Some(path)) => AppendData::Frame(load_frame(path)?),
                    (None, None) => AppendData::Nothing,
                };
                let count: usize = match &data {
                    AppendData::Batches(batches) => {
                        batches.iter().map(RecordBatch::num_rows).sum()
                    }
                    AppendData::Frame(frame) => frame.len(),
                    _ => 0,
                };

                client.append_table_data(id, data, *end_of_data).await?;
                info!("Appended {} rows to table {}", count, id);
                self.output(
                    out,
                    &json!({ "id": id, "appendedRows": count, "endOfData": end_of_data }),
                )
            }
            Commands::Export {
                id,
                columns,
                output,
            } => {
                let request = ExportTableDataRequest {
                    columns: non_empty(columns),
                    ..Default::default()
                };
                let csv = client.export_table_data(id, &request).await?;
                match output {
                    Some(path) => {
                        std::fs::write(path, &csv)?;
                        info!("Exported {} bytes to {}", csv.len(), path.display());
                    }
                    None => out.write_all(&csv)?,
                }
                Ok(())
            }
        }
    }

    /// Server configuration from `--config` or the environment
    fn configuration(&self) -> Result<HttpConfiguration> {
        match &self.cli.config {
            Some(path) => HttpConfiguration::from_file(path),
            None => HttpConfiguration::from_env(),
        }
    }

    /// Output a single value
    fn output<T: Serialize + ?Sized>(&self, out: &mut dyn Write, value: &T) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        writeln!(out, "{text}")?;
        Ok(())
    }

    /// Output every item of a stream, stopping after `limit` items
    async fn output_stream<T, S>(
        &self,
        out: &mut dyn Write,
        items: S,
        limit: Option<usize>,
    ) -> Result<()>
    where
        T: Serialize,
        S: Stream<Item = Result<T>>,
    {
        pin_mut!(items);
        let mut count = 0usize;
        while limit.map_or(true, |limit| count < limit) {
            let Some(item) = items.try_next().await? else {
                break;
            };
            self.output(out, &item)?;
            count += 1;
        }
        debug!("Printed {} items", count);
        Ok(())
    }
}

fn non_empty(columns: &[String]) -> Option<Vec<String>> {
    (!columns.is_empty()).then(|| columns.to_vec())
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(File::open(path)?)
}

fn is_json_lines(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jsonl" | "ndjson"))
}

/// Read record batches from an Arrow IPC stream, or from JSON lines typed by
/// the table's schema
async fn load_batches(client: &DataFrameClient, id: &str, path: &Path) -> Result<Vec<RecordBatch>> {
    let file = BufReader::new(open(path)?);

    let batches = if is_json_lines(path) {
        let metadata = client.get_table_metadata(id).await?;
        let columns: Vec<&Column> = metadata.columns.iter().collect();
        let schema = Arc::new(arrow_schema(&columns));
        arrow::json::ReaderBuilder::new(schema)
            .build(file)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid JSON rows in {}", path.display()))?
    } else {
        StreamReader::try_new(file, None)
            .and_then(|reader| reader.collect::<std::result::Result<Vec<_>, _>>())
            .with_context(|| format!("Invalid Arrow stream in {}", path.display()))?
    };

    debug!("Read {} record batches from {}", batches.len(), path.display());
    Ok(batches)
}

/// Read a row frame from a JSON file
fn load_frame(path: &Path) -> Result<DataFrame> {
    serde_json::from_reader(BufReader::new(open(path)?))
        .with_context(|| format!("Invalid row frame in {}", path.display()))
}
