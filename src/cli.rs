use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::error;

use crate::azure::AzureBlobClient;
use crate::config::{self, ConfigError};
use crate::contract::{ProgressSink, TracingSink};
use crate::report;
use crate::transfer::{self, TransferError, TransferOptions};

/// CLI for blob-transfer: copy a source container into a destination
/// container, skipping blobs whose transfer marker already matches their
/// checksum.
#[derive(Parser)]
#[clap(
    name = "blob-transfer",
    version,
    about = "Copy blobs from a source container to a destination container, recording a per-blob transfer report"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full transfer of the source container
    Run {
        /// Directory the JSON transfer report is written into
        #[clap(long, default_value = ".")]
        report_dir: PathBuf,
        /// Only transfer blobs whose names start with this prefix
        #[clap(long, default_value = "")]
        prefix: String,
    },
}

/// Failures surfaced at the CLI boundary, split the way the exit codes are.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("bad configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("failed to write transfer report: {0}")]
    Report(#[from] std::io::Error),
}

/// Extracted async CLI logic entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<(), RunError> {
    match cli.command {
        Commands::Run { report_dir, prefix } => {
            let config = config::load_from_env()?;
            let sink: Arc<dyn ProgressSink> = Arc::new(TracingSink);
            let client = AzureBlobClient::new(&config, Arc::clone(&sink))?;
            let options = TransferOptions { prefix };

            println!("Transfer starting...");
            match transfer::run_transfer(&client, sink.as_ref(), &options).await {
                Ok(report) => {
                    let path = report::write_report(&report_dir, &report)?;
                    println!("Transfer complete. Report: {}", path.display());
                    Ok(())
                }
                Err(err) => {
                    let TransferError::Listing { partial, .. } = &err;
                    error!(
                        listed = partial.list_source_succeeded.len(),
                        succeeded = partial.copy_succeeded.len(),
                        skipped = partial.copy_skipped.len(),
                        failed = partial.copy_failed.len(),
                        "run aborted during listing"
                    );
                    eprintln!("[ERROR] Transfer failed: {err}");
                    Err(err.into())
                }
            }
        }
    }
}
