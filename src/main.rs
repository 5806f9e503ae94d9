use clap::Parser;

use blob_transfer::cli::{run, Cli, RunError};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
/// Distinct code for configuration problems, raised before any storage call.
const EXIT_BAD_CONFIG: i32 = 0xA0;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(RunError::Config(e)) => {
            tracing::error!(error = %e, "configuration error");
            EXIT_BAD_CONFIG
        }
        Err(e) => {
            tracing::error!(error = %e, "transfer run failed");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
