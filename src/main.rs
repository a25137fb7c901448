use std::process::ExitCode;

use clap::Parser;
use testgraft::cli::merge::MergeCommandOutput;
use testgraft::cli::{Cli, Commands};
use testgraft::error::TestgraftError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let serialized = serde_json::to_string_pretty(&error.to_error_response()).unwrap_or_else(
                |_| {
                    "{\"error\":{\"type\":\"serialization_error\",\"message\":\"Failed to serialize error response\"}}"
                        .to_string()
                },
            );
            println!("{serialized}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, TestgraftError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge(args) => match testgraft::cli::merge::run_merge(args)? {
            MergeCommandOutput::Text(output) => Ok(output),
            MergeCommandOutput::Json(response) => serde_json::to_string_pretty(&response)
                .map_err(|source| TestgraftError::ResponseSerialization { source }),
        },
        Commands::Inspect(args) => {
            let response = testgraft::cli::inspect::run_inspect(args)?;
            serde_json::to_string_pretty(&response)
                .map_err(|source| TestgraftError::ResponseSerialization { source })
        }
    }
}

/// Diagnostics go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
