//! Worklog entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use worklog_cli::cli::Cli;
use worklog_cli::config::{Config, LogFormat};
use worklog_cli::error::AppError;

/// Logs go to stderr so stdout carries only JSON output.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn report(err: &AppError) -> ExitCode {
    println!("{:#}", err.body());
    ExitCode::from(err.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => return report(&err),
    };
    init_tracing(config.log_format);

    tracing::debug!(home = %config.home.display(), "starting worklog");

    match worklog_cli::run(cli, &config).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            report(&err)
        }
    }
}
