use std::process::ExitCode;

use clap::Parser;
use partbench::cli::{self, Cli};
use partbench::error::user_friendly_message;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // -v wins over RUST_LOG; warnings only when neither is set
    let filter = match cli.log_filter() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.resolve_config().and_then(|config| cli::run(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "benchmark run failed");
            eprintln!("{}", user_friendly_message(&e));
            ExitCode::from(e.exit_code())
        }
    }
}
