//! ICDB command line.
//!
//! Main entry point for the `icdb` binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use icdb_cli::cli::Cli;
use icdb_cli::error::CliError;
use icdb_common_config::Environment;
use icdb_common_log::{LogConfig, LogLevel};

/// Application exit codes
#[repr(u8)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = Environment::init() {
        eprintln!("warning: {e}");
    }

    if let Err(e) = icdb_common_log::init(log_config(&cli)) {
        eprintln!("warning: {e}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => Exit::Success.into(),
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;
    cli.execute(config).await
}

/// `-v`/`-q` decide the level unless `ICDB_LOG_LEVEL` is set.
fn log_config(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::from_env();
    if cli.verbose > 0 || cli.quiet || std::env::var_os("ICDB_LOG_LEVEL").is_none() {
        config.level = LogLevel::from_verbosity(cli.verbose, cli.quiet);
    }
    config
}
