//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use icdb_common_config::{ConfigLoader, IcdbConfig};

use crate::commands::{ExecuteCommand, IcrlCommand, RevokeCommand, SignCommand, VerifyCommand};
use crate::error::CliError;
use crate::output::OutputFormat;

/// ICDB - integrity-checked database queries
///
/// Verifies the rows a query touches against their integrity codes before
/// running it.
#[derive(Debug, Parser)]
#[command(
    name = "icdb",
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "ICDB_CONFIG_PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a converted query, then run it
    #[command(visible_alias = "run")]
    Execute(ExecuteCommand),

    /// Verify a converted query without running it
    Verify(VerifyCommand),

    /// Add serials to the revocation list
    Revoke(RevokeCommand),

    /// Inspect or reset the revocation list
    Icrl(IcrlCommand),

    /// Print the integrity code for a payload
    Sign(SignCommand),
}

impl Cli {
    /// Load configuration from `--config`, or `.icdb/config.yaml` under the
    /// working directory, with `ICDB_*` overrides applied.
    pub fn load_config(&self) -> Result<IcdbConfig, CliError> {
        let loader = ConfigLoader::default();
        Ok(loader.load_effective(self.config.as_deref())?)
    }

    /// Execute the selected command
    pub async fn execute(self, config: IcdbConfig) -> Result<(), CliError> {
        let ctx = CommandContext {
            config,
            format: self.format,
            quiet: self.quiet,
        };

        match self.command {
            Command::Execute(cmd) => cmd.execute(&ctx).await,
            Command::Verify(cmd) => cmd.execute(&ctx).await,
            Command::Revoke(cmd) => cmd.execute(&ctx),
            Command::Icrl(cmd) => cmd.execute(&ctx),
            Command::Sign(cmd) => cmd.execute(&ctx),
        }
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: IcdbConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}
