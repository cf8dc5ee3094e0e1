//! Revocation list commands.

use std::fmt;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use icdb_common_core::Serial;

use super::open_icrl;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::Output;

/// Add serials to the revocation list
#[derive(Debug, Parser)]
pub struct RevokeCommand {
    /// Serials to revoke
    #[arg(required = true, num_args = 1..)]
    pub serials: Vec<u64>,
}

impl RevokeCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let icrl = open_icrl(&ctx.config)?;
        let added = icrl.revoke_all(self.serials.iter().copied().map(Serial))?;
        info!(added, requested = self.serials.len(), "serials revoked");

        let revoked = Revoked {
            added,
            already_revoked: self.serials.len() - added,
            total: icrl.len(),
        };
        Output::new(ctx).print(&revoked).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

/// Inspect or reset the revocation list
#[derive(Debug, Parser)]
pub struct IcrlCommand {
    #[command(subcommand)]
    pub action: IcrlAction,
}

#[derive(Debug, Subcommand)]
pub enum IcrlAction {
    /// Print every revoked serial
    List,
    /// Remove every serial from the list
    Reset,
}

impl IcrlCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let icrl = open_icrl(&ctx.config)?;
        let output = Output::new(ctx);

        match self.action {
            IcrlAction::List => {
                let listing = Listing {
                    path: icrl.path().display().to_string(),
                    serials: icrl.serials(),
                };
                output.print(&listing).map_err(anyhow::Error::from)?;
            }
            IcrlAction::Reset => {
                let cleared = icrl.len();
                icrl.reset()?;
                output
                    .print(&Cleared { cleared })
                    .map_err(anyhow::Error::from)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Revoked {
    added: usize,
    already_revoked: usize,
    total: usize,
}

impl fmt::Display for Revoked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "revoked {} serials", self.added)?;
        if self.already_revoked > 0 {
            write!(f, " ({} already revoked)", self.already_revoked)?;
        }
        write!(f, ", {} on the list", self.total)
    }
}

#[derive(Debug, Serialize)]
struct Listing {
    path: String,
    serials: Vec<Serial>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.serials.is_empty() {
            return write!(f, "no revoked serials in {}", self.path);
        }
        let lines: Vec<String> = self.serials.iter().map(Serial::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[derive(Debug, Serialize)]
struct Cleared {
    cleared: usize,
}

impl fmt::Display for Cleared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cleared {} serials", self.cleared)
    }
}
