//! Output printer with format awareness.

use std::fmt;
use std::io;

use serde::Serialize;

use crate::cli::CommandContext;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Writes command results to stdout.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(ctx: &CommandContext) -> Self {
        Self {
            format: ctx.format,
            quiet: ctx.quiet,
        }
    }

    /// Print a value with appropriate formatting.
    ///
    /// JSON is always written; `--quiet` only silences text output.
    pub fn print<T>(&self, value: &T) -> io::Result<()>
    where
        T: Serialize + fmt::Display,
    {
        match self.format {
            OutputFormat::Json => println!("{}", render_json(value)?),
            OutputFormat::Text if !self.quiet => println!("{value}"),
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

fn render_json<T: Serialize>(value: &T) -> io::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
