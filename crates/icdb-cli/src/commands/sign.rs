//! Sign command: issue the integrity code for a payload.

use std::fmt;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use icdb_common_core::{Serial, Value};
use icdb_crypto::{canonical_payload, AlgorithmType, CodeGen, SerialIssuer, Signer};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::Output;

/// Print the integrity code for a payload
#[derive(Debug, Parser)]
pub struct SignCommand {
    /// Concatenated value text of the record
    #[arg(long)]
    pub payload: String,

    /// Serial the code is bound to
    #[arg(long)]
    pub serial: u64,

    /// Contributing table, in signing order
    #[arg(long = "table")]
    pub tables: Vec<String>,

    /// Algorithm to sign with instead of the configured one
    #[arg(long)]
    pub algorithm: Option<AlgorithmType>,
}

impl SignCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let algorithm = self.algorithm.unwrap_or(ctx.config.verification.algorithm);
        let keys = ctx.config.keys.key_material(algorithm)?;
        let codegen = CodeGen::new(Arc::new(Signer::for_algorithm(algorithm, &keys)?), SerialIssuer::default());

        let code = sign_payload(&codegen, &self.payload, &self.tables, Serial(self.serial))?;
        let signed = SignedPayload {
            algorithm,
            serial: Serial(self.serial),
            code: hex::encode(code),
        };
        Output::new(ctx).print(&signed).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

fn sign_payload(codegen: &CodeGen, payload: &str, tables: &[String], serial: Serial) -> Result<Vec<u8>, CliError> {
    let mut text = payload.to_string();
    text.push_str(&canonical_payload(std::iter::empty::<&Value>(), tables));
    Ok(codegen.code_for(&text, serial)?)
}

#[derive(Debug, Serialize)]
struct SignedPayload {
    algorithm: AlgorithmType,
    serial: Serial,
    code: String,
}

impl fmt::Display for SignedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
