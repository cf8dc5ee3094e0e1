//! Execute and verify commands.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueHint};
use serde::Serialize;
use tracing::info;

use icdb_common_core::Row;
use icdb_verify::{QueryVerifier, RunStatistics, VerificationReport};

use super::{connect, load_query};
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::Output;

/// Verify a converted query, then run it
#[derive(Debug, Parser)]
pub struct ExecuteCommand {
    /// Converted query file (JSON or YAML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub query: PathBuf,

    /// Number of verify-then-execute runs
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: u32,

    /// Stop after verification
    #[arg(long)]
    pub no_execute: bool,
}

/// Verify a converted query without running it
#[derive(Debug, Parser)]
pub struct VerifyCommand {
    /// Converted query file (JSON or YAML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub query: PathBuf,
}

impl VerifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        ExecuteCommand {
            query: self.query.clone(),
            runs: 1,
            no_execute: true,
        }
        .execute(ctx)
        .await
    }
}

impl ExecuteCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let query = load_query(&self.query)?;
        let (pool, mut verifier) = connect(&ctx.config).await?;

        let mut summaries = Vec::new();
        for index in 1..=self.runs as usize {
            let summary = if self.no_execute {
                verify_only(&mut verifier, &query, index).await?
            } else {
                RunSummary::from(verifier.run(&query).await?)
            };
            let verified = summary.verified;
            summaries.push(summary);
            if !verified {
                break;
            }
        }
        pool.close().await;

        let statistics: Vec<RunStatistics> = summaries.iter().map(|s| s.statistics.clone()).collect();
        let report = ExecutionReport {
            average: (statistics.len() > 1).then(|| RunStatistics::average(&statistics)).flatten(),
            runs: summaries,
        };
        Output::new(ctx).print(&report).map_err(anyhow::Error::from)?;

        match report.runs.last() {
            Some(last) if !last.verified => Err(CliError::Rejected {
                records: last.report.records(),
                failed: last.report.failures().len(),
            }),
            _ => Ok(()),
        }
    }
}

async fn verify_only(
    verifier: &mut QueryVerifier,
    query: &icdb_common_core::ConvertedQuery,
    index: usize,
) -> Result<RunSummary, CliError> {
    let verified = verifier.verify(query).await?;
    info!(run = index, verified, "verification finished");
    Ok(RunSummary {
        verified,
        report: verifier.report().clone(),
        aggregate_value: verifier.aggregate_value(),
        rows_affected: None,
        rows: Vec::new(),
        statistics: RunStatistics {
            run: index,
            ..verifier.statistics().clone()
        },
    })
}

/// One run as printed.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub verified: bool,
    pub report: VerificationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Row>,
    pub statistics: RunStatistics,
}

impl From<icdb_verify::RunOutcome> for RunSummary {
    fn from(outcome: icdb_verify::RunOutcome) -> Self {
        let (rows_affected, rows) = match outcome.execution {
            Some(execution) => (Some(execution.rows_affected), execution.rows),
            None => (None, Vec::new()),
        };
        Self {
            verified: outcome.verified,
            report: outcome.report,
            aggregate_value: outcome.aggregate_value,
            rows_affected,
            rows,
            statistics: outcome.statistics,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verified {
            writeln!(f, "verified {} records", self.report.records())?;
        } else {
            writeln!(
                f,
                "verification failed for {} of {} records",
                self.report.failures().len(),
                self.report.records()
            )?;
            for failure in self.report.failures() {
                writeln!(f, "  {}", failure.kind)?;
            }
            write!(f, "{}", self.report.render())?;
        }

        if let Some(value) = self.aggregate_value {
            writeln!(f, "aggregate value: {value}")?;
        }
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        if let Some(affected) = self.rows_affected.filter(|n| *n > 0) {
            writeln!(f, "rows affected: {affected}")?;
        }
        write!(f, "{}", self.statistics)
    }
}

/// Every run plus the averaged timings when there was more than one.
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    pub runs: Vec<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<RunStatistics>,
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{run}")?;
        }
        if let Some(average) = &self.average {
            write!(f, "\naverage over {} runs: {average}", average.run)?;
        }
        Ok(())
    }
}
