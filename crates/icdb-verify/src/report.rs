//! Per-record failures collected during a verification pass.

use crate::codec::MalformedRecord;
use icdb_common_core::{Row, Serial};
use serde::Serialize;
use std::fmt;

/// Why a record failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The stored code does not match the payload and serial.
    VerificationFailure { serial: Serial },
    /// The serial is on the revocation list.
    RevokedData { serial: Serial },
    /// The row layout could not be decoded.
    MalformedRecord(MalformedRecord),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VerificationFailure { serial } => write!(f, "integrity code mismatch (serial {serial})"),
            Self::RevokedData { serial } => write!(f, "revoked serial {serial}"),
            Self::MalformedRecord(reason) => write!(f, "malformed record: {reason}"),
        }
    }
}

impl From<MalformedRecord> for FailureKind {
    fn from(reason: MalformedRecord) -> Self {
        Self::MalformedRecord(reason)
    }
}

/// A failed record and its full textual dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    #[serde(serialize_with = "serialize_display")]
    pub kind: FailureKind,
    pub record: String,
}

impl Failure {
    pub fn new(kind: impl Into<FailureKind>, row: &Row) -> Self {
        Self {
            kind: kind.into(),
            record: row.to_string(),
        }
    }
}

fn serialize_display<S: serde::Serializer>(kind: &FailureKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

/// Failures of one verification pass, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    records: usize,
    failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregate_mismatch: Option<String>,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count records visited.
    pub fn add_records(&mut self, count: usize) {
        self.records += count;
    }

    pub fn push(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// Append a later chunk's report.
    pub fn merge(&mut self, later: VerificationReport) {
        self.records += later.records;
        self.failures.extend(later.failures);
        if self.aggregate_mismatch.is_none() {
            self.aggregate_mismatch = later.aggregate_mismatch;
        }
    }

    /// Record an aggregate comparison failure (no per-row attribution).
    pub fn set_aggregate_mismatch(&mut self, reason: impl Into<String>) {
        self.aggregate_mismatch = Some(reason.into());
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.aggregate_mismatch.is_none()
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn aggregate_mismatch(&self) -> Option<&str> {
        self.aggregate_mismatch.as_deref()
    }

    /// Dump of every offending record, one block per failure.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(reason) = &self.aggregate_mismatch {
            out.push('\n');
            out.push_str(reason);
            out.push('\n');
        }
        for failure in &self.failures {
            out.push('\n');
            out.push_str(&failure.record);
            out.push('\n');
        }
        out
    }
}
