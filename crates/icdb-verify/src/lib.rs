//! Query verification engine for ICDB.
//!
//! [`QueryVerifier`] streams the rows a converted query touches, checks each
//! record's integrity code (or a single aggregate code for the whole result)
//! and only then lets the execution query run.

mod codec;
mod error;
mod operation;
mod record;
mod report;
mod stats;
mod verifier;

pub use codec::{code_bytes, decode_record, MalformedRecord, RecordGroup};
pub use error::{Result, VerifyError};
pub use operation::OperationState;
pub use record::{ChunkFold, ChunkReport, RecordChecker};
pub use report::{Failure, FailureKind, VerificationReport};
pub use stats::RunStatistics;
pub use verifier::{QueryVerifier, RunOutcome, VerifierConfig, VerifierState, VerifyMode};
