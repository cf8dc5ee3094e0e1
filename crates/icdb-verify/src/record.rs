//! Checks applied to each fetched record.

use crate::codec::{decode_record, MalformedRecord};
use crate::operation::OperationState;
use crate::report::{Failure, FailureKind, VerificationReport};
use icdb_common_core::{AggregateOperation, Row};
use icdb_common_log::spans::Timer;
use icdb_crypto::{Accumulator, CryptoError, Signer};
use icdb_icrl::Icrl;
use std::sync::Arc;
use std::time::Duration;

/// Shared, immutable inputs of a verification pass. Cheap to clone into
/// worker tasks.
#[derive(Debug, Clone)]
pub struct RecordChecker {
    signer: Arc<Signer>,
    icrl: Option<Arc<Icrl>>,
    tables: Arc<[String]>,
}

/// Result of verifying one chunk record by record.
#[derive(Debug, Default)]
pub struct ChunkReport {
    pub report: VerificationReport,
    pub operation: Option<OperationState>,
    pub operation_time: Duration,
}

/// Result of folding one chunk on the aggregate path.
#[derive(Debug)]
pub enum ChunkFold {
    Folded(Accumulator),
    /// A record stopped the fold; the whole query fails.
    Aborted(Failure),
}

impl RecordChecker {
    /// `icrl` is consulted only when given.
    pub fn new(signer: Arc<Signer>, icrl: Option<Arc<Icrl>>, tables: &[String]) -> Self {
        Self {
            signer,
            icrl,
            tables: tables.into(),
        }
    }

    fn is_revoked(&self, serial: icdb_common_core::Serial) -> bool {
        self.icrl.as_ref().is_some_and(|icrl| icrl.contains(serial))
    }

    /// Verify every group of a record; the first failing group decides.
    pub fn check(&self, row: &Row) -> Result<(), FailureKind> {
        let groups = decode_record(row, &self.tables)?;
        for (index, group) in groups.iter().enumerate() {
            if self.is_revoked(group.serial) {
                return Err(FailureKind::RevokedData { serial: group.serial });
            }
            let code = group
                .code
                .as_deref()
                .ok_or(MalformedRecord::MissingCode { group: index })?;
            if !self.signer.verify(&group.message(), code) {
                return Err(FailureKind::VerificationFailure { serial: group.serial });
            }
        }
        Ok(())
    }

    /// Verify a chunk record by record. Every record is visited; verified
    /// records feed `operation` when one is requested.
    pub fn check_chunk(&self, rows: &[Row], operation: Option<&AggregateOperation>) -> ChunkReport {
        let mut chunk = ChunkReport {
            operation: operation.cloned().map(OperationState::new),
            ..ChunkReport::default()
        };
        chunk.report.add_records(rows.len());

        for row in rows {
            match self.check(row) {
                Ok(()) => {
                    if let Some(state) = chunk.operation.as_mut() {
                        let timer = Timer::start("aggregate_operation");
                        state.apply(row);
                        chunk.operation_time += timer.elapsed();
                    }
                }
                Err(kind) => chunk.report.push(Failure::new(kind, row)),
            }
        }
        chunk
    }

    /// Fold a chunk into a fresh accumulator. The first revoked serial or
    /// undecodable record aborts the fold.
    pub fn fold_chunk(&self, rows: &[Row]) -> Result<ChunkFold, CryptoError> {
        let mut accumulator = self.signer.accumulator();
        for row in rows {
            let groups = match decode_record(row, &self.tables) {
                Ok(groups) => groups,
                Err(reason) => return Ok(ChunkFold::Aborted(Failure::new(reason, row))),
            };
            for group in groups {
                if self.is_revoked(group.serial) {
                    let kind = FailureKind::RevokedData { serial: group.serial };
                    return Ok(ChunkFold::Aborted(Failure::new(kind, row)));
                }
                self.signer.absorb(&mut accumulator, &group.message())?;
            }
        }
        Ok(ChunkFold::Folded(accumulator))
    }
}
