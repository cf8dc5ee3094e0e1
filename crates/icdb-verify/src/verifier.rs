//! Verify-then-execute state machine.

use crate::codec::code_bytes;
use crate::error::{Result, VerifyError};
use crate::operation::OperationState;
use crate::record::{ChunkFold, RecordChecker};
use crate::report::VerificationReport;
use crate::stats::RunStatistics;
use icdb_common_core::{ConvertedQuery, DataSource, Execution, FetchMode, Row, RowCursor, Value};
use icdb_common_log::limit;
use icdb_common_log::spans::{verify_span, Timer};
use icdb_crypto::{AggregateCode, AlgorithmType, CryptoError, Signer};
use icdb_icrl::Icrl;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Where a [`QueryVerifier`] stands for the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Idle,
    Verifying,
    Verified,
    Rejected,
    Executed,
}

impl fmt::Display for VerifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        };
        f.write_str(name)
    }
}

/// Verification mode chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    PerRecord,
    Aggregate,
}

impl VerifyMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::PerRecord => "per_record",
            Self::Aggregate => "aggregate",
        }
    }
}

/// Engine settings fixed for the verifier's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub algorithm: AlgorithmType,
    /// Parallel chunks per fetched batch.
    pub workers: usize,
    pub fetch_size: usize,
    pub fetch_mode: FetchMode,
    /// Consult the revocation list.
    pub validate_icrl: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmType::default(),
            workers: 4,
            fetch_size: 1000,
            fetch_mode: FetchMode::Lazy,
            validate_icrl: true,
        }
    }
}

/// Result of [`QueryVerifier::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub verified: bool,
    /// Present only when the execution query ran.
    pub execution: Option<Execution>,
    pub report: VerificationReport,
    /// Post-processing result for aggregate queries.
    pub aggregate_value: Option<f64>,
    pub statistics: RunStatistics,
}

/// Verifies query results against their integrity codes and runs the
/// execution query only after a successful verification.
pub struct QueryVerifier {
    source: Arc<dyn DataSource>,
    signer: Arc<Signer>,
    icrl: Arc<Icrl>,
    config: VerifierConfig,
    state: VerifierState,
    /// Query whose verification put the verifier in `Verified`.
    verified_query: Option<ConvertedQuery>,
    report: VerificationReport,
    error: String,
    aggregate_value: Option<f64>,
    statistics: RunStatistics,
    runs: usize,
}

impl QueryVerifier {
    pub fn new(source: Arc<dyn DataSource>, signer: Arc<Signer>, icrl: Arc<Icrl>, config: VerifierConfig) -> Self {
        Self {
            source,
            signer,
            icrl,
            statistics: RunStatistics {
                fetch_size: config.fetch_size,
                ..RunStatistics::default()
            },
            config,
            state: VerifierState::Idle,
            verified_query: None,
            report: VerificationReport::default(),
            error: String::new(),
            aggregate_value: None,
            runs: 0,
        }
    }

    pub fn state(&self) -> VerifierState {
        self.state
    }

    /// Statistics of the latest run.
    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Dump of the records that failed the latest verification.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn report(&self) -> &VerificationReport {
        &self.report
    }

    /// Post-processing result of the latest verification.
    pub fn aggregate_value(&self) -> Option<f64> {
        self.aggregate_value
    }

    /// Mode the verifier uses for `query`.
    pub fn mode_for(&self, query: &ConvertedQuery) -> VerifyMode {
        if query.is_aggregate && self.config.algorithm.supports_aggregate() && query.aggregate_query.is_some() {
            VerifyMode::Aggregate
        } else {
            VerifyMode::PerRecord
        }
    }

    /// Drive one full verify-then-execute cycle.
    pub async fn run(&mut self, query: &ConvertedQuery) -> Result<RunOutcome> {
        self.runs += 1;
        self.statistics = RunStatistics {
            run: self.runs,
            fetch_size: self.config.fetch_size,
            ..RunStatistics::default()
        };

        let span = icdb_common_log::spans::query_span(&query.original);
        async {
            let verified = self.verify(query).await?;
            let execution = if verified {
                Some(self.execute(query).await?)
            } else {
                None
            };
            Ok::<_, VerifyError>(RunOutcome {
                verified,
                execution,
                report: self.report.clone(),
                aggregate_value: self.aggregate_value,
                statistics: self.statistics.clone(),
            })
        }
        .instrument(span)
        .await
    }

    /// Verify the rows `query` touches. Returns whether they are intact.
    ///
    /// Storage errors abort the pass and leave the verifier rejected.
    pub async fn verify(&mut self, query: &ConvertedQuery) -> Result<bool> {
        self.report = VerificationReport::default();
        self.error.clear();
        self.aggregate_value = None;
        self.verified_query = None;

        if !query.needs_verification {
            debug!("query needs no verification");
            self.state = VerifierState::Verified;
            self.verified_query = Some(query.clone());
            return Ok(true);
        }

        self.state = VerifierState::Verifying;
        let mode = self.mode_for(query);
        let span = verify_span(self.config.algorithm.as_str(), mode.as_str());
        let timer = Timer::start("verify");

        let outcome = match mode {
            VerifyMode::PerRecord => self.verify_per_record(query).instrument(span).await,
            VerifyMode::Aggregate => self.verify_aggregate(query).instrument(span).await,
        };
        self.statistics.verification_time = timer.finish();

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                self.state = VerifierState::Rejected;
                self.aggregate_value = None;
                self.error = e.to_string();
                warn!(query = %limit(&query.verify_query), error = %e, "verification aborted");
                return Err(e);
            }
        };

        self.statistics.records = report.records();
        let verified = report.is_success();
        self.error = report.render();
        self.report = report;

        if verified {
            self.state = VerifierState::Verified;
            self.verified_query = Some(query.clone());
            info!(
                records = self.statistics.records,
                elapsed_ms = self.statistics.verification_time.as_millis() as u64,
                "verification passed"
            );
        } else {
            self.state = VerifierState::Rejected;
            // post-processing only reports over verified data
            self.aggregate_value = None;
            let reason = self
                .report
                .aggregate_mismatch()
                .map(str::to_string)
                .or_else(|| self.report.failures().first().map(|f| f.kind.to_string()))
                .unwrap_or_default();
            warn!(
                query = %limit(&query.verify_query),
                reason = %reason,
                corrupted = self.report.failures().len(),
                "verification failed"
            );
            warn!(items = %self.error, "corrupted items");
        }
        Ok(verified)
    }

    /// Run the execution query. Refused unless the latest verification
    /// passed for this same query.
    pub async fn execute(&mut self, query: &ConvertedQuery) -> Result<Execution> {
        if self.state != VerifierState::Verified || self.verified_query.as_ref() != Some(query) {
            warn!(query = %limit(&query.execute_query), "execution refused without verification");
            return Err(VerifyError::NotVerified);
        }
        self.verified_query = None;

        let timer = Timer::start("execute");
        let execution = self.source.execute(&query.execute_query).await?;
        self.statistics.execution_time = timer.finish();
        self.state = VerifierState::Executed;

        debug!(
            rows_affected = execution.rows_affected,
            rows = execution.rows.len(),
            "query executed"
        );
        Ok(execution)
    }

    fn checker(&self, query: &ConvertedQuery) -> RecordChecker {
        let icrl = self.config.validate_icrl.then(|| Arc::clone(&self.icrl));
        RecordChecker::new(Arc::clone(&self.signer), icrl, &query.tables)
    }

    async fn open(&self, text: &str) -> Result<Box<dyn RowCursor>> {
        let batch_size = self.config.fetch_mode.batch_size(self.config.fetch_size);
        Ok(self.source.open(text, batch_size).await?)
    }

    async fn verify_per_record(&mut self, query: &ConvertedQuery) -> Result<VerificationReport> {
        let checker = self.checker(query);
        let operation = query.aggregate_operation.clone().filter(|_| query.is_aggregate);
        let mut report = VerificationReport::default();
        let mut state = operation.clone().map(OperationState::new);
        let mut operation_time = Duration::ZERO;

        let mut cursor = self.open(&query.verify_query).await?;
        while let Some(batch) = cursor.next_batch().await? {
            let checker = checker.clone();
            let operation = operation.clone();
            let chunks = fan_out(batch, self.config.workers, move |rows| {
                checker.check_chunk(&rows, operation.as_ref())
            })
            .await?;

            for chunk in chunks {
                report.merge(chunk.report);
                operation_time += chunk.operation_time;
                if let (Some(state), Some(partial)) = (state.as_mut(), chunk.operation) {
                    state.merge(partial);
                }
            }
        }

        self.statistics.aggregate_operation_time = operation_time;
        self.aggregate_value = state.and_then(|s| s.result());
        Ok(report)
    }

    async fn verify_aggregate(&mut self, query: &ConvertedQuery) -> Result<VerificationReport> {
        let checker = self.checker(query);
        let operation = query.aggregate_operation.clone();
        let mut report = VerificationReport::default();
        let mut accumulator = self.signer.accumulator();
        let mut state = operation.clone().map(OperationState::new);

        let mut cursor = self.open(&query.verify_query).await?;
        while let Some(batch) = cursor.next_batch().await? {
            report.add_records(batch.len());

            if let Some(state) = state.as_mut() {
                let timer = Timer::start("aggregate_operation");
                batch.iter().for_each(|row| state.apply(row));
                self.statistics.aggregate_operation_time += timer.finish();
            }

            let checker = checker.clone();
            let folds = fan_out(batch, self.config.workers, move |rows| checker.fold_chunk(&rows)).await?;
            for fold in folds {
                match fold? {
                    ChunkFold::Folded(partial) => accumulator.merge(partial)?,
                    ChunkFold::Aborted(failure) => {
                        warn!(reason = %failure.kind, "aggregate verification aborted");
                        report.push(failure);
                        return Ok(report);
                    }
                }
            }
        }

        let expected = self.expected_aggregate(query).await?;
        if !self.signer.check_aggregate(&accumulator, &expected) {
            report.set_aggregate_mismatch(format!(
                "aggregate integrity code mismatch over {} records",
                accumulator.count()
            ));
        }
        self.aggregate_value = state.and_then(|s| s.result());
        Ok(report)
    }

    /// Fold the first column of every aggregate-query row into the expected
    /// aggregate code.
    async fn expected_aggregate(&self, query: &ConvertedQuery) -> Result<AggregateCode> {
        let text = query
            .aggregate_query
            .as_deref()
            .ok_or_else(|| VerifyError::Aggregate("no aggregate query".into()))?;

        let mut codes = Vec::new();
        let mut cursor = self.open(text).await?;
        while let Some(batch) = cursor.next_batch().await? {
            for row in &batch {
                if let Some(code) = aggregate_code(row)? {
                    codes.push(code);
                }
            }
        }

        self.signer.combine_codes(codes).map_err(|e| match e {
            CryptoError::InvalidCode(reason) => VerifyError::Aggregate(reason),
            other => VerifyError::Crypto(other),
        })
    }
}

/// First column of an aggregate row. Nulls contribute nothing (an empty
/// table aggregates to NULL).
fn aggregate_code(row: &Row) -> Result<Option<Vec<u8>>> {
    let column = row
        .get(0)
        .ok_or_else(|| VerifyError::Aggregate("aggregate row has no columns".into()))?;
    match &column.value {
        Value::Null => Ok(None),
        value => code_bytes(value)
            .map(Some)
            .ok_or_else(|| VerifyError::Aggregate(format!("unusable aggregate code {value}"))),
    }
}

/// Split `rows` into at most `workers` contiguous chunks, run `work` on each
/// in the blocking pool and return the results in chunk order.
async fn fan_out<T, F>(rows: Vec<Row>, workers: usize, work: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(Vec<Row>) -> T + Send + Sync + 'static,
{
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = rows.len().div_ceil(workers.max(1));
    let work = Arc::new(work);
    let mut rows = rows.into_iter().peekable();
    let mut handles = Vec::new();
    while rows.peek().is_some() {
        let chunk: Vec<Row> = rows.by_ref().take(chunk_size).collect();
        let work = Arc::clone(&work);
        handles.push(tokio::task::spawn_blocking(move || work(chunk)));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }
    Ok(results)
}
