//! End-to-end behaviour of the verify-then-execute state machine.

use icdb_common_core::{
    AggregateFunction, AggregateOperation, ConvertedQuery, DataSource, Execution, FetchMode, MockDataSource, Row,
    RowCursor, StoreError, Value, VecCursor,
};
use icdb_crypto::{AlgorithmType, Signer};
use icdb_icrl::Icrl;
use icdb_test_utils::{signer, temp_dir, MemorySource, RowBuilder};
use icdb_verify::{FailureKind, QueryVerifier, VerifierConfig, VerifierState, VerifyError, VerifyMode};
use std::sync::Arc;
use tempfile::TempDir;

const VERIFY: &str = "SELECT emp_no, salary, ic, serial FROM salaries";
const EXECUTE: &str = "SELECT emp_no, salary FROM salaries";
const AGGREGATE_ROWS: &str = "SELECT salary, serial FROM salaries";
const AGGREGATE_CODE: &str = "SELECT ic FROM salaries";

struct Fixture {
    _dir: TempDir,
    icrl: Arc<Icrl>,
    signer: Arc<Signer>,
    config: VerifierConfig,
}

impl Fixture {
    fn new(algorithm: AlgorithmType) -> Self {
        let dir = temp_dir();
        let icrl = Arc::new(Icrl::open(dir.path().join("ICRL.txt")).unwrap());
        Self {
            _dir: dir,
            icrl,
            signer: signer(algorithm),
            config: VerifierConfig {
                algorithm,
                workers: 3,
                fetch_size: 2,
                ..VerifierConfig::default()
            },
        }
    }

    fn verifier(&self, source: Arc<dyn DataSource>) -> QueryVerifier {
        QueryVerifier::new(source, Arc::clone(&self.signer), Arc::clone(&self.icrl), self.config.clone())
    }

    fn builder(&self) -> RowBuilder {
        RowBuilder::new(Arc::clone(&self.signer), ["salaries"])
    }

    /// Signed rows `(emp_no = i, salary = 1000 * i)` with serial `i`.
    fn signed_rows(&self, count: i64) -> Vec<Row> {
        (1..=count)
            .map(|i| {
                self.builder()
                    .group([("emp_no", Value::Integer(i)), ("salary", Value::Integer(1000 * i))], i as u64)
                    .build()
            })
            .collect()
    }

    /// Aggregate-layout rows (no `ic`) and the per-row codes in row order.
    fn aggregate_rows(&self, count: i64) -> (Vec<Row>, Vec<Vec<u8>>) {
        (1..=count)
            .map(|i| {
                let values = [Value::Integer(1000 * i)];
                let code = self.builder().code_for(&values, i as u64);
                let row = self.builder().unsigned_group([("salary", values[0].clone())], i as u64).build();
                (row, code)
            })
            .unzip()
    }
}

fn select_query() -> ConvertedQuery {
    ConvertedQuery::new("SELECT emp_no, salary FROM salaries", VERIFY, EXECUTE).with_tables(["Salaries"])
}

fn aggregate_query(operation: AggregateOperation) -> ConvertedQuery {
    ConvertedQuery::new("SELECT SUM(salary) FROM salaries", AGGREGATE_ROWS, "SELECT SUM(salary) FROM salaries")
        .with_tables(["salaries"])
        .with_aggregate_query(AGGREGATE_CODE)
        .with_operation(operation)
}

fn tamper_salary(row: &Row) -> Row {
    row.columns()
        .iter()
        .map(|c| {
            let mut c = c.clone();
            if c.name == "salary" {
                c.value = Value::Integer(1);
            }
            c
        })
        .collect()
}

fn execution() -> Execution {
    Execution {
        rows_affected: 0,
        rows: vec![Row::from_pairs([("emp_no", Value::Integer(1))])],
    }
}

#[tokio::test]
async fn intact_rows_verify_then_execute() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let source = Arc::new(
        MemorySource::new()
            .with_rows(VERIFY, fx.signed_rows(5))
            .with_execution(EXECUTE, execution()),
    );
    let mut verifier = fx.verifier(source.clone());

    let outcome = verifier.run(&select_query()).await.unwrap();

    assert!(outcome.verified);
    assert_eq!(outcome.execution, Some(execution()));
    assert_eq!(outcome.statistics.records, 5);
    assert_eq!(outcome.statistics.run, 1);
    assert_eq!(verifier.state(), VerifierState::Executed);
    assert!(verifier.error().is_empty());
    assert_eq!(source.executed(), vec![EXECUTE.to_string()]);
    assert_eq!(source.opened(), vec![(VERIFY.to_string(), 2)]);
}

#[tokio::test]
async fn tampered_row_is_reported_and_execution_refused() {
    let fx = Fixture::new(AlgorithmType::Sha);
    let mut rows = fx.signed_rows(4);
    rows[2] = tamper_salary(&rows[2]);
    let tampered_dump = rows[2].to_string();
    let source = Arc::new(MemorySource::new().with_rows(VERIFY, rows));
    let mut verifier = fx.verifier(source.clone());

    let outcome = verifier.run(&select_query()).await.unwrap();

    assert!(!outcome.verified);
    assert!(outcome.execution.is_none());
    assert_eq!(outcome.report.records(), 4);
    assert_eq!(outcome.report.failures().len(), 1);
    assert!(matches!(outcome.report.failures()[0].kind, FailureKind::VerificationFailure { .. }));
    assert!(verifier.error().contains(&tampered_dump));
    assert_eq!(verifier.state(), VerifierState::Rejected);
    assert!(source.executed().is_empty());

    let err = verifier.execute(&select_query()).await.unwrap_err();
    assert!(matches!(err, VerifyError::NotVerified));
}

#[tokio::test]
async fn execution_never_issued_after_failed_verification() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let mut rows = fx.signed_rows(3);
    rows[0] = tamper_salary(&rows[0]);

    let mut source = MockDataSource::new();
    source
        .expect_open()
        .times(1)
        .returning(move |_, batch| Ok(Box::new(VecCursor::new(rows.clone(), batch)) as Box<dyn RowCursor>));
    source.expect_execute().times(0);

    let mut verifier = fx.verifier(Arc::new(source));
    let outcome = verifier.run(&select_query()).await.unwrap();
    assert!(!outcome.verified);
}

#[tokio::test]
async fn execute_before_verify_is_refused() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let mut source = MockDataSource::new();
    source.expect_execute().times(0);

    let mut verifier = fx.verifier(Arc::new(source));
    assert_eq!(verifier.state(), VerifierState::Idle);
    assert!(matches!(verifier.execute(&select_query()).await, Err(VerifyError::NotVerified)));
}

#[tokio::test]
async fn execution_is_bound_to_the_verified_query() {
    let fx = Fixture::new(AlgorithmType::Sha);
    let mut tampered = fx.signed_rows(2);
    tampered[1] = tamper_salary(&tampered[1]);
    let other_verify = "SELECT emp_no, salary, ic, serial FROM salaries WHERE emp_no > 1";
    let source = Arc::new(
        MemorySource::new()
            .with_rows(VERIFY, fx.signed_rows(2))
            .with_rows(other_verify, tampered),
    );
    let mut verifier = fx.verifier(source.clone());
    let other = ConvertedQuery::new("DELETE FROM salaries WHERE emp_no > 1", other_verify, "DELETE tampered")
        .with_tables(["salaries"]);

    assert!(verifier.verify(&select_query()).await.unwrap());
    assert!(matches!(verifier.execute(&other).await, Err(VerifyError::NotVerified)));
    assert!(source.executed().is_empty());

    verifier.execute(&select_query()).await.unwrap();
    assert_eq!(source.executed(), vec![EXECUTE.to_string()]);
    // one verification admits one execution
    assert!(matches!(verifier.execute(&select_query()).await, Err(VerifyError::NotVerified)));
}

#[tokio::test]
async fn unverified_query_executes_directly() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let insert = "INSERT INTO salaries VALUES (9, 10)";
    let source = Arc::new(MemorySource::new().with_execution(
        insert,
        Execution {
            rows_affected: 1,
            rows: Vec::new(),
        },
    ));
    let mut verifier = fx.verifier(source.clone());

    let outcome = verifier.run(&ConvertedQuery::unverified(insert, insert)).await.unwrap();

    assert!(outcome.verified);
    assert_eq!(outcome.execution.unwrap().rows_affected, 1);
    assert!(source.opened().is_empty());
    assert_eq!(verifier.state(), VerifierState::Executed);
}

#[tokio::test]
async fn join_rows_verify_each_table_group() {
    let fx = Fixture::new(AlgorithmType::Sha);
    let tables = ["employees", "salaries"];
    let row = |salary: i64| {
        RowBuilder::new(Arc::clone(&fx.signer), tables)
            .group([("emp_no", Value::Integer(7)), ("name", Value::from("Ann"))], 70)
            .group([("salary", Value::Integer(salary))], 71)
            .build()
    };
    let good = row(500);
    let bad = tamper_salary(&row(500));

    let query = ConvertedQuery::new("join", "JOIN", "JOIN EXEC").with_tables(tables);
    let source = Arc::new(MemorySource::new().with_rows("JOIN", vec![good, bad]));
    let mut verifier = fx.verifier(source);

    assert!(!verifier.verify(&query).await.unwrap());
    let failures = verifier.report().failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].kind,
        FailureKind::VerificationFailure {
            serial: icdb_common_core::Serial(71)
        }
    );
}

#[tokio::test]
async fn revoked_serial_fails_per_record_unless_icrl_disabled() {
    let mut fx = Fixture::new(AlgorithmType::Rsa);
    fx.icrl.revoke(icdb_common_core::Serial(2)).unwrap();
    let source = Arc::new(MemorySource::new().with_rows(VERIFY, fx.signed_rows(3)));

    let mut verifier = fx.verifier(source.clone());
    assert!(!verifier.verify(&select_query()).await.unwrap());
    assert!(matches!(
        verifier.report().failures()[0].kind,
        FailureKind::RevokedData { .. }
    ));

    fx.config.validate_icrl = false;
    let mut verifier = fx.verifier(source);
    assert!(verifier.verify(&select_query()).await.unwrap());
}

#[tokio::test]
async fn empty_result_set_passes_vacuously() {
    let fx = Fixture::new(AlgorithmType::ShaAggregate);
    let source = Arc::new(
        MemorySource::new()
            .with_rows(VERIFY, Vec::new())
            .with_rows(AGGREGATE_ROWS, Vec::new())
            .with_rows(AGGREGATE_CODE, vec![Row::from_pairs([("ic", Value::Null)])]),
    );
    let mut verifier = fx.verifier(source);

    assert!(verifier.verify(&select_query()).await.unwrap());
    let sum = AggregateOperation::new(AggregateFunction::Sum, "salary");
    assert!(verifier.verify(&aggregate_query(sum)).await.unwrap());
    assert_eq!(verifier.aggregate_value(), None);
}

#[tokio::test]
async fn rsa_aggregate_verifies_regardless_of_code_order() {
    let fx = Fixture::new(AlgorithmType::RsaAggregate);
    let (rows, mut codes) = fx.aggregate_rows(7);
    codes.reverse();
    let code_rows = codes.into_iter().map(|c| Row::from_pairs([("ic", Value::Blob(c))])).collect();
    let source = Arc::new(
        MemorySource::new()
            .with_rows(AGGREGATE_ROWS, rows)
            .with_rows(AGGREGATE_CODE, code_rows),
    );
    let mut verifier = fx.verifier(source);
    let query = aggregate_query(AggregateOperation::new(AggregateFunction::Sum, "salary"));

    assert_eq!(verifier.mode_for(&query), VerifyMode::Aggregate);
    let outcome = verifier.run(&query).await.unwrap();
    assert!(outcome.verified);
    assert_eq!(outcome.aggregate_value, Some(28_000.0));
    assert_eq!(outcome.report.records(), 7);
}

#[tokio::test]
async fn sha_aggregate_is_order_sensitive() {
    let fx = Fixture::new(AlgorithmType::ShaAggregate);
    let (rows, codes) = fx.aggregate_rows(4);
    let concatenated: String = codes.iter().map(hex::encode_upper).collect();

    let query = aggregate_query(AggregateOperation::new(AggregateFunction::Max, "salary"));
    let source = Arc::new(
        MemorySource::new()
            .with_rows(AGGREGATE_ROWS, rows.clone())
            .with_rows(AGGREGATE_CODE, vec![Row::from_pairs([("ic", Value::Text(concatenated))])]),
    );
    let mut verifier = fx.verifier(source);
    assert!(verifier.verify(&query).await.unwrap());
    assert_eq!(verifier.aggregate_value(), Some(4000.0));

    let mut reversed = rows;
    reversed.reverse();
    let code_rows = codes.into_iter().map(|c| Row::from_pairs([("ic", Value::Blob(c))])).collect();
    let source = Arc::new(
        MemorySource::new()
            .with_rows(AGGREGATE_ROWS, reversed)
            .with_rows(AGGREGATE_CODE, code_rows),
    );
    let mut verifier = fx.verifier(source);
    assert!(!verifier.verify(&query).await.unwrap());
    assert!(verifier.report().aggregate_mismatch().is_some());
    assert!(verifier.report().failures().is_empty());
}

#[tokio::test]
async fn tampered_row_fails_aggregate_check() {
    let fx = Fixture::new(AlgorithmType::RsaAggregate);
    let (mut rows, codes) = fx.aggregate_rows(3);
    rows[1] = tamper_salary(&rows[1]);
    let code_rows = codes.into_iter().map(|c| Row::from_pairs([("ic", Value::Blob(c))])).collect();
    let source = Arc::new(
        MemorySource::new()
            .with_rows(AGGREGATE_ROWS, rows)
            .with_rows(AGGREGATE_CODE, code_rows),
    );
    let mut verifier = fx.verifier(source.clone());
    let query = aggregate_query(AggregateOperation::new(AggregateFunction::Count, "*"));

    let outcome = verifier.run(&query).await.unwrap();
    assert!(!outcome.verified);
    assert!(outcome.aggregate_value.is_none());
    assert!(verifier.aggregate_value().is_none());
    assert!(source.executed().is_empty());
}

#[tokio::test]
async fn revoked_serial_aborts_aggregate_path() {
    let fx = Fixture::new(AlgorithmType::ShaAggregate);
    fx.icrl.revoke(icdb_common_core::Serial(3)).unwrap();
    let (rows, _) = fx.aggregate_rows(5);
    let source = Arc::new(MemorySource::new().with_rows(AGGREGATE_ROWS, rows));
    let mut verifier = fx.verifier(source.clone());
    let query = aggregate_query(AggregateOperation::new(AggregateFunction::Sum, "salary"));

    assert!(!verifier.verify(&query).await.unwrap());
    let failures = verifier.report().failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].kind,
        FailureKind::RevokedData {
            serial: icdb_common_core::Serial(3)
        }
    );
    // The expected aggregate is never fetched once the fold aborts.
    assert_eq!(source.opened().len(), 1);
}

#[tokio::test]
async fn plain_algorithm_uses_per_record_path_for_aggregate_queries() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let query = ConvertedQuery::new("SELECT SUM(salary) FROM salaries", VERIFY, "SELECT SUM(salary) FROM salaries")
        .with_tables(["salaries"])
        .with_aggregate_query(AGGREGATE_CODE)
        .with_operation(AggregateOperation::new(AggregateFunction::Avg, "salary"));
    let source = Arc::new(MemorySource::new().with_rows(VERIFY, fx.signed_rows(4)));
    let mut verifier = fx.verifier(source.clone());

    assert_eq!(verifier.mode_for(&query), VerifyMode::PerRecord);
    assert!(verifier.verify(&query).await.unwrap());
    assert_eq!(verifier.aggregate_value(), Some(2500.0));
    assert_eq!(source.opened().len(), 1);
}

#[tokio::test]
async fn eager_fetch_requests_one_batch() {
    let mut fx = Fixture::new(AlgorithmType::Sha);
    fx.config.fetch_mode = FetchMode::Eager;
    let source = Arc::new(MemorySource::new().with_rows(VERIFY, fx.signed_rows(3)));
    let mut verifier = fx.verifier(source.clone());

    assert!(verifier.verify(&select_query()).await.unwrap());
    assert_eq!(source.opened(), vec![(VERIFY.to_string(), usize::MAX)]);
}

#[tokio::test]
async fn storage_error_aborts_run() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let mut source = MockDataSource::new();
    source
        .expect_open()
        .returning(|_, _| Err(StoreError::Connection("database is locked".into())));
    source.expect_execute().times(0);
    let mut verifier = fx.verifier(Arc::new(source));

    let err = verifier.run(&select_query()).await.unwrap_err();
    assert!(matches!(err, VerifyError::Storage(StoreError::Connection(_))));
    assert_eq!(verifier.state(), VerifierState::Rejected);
    assert!(verifier.error().contains("database is locked"));
}

#[tokio::test]
async fn malformed_expected_aggregate_is_an_error() {
    let fx = Fixture::new(AlgorithmType::ShaAggregate);
    let (rows, _) = fx.aggregate_rows(2);
    let source = Arc::new(
        MemorySource::new()
            .with_rows(AGGREGATE_ROWS, rows)
            .with_rows(AGGREGATE_CODE, vec![Row::from_pairs([("ic", Value::Integer(5))])]),
    );
    let mut verifier = fx.verifier(source);
    let query = aggregate_query(AggregateOperation::new(AggregateFunction::Sum, "salary"));

    assert!(matches!(verifier.verify(&query).await, Err(VerifyError::Aggregate(_))));
}

#[tokio::test]
async fn repeated_runs_are_numbered() {
    let fx = Fixture::new(AlgorithmType::Rsa);
    let source = Arc::new(MemorySource::new().with_rows(VERIFY, fx.signed_rows(2)));
    let mut verifier = fx.verifier(source.clone());

    for expected in 1..=3 {
        let outcome = verifier.run(&select_query()).await.unwrap();
        assert_eq!(outcome.statistics.run, expected);
        assert_eq!(verifier.statistics().run, expected);
    }
    assert_eq!(source.executed().len(), 3);
}
