//! Common test utilities for CLI testing.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

use icdb_common_core::{Serial, Value};
use icdb_crypto::{canonical_message, canonical_payload, test_keys, AlgorithmType, Signer};

/// Environment variables that would leak host settings into a run.
const ISOLATED_VARS: &[&str] = &[
    "ICDB_ALGORITHM",
    "ICDB_WORKERS",
    "ICDB_FETCH_SIZE",
    "ICDB_FETCH_MODE",
    "ICDB_DATABASE",
    "ICDB_ICRL",
    "ICDB_CONFIG_PATH",
    "ICDB_ENV",
    "ICDB_LOG_FILE",
    "RUST_LOG",
];

/// Working directory with a config, a database and a revocation list.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestContext {
    /// Context configured for `algorithm` over the fixed test keys.
    pub fn new(algorithm: AlgorithmType) -> Self {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("icdb.yaml");

        let config = format!(
            r#"
database:
  path: store.sqlite
verification:
  algorithm: {algorithm}
  workers: 2
  fetch_size: 2
  icrl_path: ICRL.txt
keys:
  rsa:
    modulus: "{modulus}"
    public_exponent: "{public}"
    private_exponent: "{private}"
  mac_key: "{mac}"
"#,
            modulus = test_keys::RSA_MODULUS,
            public = test_keys::RSA_PUBLIC_EXPONENT,
            private = test_keys::RSA_PRIVATE_EXPONENT,
            mac = test_keys::MAC_KEY,
        );
        std::fs::write(&config_path, config).expect("Failed to write config");

        Self { temp_dir, config_path }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command configured for this context
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("icdb").expect("Binary not found");
        cmd.current_dir(self.path());
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    /// Write a query file and return its path.
    pub fn query_file(&self, name: &str, yaml: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, yaml).expect("Failed to write query");
        path
    }

    /// Run an unverified statement through `icdb execute`.
    pub fn run_statement(&self, name: &str, sql: &str) {
        let yaml = format!(
            "original: {sql:?}\nverify_query: \"\"\nexecute_query: {sql:?}\nneeds_verification: false\n"
        );
        let path = self.query_file(name, &yaml);
        self.command().arg("execute").arg("--query").arg(path).assert().success();
    }
}

/// Code for a `salaries` row with serial = `emp_no`.
pub fn salary_code(algorithm: AlgorithmType, emp_no: i64, salary: i64) -> Vec<u8> {
    let signer = Signer::for_algorithm(algorithm, &test_keys::key_material()).expect("test keys");
    let values = [Value::Integer(emp_no), Value::Integer(salary)];
    let message = canonical_message(&canonical_payload(&values, ["salaries"]), Serial(emp_no as u64));
    signer.sign(&message).expect("test keys can sign")
}
