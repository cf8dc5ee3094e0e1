//! Converted query descriptor produced by the query-conversion stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate function applied to verified records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        };
        f.write_str(name)
    }
}

/// Post-processing step computed over verified records of an aggregate query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOperation {
    /// Function to apply.
    pub function: AggregateFunction,
    /// Column the function reads (ignored by `count`).
    pub column: String,
}

impl AggregateOperation {
    /// Create an operation.
    pub fn new(function: AggregateFunction, column: impl Into<String>) -> Self {
        Self {
            function,
            column: column.into(),
        }
    }
}

/// A query after conversion for the protected database.
///
/// Immutable once produced; consumed once per execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedQuery {
    /// Query text as written by the user.
    pub original: String,
    /// Query fetching the rows (plus codes and serials) to verify.
    pub verify_query: String,
    /// Query actually run once verification passes.
    pub execute_query: String,
    /// Query returning the expected aggregate code.
    #[serde(default)]
    pub aggregate_query: Option<String>,
    /// Contributing table names, in signing order.
    #[serde(default)]
    pub tables: Vec<String>,
    /// Whether the execution must be preceded by verification.
    #[serde(default = "default_true")]
    pub needs_verification: bool,
    /// Whether this is an aggregate-style query.
    #[serde(default)]
    pub is_aggregate: bool,
    /// Post-processing function for aggregate queries.
    #[serde(default)]
    pub aggregate_operation: Option<AggregateOperation>,
}

fn default_true() -> bool {
    true
}

impl ConvertedQuery {
    /// Create a query that verifies `verify_query` before running `execute_query`.
    pub fn new(
        original: impl Into<String>,
        verify_query: impl Into<String>,
        execute_query: impl Into<String>,
    ) -> Self {
        Self {
            original: original.into(),
            verify_query: verify_query.into(),
            execute_query: execute_query.into(),
            aggregate_query: None,
            tables: Vec::new(),
            needs_verification: true,
            is_aggregate: false,
            aggregate_operation: None,
        }
    }

    /// Create a query that runs without verification (e.g. plain inserts).
    pub fn unverified(original: impl Into<String>, execute_query: impl Into<String>) -> Self {
        let execute_query = execute_query.into();
        Self {
            needs_verification: false,
            ..Self::new(original, String::new(), execute_query)
        }
    }

    /// Set the contributing tables.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the query as aggregate, verified through `aggregate_query`.
    pub fn with_aggregate_query(mut self, aggregate_query: impl Into<String>) -> Self {
        self.is_aggregate = true;
        self.aggregate_query = Some(aggregate_query.into());
        self
    }

    /// Attach a post-processing operation (marks the query as aggregate).
    pub fn with_operation(mut self, operation: AggregateOperation) -> Self {
        self.is_aggregate = true;
        self.aggregate_operation = Some(operation);
        self
    }

    /// Table names lower-cased, in listed order.
    pub fn table_suffix(&self) -> String {
        self.tables.iter().map(|t| t.to_lowercase()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_suffix_lowercases_in_order() {
        let query = ConvertedQuery::new("q", "v", "e").with_tables(["Employees", "SALARIES"]);
        assert_eq!(query.table_suffix(), "employeessalaries");
    }

    #[test]
    fn test_unverified_query() {
        let query = ConvertedQuery::unverified("insert", "INSERT INTO t VALUES (1)");
        assert!(!query.needs_verification);
        assert!(query.verify_query.is_empty());
        assert_eq!(query.execute_query, "INSERT INTO t VALUES (1)");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "original": "SELECT * FROM t",
            "verify_query": "SELECT *, ic, serial FROM t",
            "execute_query": "SELECT * FROM t"
        }"#;
        let query: ConvertedQuery = serde_json::from_str(json).unwrap();
        assert!(query.needs_verification);
        assert!(!query.is_aggregate);
        assert!(query.tables.is_empty());
        assert!(query.aggregate_query.is_none());
    }

    #[test]
    fn test_deserialize_yaml_operation() {
        let yaml = r#"
original: SELECT SUM(salary) FROM salaries
verify_query: SELECT salary, serial FROM salaries
execute_query: SELECT SUM(salary) FROM salaries
aggregate_query: SELECT ic FROM salaries
tables: [salaries]
is_aggregate: true
aggregate_operation:
  function: sum
  column: salary
"#;
        let query: ConvertedQuery = serde_yaml::from_str(yaml).unwrap();
        assert!(query.is_aggregate);
        assert_eq!(
            query.aggregate_operation,
            Some(AggregateOperation::new(AggregateFunction::Sum, "salary"))
        );
    }
}
