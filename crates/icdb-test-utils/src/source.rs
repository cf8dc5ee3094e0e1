//! In-memory [`DataSource`] that records what it was asked to run.

use async_trait::async_trait;
use icdb_common_core::{DataSource, Execution, Result, Row, RowCursor, StoreError, VecCursor};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Canned query results keyed by query text.
#[derive(Default)]
pub struct MemorySource {
    results: HashMap<String, Vec<Row>>,
    executions: HashMap<String, Execution>,
    opened: Mutex<Vec<(String, usize)>>,
    executed: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows streamed by `open(query)`.
    pub fn with_rows(mut self, query: impl Into<String>, rows: Vec<Row>) -> Self {
        self.results.insert(query.into(), rows);
        self
    }

    /// Result returned by `execute(query)`.
    pub fn with_execution(mut self, query: impl Into<String>, execution: Execution) -> Self {
        self.executions.insert(query.into(), execution);
        self
    }

    /// Queries opened so far, with the batch size requested.
    pub fn opened(&self) -> Vec<(String, usize)> {
        self.opened.lock().clone()
    }

    /// Queries executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn open(&self, query: &str, batch_size: usize) -> Result<Box<dyn RowCursor>> {
        self.opened.lock().push((query.to_string(), batch_size));
        let rows = self
            .results
            .get(query)
            .cloned()
            .ok_or_else(|| StoreError::query(format!("no rows registered for {query}")))?;
        Ok(Box::new(VecCursor::new(rows, batch_size)))
    }

    async fn execute(&self, query: &str) -> Result<Execution> {
        self.executed.lock().push(query.to_string());
        Ok(self.executions.get(query).cloned().unwrap_or_default())
    }
}
