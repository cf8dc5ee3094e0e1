//! Storage collaborator interface.
//!
//! The verification engine never builds SQL; it hands query text produced by
//! the conversion stage to a [`DataSource`] and pulls rows back in batches.

use crate::error::Result;
use crate::types::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How verification queries pull rows from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Stream `fetch_size` rows per batch.
    #[default]
    Lazy,
    /// Pull the whole result set in one batch.
    Eager,
}

impl FetchMode {
    /// Batch size to request from a [`DataSource`].
    pub fn batch_size(self, fetch_size: usize) -> usize {
        match self {
            Self::Lazy => fetch_size.max(1),
            Self::Eager => usize::MAX,
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lazy => f.write_str("lazy"),
            Self::Eager => f.write_str("eager"),
        }
    }
}

/// Outcome of running an execution query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// Rows changed by insert/update/delete statements.
    pub rows_affected: u64,
    /// Rows returned by select statements.
    pub rows: Vec<Row>,
}

/// A lazy, batch-at-a-time sequence of rows for one query.
///
/// Suspension happens at batch boundaries only; a cursor yields `None` once
/// the result set is exhausted.
#[async_trait]
pub trait RowCursor: Send {
    /// Fetch the next batch of rows.
    async fn next_batch(&mut self) -> Result<Option<Vec<Row>>>;
}

/// Query execution against the protected store.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Start streaming the rows of `query`, `batch_size` rows at a time.
    async fn open(&self, query: &str, batch_size: usize) -> Result<Box<dyn RowCursor>>;

    /// Run `query` to completion.
    async fn execute(&self, query: &str) -> Result<Execution>;
}

/// Cursor over rows already held in memory.
pub struct VecCursor {
    rows: std::vec::IntoIter<Row>,
    batch_size: usize,
}

impl VecCursor {
    /// Create a cursor yielding `rows` in chunks of `batch_size`.
    pub fn new(rows: Vec<Row>, batch_size: usize) -> Self {
        Self {
            rows: rows.into_iter(),
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        let batch: Vec<Row> = self.rows.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}
