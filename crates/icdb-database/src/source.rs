//! [`DataSource`] over a SQLite connection pool.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use icdb_common_core::{Column, DataSource, Execution, Result, Row, RowCursor, StoreError, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column as _, Either, Row as _, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::pool::DatabasePool;

/// Store backed by SQLite.
#[derive(Clone)]
pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_pool(pool: &DatabasePool) -> Self {
        Self::new(pool.pool().clone())
    }
}

#[async_trait]
impl DataSource for SqliteSource {
    async fn open(&self, query: &str, batch_size: usize) -> Result<Box<dyn RowCursor>> {
        Ok(Box::new(SqliteCursor::spawn(self.pool.clone(), query, batch_size)))
    }

    #[instrument(skip(self, query))]
    async fn execute(&self, query: &str) -> Result<Execution> {
        let mut execution = Execution::default();
        let mut results = sqlx::query(query).fetch_many(&self.pool);

        while let Some(item) = results.try_next().await.map_err(store_error)? {
            match item {
                Either::Left(done) => execution.rows_affected += done.rows_affected(),
                Either::Right(row) => execution.rows.push(convert_row(&row)?),
            }
        }

        debug!(
            rows = execution.rows.len(),
            rows_affected = execution.rows_affected,
            "query executed"
        );
        Ok(execution)
    }
}

/// Batches from a single streaming execution of the query.
///
/// A background task drives the sqlx row stream and hands over one batch at
/// a time; the bounded channel keeps it at most one batch ahead.
pub struct SqliteCursor {
    batches: mpsc::Receiver<Result<Vec<Row>>>,
}

impl SqliteCursor {
    fn spawn(pool: SqlitePool, query: &str, batch_size: usize) -> Self {
        let (sender, batches) = mpsc::channel(1);
        tokio::spawn(stream_batches(pool, query.to_string(), batch_size.max(1), sender));
        Self { batches }
    }
}

#[async_trait]
impl RowCursor for SqliteCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        self.batches.recv().await.transpose()
    }
}

async fn stream_batches(
    pool: SqlitePool,
    query: String,
    batch_size: usize,
    sender: mpsc::Sender<Result<Vec<Row>>>,
) {
    let mut rows = sqlx::query(&query).fetch(&pool);
    let mut batch = Vec::new();

    loop {
        let row = match rows.try_next().await {
            Ok(Some(row)) => convert_row(&row),
            Ok(None) => break,
            Err(e) => Err(store_error(e)),
        };
        match row {
            Ok(row) => batch.push(row),
            Err(e) => {
                let _ = sender.send(Err(e)).await;
                return;
            }
        }

        if batch.len() >= batch_size && sender.send(Ok(std::mem::take(&mut batch))).await.is_err() {
            debug!("cursor dropped before the result set was exhausted");
            return;
        }
    }

    if !batch.is_empty() {
        let _ = sender.send(Ok(batch)).await;
    }
}

fn store_error(error: sqlx::Error) -> StoreError {
    StoreError::Query {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

/// SQLite suffixes repeated names when a query selects from a subquery
/// (`ic:1`, `serial:2`).
fn column_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((base, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let name = column_name(column.name());
        let raw = row.try_get_raw(index).map_err(store_error)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get(index).map_err(store_error)?),
                "REAL" => Value::Real(row.try_get(index).map_err(store_error)?),
                "TEXT" => Value::Text(row.try_get(index).map_err(store_error)?),
                "BLOB" => Value::Blob(row.try_get(index).map_err(store_error)?),
                _ => {
                    return Err(StoreError::UnsupportedType {
                        column: name.to_string(),
                        type_name,
                    })
                }
            }
        };

        columns.push(Column::new(name, value));
    }

    Ok(Row::new(columns))
}
