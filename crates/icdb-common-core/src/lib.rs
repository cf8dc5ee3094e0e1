//! ICDB common core types.
//!
//! The data model shared by every crate of the verification engine: rows and
//! values fetched from the protected store, serial numbers, the converted
//! query descriptor, and the storage collaborator interface.

pub mod error;
pub mod query;
pub mod source;
pub mod types;

pub use error::{Result, StoreError};
pub use query::{AggregateFunction, AggregateOperation, ConvertedQuery};
pub use source::{DataSource, Execution, FetchMode, RowCursor, VecCursor};
pub use types::*;

#[cfg(feature = "mocks")]
pub use source::MockDataSource;
