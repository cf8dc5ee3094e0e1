//! SQLite backend for the protected store.

pub mod pool;
pub mod source;

pub use pool::*;
pub use source::{SqliteCursor, SqliteSource};
