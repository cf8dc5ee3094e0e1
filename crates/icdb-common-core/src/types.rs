//! Row and value types shared by the verification engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Name of the reserved column carrying the integrity code.
pub const IC_COLUMN: &str = "ic";

/// Name of the reserved column carrying the serial number.
pub const SERIAL_COLUMN: &str = "serial";

/// Identifier of a signed unit (row or row group).
///
/// Serials are assigned monotonically when a code is issued and double as the
/// key of the revocation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serial(pub u64);

impl Serial {
    /// Raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Big-endian encoding appended to every signed message.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for Serial {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Serial {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed column value as returned by the protected store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Is this a SQL NULL?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view, if the value is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used by aggregate post-processing.
    ///
    /// Text is parsed so that `DECIMAL` columns surfaced as strings still
    /// participate in sums.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Canonical textual form. This is the exact text that gets signed, so it
/// must never change for existing variants.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

/// A named column of a fetched row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as reported by the store.
    pub name: String,
    /// Column value.
    pub value: Value,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Does this column carry an integrity code?
    pub fn is_code(&self) -> bool {
        self.name.eq_ignore_ascii_case(IC_COLUMN)
    }

    /// Does this column carry a serial number?
    pub fn is_serial(&self) -> bool {
        self.name.eq_ignore_ascii_case(SERIAL_COLUMN)
    }

    /// Is this an ordinary payload column?
    pub fn is_payload(&self) -> bool {
        !self.is_code() && !self.is_serial()
    }
}

/// An ordered sequence of named column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: Vec<Column>,
}

impl Row {
    /// Create a row from columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a row from `(name, value)` pairs.
    pub fn from_pairs<N, V, I>(pairs: I) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (N, V)>,
    {
        pairs.into_iter().map(|(n, v)| Column::new(n, v)).collect()
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at position.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// First column with the given name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Does the row have no columns?
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Append a column.
    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }
}

impl FromIterator<Column> for Row {
    fn from_iter<T: IntoIterator<Item = Column>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Audit dump of a row, e.g. `(id: 7, name: alice, ic: 0a9f.., serial: 12)`.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", column.name, column.value)?;
        }
        f.write_str(")")
    }
}
