//! Splitting fetched rows into signed groups.
//!
//! A row is laid out as `[payload*, ic, serial]` repeated once per
//! contributing table; join results simply concatenate the groups. Rows
//! fetched for aggregate verification may omit `ic`.

use icdb_common_core::{Column, Row, Serial, Value};
use icdb_crypto::{canonical_message, canonical_payload};
use thiserror::Error;

/// One signed unit of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordGroup {
    /// Canonical payload text, table names included.
    pub payload: String,
    /// Stored integrity code, absent in aggregate-layout rows.
    pub code: Option<Vec<u8>>,
    pub serial: Serial,
}

impl RecordGroup {
    /// Bytes the code was issued over.
    pub fn message(&self) -> Vec<u8> {
        canonical_message(&self.payload, self.serial)
    }
}

/// Why a row could not be split into groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("payload columns follow the last (ic, serial) pair")]
    TrailingPayload,

    #[error("`ic` in column {index} is not followed by `serial`")]
    DanglingCode { index: usize },

    #[error("`serial` in column {index} is not a non-negative integer: {value}")]
    BadSerial { index: usize, value: String },

    #[error("`ic` in column {index} is neither a blob nor hex text")]
    BadCode { index: usize },

    #[error("group {group} has no integrity code")]
    MissingCode { group: usize },

    #[error("row has no (ic, serial) groups")]
    NoGroups,
}

/// Decode stored code bytes. Hex text is accepted in either case.
pub fn code_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Blob(bytes) => Some(bytes.clone()),
        Value::Text(text) => hex::decode(text.trim()).ok(),
        _ => None,
    }
}

fn serial_at(column: &Column, index: usize) -> Result<Serial, MalformedRecord> {
    match column.value {
        Value::Integer(v) if v >= 0 => Ok(Serial(v as u64)),
        ref other => Err(MalformedRecord::BadSerial {
            index,
            value: other.to_string(),
        }),
    }
}

/// Split a row into its signed groups. `tables` are appended, lower-cased,
/// to every group's payload.
pub fn decode_record(row: &Row, tables: &[String]) -> Result<Vec<RecordGroup>, MalformedRecord> {
    let columns = row.columns();
    let mut groups = Vec::new();
    let mut payload: Vec<&Value> = Vec::new();
    let mut index = 0;

    while index < columns.len() {
        let column = &columns[index];

        if column.is_code() {
            let serial_column = columns
                .get(index + 1)
                .filter(|c| c.is_serial())
                .ok_or(MalformedRecord::DanglingCode { index })?;
            let code = code_bytes(&column.value).ok_or(MalformedRecord::BadCode { index })?;
            let serial = serial_at(serial_column, index + 1)?;
            groups.push(RecordGroup {
                payload: canonical_payload(payload.drain(..), tables),
                code: Some(code),
                serial,
            });
            index += 2;
        } else if column.is_serial() {
            groups.push(RecordGroup {
                payload: canonical_payload(payload.drain(..), tables),
                code: None,
                serial: serial_at(column, index)?,
            });
            index += 1;
        } else {
            payload.push(&column.value);
            index += 1;
        }
    }

    if groups.is_empty() {
        return Err(MalformedRecord::NoGroups);
    }
    if !payload.is_empty() {
        return Err(MalformedRecord::TrailingPayload);
    }
    Ok(groups)
}
