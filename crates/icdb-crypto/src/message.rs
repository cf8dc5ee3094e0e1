//! Canonical byte form of a signed unit.

use icdb_common_core::{Serial, Value};
use std::fmt::Write;

/// Payload text of a record: the canonical text of every value followed by
/// the lower-cased names of the contributing tables.
pub fn canonical_payload<'a, V, T>(values: V, tables: T) -> String
where
    V: IntoIterator<Item = &'a Value>,
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut payload = String::new();
    for value in values {
        let _ = write!(payload, "{value}");
    }
    for table in tables {
        payload.push_str(&table.as_ref().to_lowercase());
    }
    payload
}

/// Bytes that get signed: UTF-8 payload then the 8-byte big-endian serial.
pub fn canonical_message(payload: &str, serial: Serial) -> Vec<u8> {
    let mut message = Vec::with_capacity(payload.len() + 8);
    message.extend_from_slice(payload.as_bytes());
    message.extend_from_slice(&serial.to_be_bytes());
    message
}
