//! Signers and signed rows built from the fixed test keys.

use icdb_common_core::{Column, Row, Serial, Value, IC_COLUMN, SERIAL_COLUMN};
use icdb_crypto::{canonical_message, canonical_payload, test_keys, AlgorithmType, KeyMaterial, Signer};
use std::sync::Arc;

/// Both key families.
pub fn key_material() -> KeyMaterial {
    test_keys::key_material()
}

/// Signer for `algorithm` over the test keys.
pub fn signer(algorithm: AlgorithmType) -> Arc<Signer> {
    Arc::new(Signer::for_algorithm(algorithm, &key_material()).expect("test keys cover every algorithm"))
}

/// Builds rows in the `[payload*, ic, serial]+` layout with valid codes.
pub struct RowBuilder {
    signer: Arc<Signer>,
    tables: Vec<String>,
    columns: Vec<Column>,
}

impl RowBuilder {
    pub fn new<I, S>(signer: Arc<Signer>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            signer,
            tables: tables.into_iter().map(Into::into).collect(),
            columns: Vec::new(),
        }
    }

    /// Append a signed group.
    pub fn group<N, V>(mut self, payload: impl IntoIterator<Item = (N, V)>, serial: u64) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let payload: Vec<Column> = payload.into_iter().map(|(n, v)| Column::new(n, v)).collect();
        let code = self.code_for(payload.iter().map(|c| &c.value), serial);
        self.columns.extend(payload);
        self.columns.push(Column::new(IC_COLUMN, Value::Blob(code)));
        self.columns.push(Column::new(SERIAL_COLUMN, Value::Integer(serial as i64)));
        self
    }

    /// Append a group without the code column, as aggregate queries return.
    pub fn unsigned_group<N, V>(mut self, payload: impl IntoIterator<Item = (N, V)>, serial: u64) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        self.columns.extend(payload.into_iter().map(|(n, v)| Column::new(n, v)));
        self.columns.push(Column::new(SERIAL_COLUMN, Value::Integer(serial as i64)));
        self
    }

    /// Integrity code a group with these values and serial should carry.
    pub fn code_for<'a>(&self, values: impl IntoIterator<Item = &'a Value>, serial: u64) -> Vec<u8> {
        let payload = canonical_payload(values, &self.tables);
        self.signer
            .sign(&canonical_message(&payload, Serial(serial)))
            .expect("test signer holds a private key")
    }

    pub fn build(self) -> Row {
        Row::new(self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_group_layout() {
        let row = RowBuilder::new(signer(AlgorithmType::Sha), ["employees"])
            .group([("id", Value::Integer(1)), ("name", Value::from("Ann"))], 3)
            .build();
        let names: Vec<&str> = row.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "ic", "serial"]);
        assert_eq!(row.get(3).unwrap().value, Value::Integer(3));
    }

    #[test]
    fn test_code_verifies() {
        let signer = signer(AlgorithmType::Rsa);
        let builder = RowBuilder::new(Arc::clone(&signer), ["t"]);
        let values = [Value::Integer(5)];
        let code = builder.code_for(&values, 9);
        let message = canonical_message(&canonical_payload(&values, ["t"]), Serial(9));
        assert!(signer.verify(&message, &code));
    }
}
