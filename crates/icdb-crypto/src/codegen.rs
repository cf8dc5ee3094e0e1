//! Issuing side: serial allocation and code generation for new records.

use crate::error::Result;
use crate::message::canonical_message;
use crate::signer::Signer;
use icdb_common_core::Serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic serial allocator.
#[derive(Debug)]
pub struct SerialIssuer {
    next: AtomicU64,
}

impl SerialIssuer {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next serial.
    pub fn issue(&self) -> Serial {
        Serial(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Serial the next call to [`issue`](Self::issue) will return.
    pub fn peek(&self) -> Serial {
        Serial(self.next.load(Ordering::SeqCst))
    }
}

impl Default for SerialIssuer {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

/// A freshly issued code and the serial it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: Vec<u8>,
    pub serial: Serial,
}

/// Produces integrity codes for payloads headed into the store.
#[derive(Debug)]
pub struct CodeGen {
    signer: Arc<Signer>,
    serials: SerialIssuer,
}

impl CodeGen {
    pub fn new(signer: Arc<Signer>, serials: SerialIssuer) -> Self {
        Self { signer, serials }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Allocate a serial and sign `payload` under it.
    pub fn issue(&self, payload: &str) -> Result<IssuedCode> {
        let serial = self.serials.issue();
        let code = self.code_for(payload, serial)?;
        Ok(IssuedCode { code, serial })
    }

    /// Sign `payload` under an existing serial.
    pub fn code_for(&self, payload: &str, serial: Serial) -> Result<Vec<u8>> {
        self.signer.sign(&canonical_message(payload, serial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmType;
    use crate::test_keys;

    #[test]
    fn test_serials_are_monotonic() {
        let issuer = SerialIssuer::starting_at(10);
        assert_eq!(issuer.peek(), Serial(10));
        assert_eq!(issuer.issue(), Serial(10));
        assert_eq!(issuer.issue(), Serial(11));
        assert_eq!(SerialIssuer::default().issue(), Serial(1));
    }

    #[test]
    fn test_issued_code_verifies() {
        for algorithm in AlgorithmType::ALL {
            let signer = Signer::for_algorithm(algorithm, &test_keys::key_material()).unwrap();
            let codegen = CodeGen::new(Arc::new(signer), SerialIssuer::default());
            let issued = codegen.issue("7Bobemployees").unwrap();
            let message = canonical_message("7Bobemployees", issued.serial);
            assert!(codegen.signer().verify(&message, &issued.code));
        }
    }

    #[test]
    fn test_concurrent_issue_yields_unique_serials() {
        let issuer = Arc::new(SerialIssuer::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let issuer = Arc::clone(&issuer);
                std::thread::spawn(move || (0..50).map(|_| issuer.issue()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<Serial> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
    }
}
