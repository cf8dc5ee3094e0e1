//! Integrity code revocation list (ICRL).
//!
//! A newline-delimited file of decimal serials. Every serial listed there is
//! revoked: rows carrying it must fail verification even when their code is
//! valid. Serials not in the list are not revoked.

use dashmap::DashSet;
use icdb_common_core::Serial;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// ICRL errors.
#[derive(Debug, Error)]
pub enum IcrlError {
    #[error("revocation list I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid serial on line {line}: {content:?}")]
    Parse { line: usize, content: String },
}

/// Result type for ICRL operations.
pub type Result<T> = std::result::Result<T, IcrlError>;

/// Revocation list backed by an append-only file.
///
/// Lookups go to a concurrent set and never block. Revocations are
/// serialised by a mutex around the file and become visible only after the
/// line has been synced to disk.
pub struct Icrl {
    path: PathBuf,
    revoked: DashSet<Serial>,
    file: Mutex<File>,
}

impl Icrl {
    /// Load the list at `path`, creating an empty file when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| IcrlError::Io {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(io_err)?;

        let revoked = DashSet::new();
        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let serial = trimmed.parse::<Serial>().map_err(|_| IcrlError::Parse {
                line: index + 1,
                content: line.to_string(),
            })?;
            revoked.insert(serial);
        }

        // a last line without its newline would swallow the next append
        if !contents.is_empty() && !contents.ends_with('\n') {
            file.write_all(b"\n")
                .and_then(|_| file.sync_data())
                .map_err(io_err)?;
        }

        info!(path = %path.display(), revoked = revoked.len(), "loaded revocation list");

        Ok(Self {
            path,
            revoked,
            file: Mutex::new(file),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Is `serial` revoked?
    pub fn contains(&self, serial: Serial) -> bool {
        self.revoked.contains(&serial)
    }

    /// Durably revoke `serial`. Returns `false` when it was already revoked.
    pub fn revoke(&self, serial: Serial) -> Result<bool> {
        let mut file = self.file.lock();
        if self.revoked.contains(&serial) {
            debug!(%serial, "serial already revoked");
            return Ok(false);
        }

        writeln!(file, "{serial}")
            .and_then(|_| file.sync_data())
            .map_err(|source| self.io_error(source))?;
        self.revoked.insert(serial);

        info!(%serial, "revoked serial");
        Ok(true)
    }

    /// Revoke several serials, returning how many were newly revoked.
    pub fn revoke_all<I>(&self, serials: I) -> Result<usize>
    where
        I: IntoIterator<Item = Serial>,
    {
        let mut added = 0;
        for serial in serials {
            if self.revoke(serial)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Empty the list, on disk and in memory.
    pub fn reset(&self) -> Result<()> {
        let file = self.file.lock();
        file.set_len(0)
            .and_then(|_| file.sync_all())
            .map_err(|source| self.io_error(source))?;
        let cleared = self.revoked.len();
        self.revoked.clear();

        warn!(path = %self.path.display(), cleared, "revocation list reset");
        Ok(())
    }

    /// Number of revoked serials.
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }

    /// Revoked serials in ascending order.
    pub fn serials(&self) -> Vec<Serial> {
        let mut serials: Vec<Serial> = self.revoked.iter().map(|s| *s).collect();
        serials.sort_unstable();
        serials
    }

    fn io_error(&self, source: io::Error) -> IcrlError {
        IcrlError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for Icrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Icrl")
            .field("path", &self.path)
            .field("revoked", &self.revoked.len())
            .finish()
    }
}
