//! Point-in-time ledger snapshots
//!
//! A snapshot is the JSON form of the whole `Marketplace` plus a SHA3-256 digest of
//! that state. Loading refuses a snapshot whose digest does not match its contents.

use crate::{LedgerError, LedgerResult, Marketplace, LEDGER_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::path::Path;

/// Serialized ledger state with an integrity digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Ledger version that wrote the snapshot
    pub version: String,
    /// Hex SHA3-256 of the JSON-encoded state
    pub state_digest: String,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// The ledger itself
    pub state: Marketplace,
}

impl LedgerSnapshot {
    /// Check the version and the digest against the embedded state
    pub fn verify(&self) -> LedgerResult<()> {
        if self.version != LEDGER_VERSION {
            return Err(LedgerError::Snapshot(format!(
                "Unsupported snapshot version: {}",
                self.version
            )));
        }

        let digest = self.state.state_digest()?;
        if digest != self.state_digest {
            return Err(LedgerError::Snapshot(format!(
                "State digest mismatch: expected {}, computed {}",
                self.state_digest, digest
            )));
        }
        Ok(())
    }

    /// Encode as pretty JSON
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and verify
    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_slice(bytes)?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

impl Marketplace {
    /// Hex SHA3-256 digest of the JSON-encoded ledger state
    pub fn state_digest(&self) -> LedgerResult<String> {
        let state_bytes = serde_json::to_vec(self)?;

        let mut hasher = Sha3_256::new();
        hasher.update(&state_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Capture the current state
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            version: LEDGER_VERSION.to_string(),
            state_digest: self.state_digest()?,
            taken_at: Utc::now(),
            state: self.clone(),
        })
    }

    /// Write a snapshot to `path`, creating parent directories as needed
    pub fn save_snapshot(&self, path: &Path) -> LedgerResult<()> {
        let bytes = self.snapshot()?.to_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;

        tracing::info!(
            "Saved ledger snapshot to {} ({} events)",
            path.display(),
            self.events().len()
        );
        Ok(())
    }

    /// Restore a ledger from a snapshot file
    pub fn load_snapshot(path: &Path) -> LedgerResult<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot = LedgerSnapshot::from_bytes(&bytes)?;

        tracing::info!(
            "Loaded ledger snapshot from {} taken at {}",
            path.display(),
            snapshot.taken_at
        );
        Ok(snapshot.state)
    }
}
