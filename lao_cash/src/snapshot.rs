// src/snapshot.rs
// JSON export of the transaction logs. Indices are never stored: loading a
// snapshot replays every log through the validator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::message::PostTransaction;
use crate::policy::OrganizationId;
use crate::transaction::Transaction;
use crate::validation::AccountingMode;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot replay of {organization} failed: {source}")]
    Replay {
        organization: OrganizationId,
        source: LedgerError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub created_at: String,
    pub accounting: AccountingMode,
    pub organizations: BTreeMap<OrganizationId, Vec<PostTransaction>>,
}

impl LedgerSnapshot {
    pub fn capture(ledger: &Ledger) -> Self {
        let organizations = ledger
            .organizations()
            .into_iter()
            .map(|org| {
                let log = ledger.log(&org).iter().map(PostTransaction::from).collect();
                (org, log)
            })
            .collect();
        LedgerSnapshot {
            created_at: chrono::Utc::now().to_rfc3339(),
            accounting: ledger.mode(),
            organizations,
        }
    }

    /// Rebuild a ledger by applying every logged transaction in order.
    pub fn restore(&self) -> Result<Ledger, SnapshotError> {
        let ledger = Ledger::new(self.accounting);
        for (organization, log) in &self.organizations {
            for message in log {
                let replay = |source| SnapshotError::Replay {
                    organization: organization.clone(),
                    source,
                };
                let tx = Transaction::try_from(message.clone()).map_err(replay)?;
                ledger.apply(organization, tx).map_err(replay)?;
            }
        }
        Ok(ledger)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let data = fs::read(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&data)?;
        info!(
            path = %path.display(),
            organizations = snapshot.organizations.len(),
            "loaded ledger snapshot"
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)?;
        Ok(())
    }
}

/// Write via a synced sibling temp file and rename, so a crash never leaves
/// a torn file at `path`. Missing parent directories are created.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
