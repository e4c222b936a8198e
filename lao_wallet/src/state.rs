use anyhow::{Context, Result};
use lao_cash::service::{outbound_channel, OutboundReceiver};
use lao_cash::snapshot::write_atomic;
use lao_cash::{
    AccountingMode, ApplyOutcome, CoinService, Delivery, Ledger, LedgerSnapshot, OrganizationId,
    OrganizerRegistry, PublicKey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything the wallet persists besides its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
    pub organizers: BTreeMap<OrganizationId, PublicKey>,
    pub ledger: LedgerSnapshot,
}

impl WalletState {
    pub fn empty(mode: AccountingMode) -> Self {
        WalletState {
            organizers: BTreeMap::new(),
            ledger: LedgerSnapshot::capture(&Ledger::new(mode)),
        }
    }

    pub fn load_or_init(path: &Path, mode: AccountingMode) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::empty(mode));
        }
        let json = fs::read(path)?;
        let state: WalletState = serde_json::from_slice(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// A restored ledger wired to a local loopback transport.
pub struct Session {
    service: CoinService,
    registry: Arc<OrganizerRegistry>,
    outbound: OutboundReceiver,
}

impl Session {
    pub fn open(state: &WalletState, outbound_capacity: usize) -> Result<Self> {
        let ledger = state.ledger.restore().context("replaying saved ledger")?;
        let registry = Arc::new(OrganizerRegistry::new());
        for (organization, organizer) in &state.organizers {
            registry.register(organization.clone(), *organizer);
        }
        let (sender, outbound) = outbound_channel(outbound_capacity);
        let service = CoinService::new(Arc::new(ledger), registry.clone(), Arc::new(sender));
        Ok(Session {
            service,
            registry,
            outbound,
        })
    }

    pub fn service(&self) -> &CoinService {
        &self.service
    }

    pub fn registry(&self) -> &OrganizerRegistry {
        &self.registry
    }

    /// Deliver every queued broadcast back to ourselves, as the transport
    /// would, with `sender` as the authenticated origin.
    pub fn echo(&mut self, sender: &PublicKey) -> Result<Vec<ApplyOutcome>> {
        let mut outcomes = Vec::new();
        while let Ok(outbound) = self.outbound.try_recv() {
            let delivery = Delivery {
                channel: outbound.channel.to_string(),
                sender: *sender,
                payload: outbound.message.to_json()?,
            };
            outcomes.push(self.service.deliver(&delivery)?);
        }
        info!(delivered = outcomes.len(), "loopback delivery complete");
        Ok(outcomes)
    }

    pub fn into_state(self) -> WalletState {
        WalletState {
            organizers: self.registry.entries().into_iter().collect(),
            ledger: LedgerSnapshot::capture(self.service.ledger()),
        }
    }
}
