// src/service.rs
// Glue between the pub/sub transport and the ledger.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::builder::{build_issuance, build_spend};
use crate::crypto::{PublicKey, TxSigner};
use crate::error::LedgerError;
use crate::hash::Hash;
use crate::ledger::{ApplyOutcome, Ledger};
use crate::message::{Channel, PostTransaction};
use crate::policy::{IssuanceGrant, IssuancePolicy, OrganizationId};
use crate::transaction::Transaction;

/// A message handed to the transport for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub channel: Channel,
    pub message: PostTransaction,
}

/// A message the transport delivered, ours or a peer's.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: String,
    pub sender: PublicKey,
    pub payload: Vec<u8>,
}

/// Outbound side of the transport.
pub trait Broadcast: Send + Sync {
    fn broadcast(&self, outbound: Outbound) -> Result<(), LedgerError>;
}

pub type OutboundSender = mpsc::Sender<Outbound>;
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

impl Broadcast for OutboundSender {
    fn broadcast(&self, outbound: Outbound) -> Result<(), LedgerError> {
        self.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => LedgerError::Transport("outbound queue full".into()),
            TrySendError::Closed(_) => LedgerError::Transport("outbound queue closed".into()),
        })
    }
}

pub struct CoinService {
    ledger: Arc<Ledger>,
    policy: Arc<dyn IssuancePolicy>,
    transport: Arc<dyn Broadcast>,
}

impl CoinService {
    pub fn new(
        ledger: Arc<Ledger>,
        policy: Arc<dyn IssuancePolicy>,
        transport: Arc<dyn Broadcast>,
    ) -> Self {
        CoinService {
            ledger,
            policy,
            transport,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Publish a built transaction. It reaches the ledger when the transport
    /// delivers it back.
    pub fn submit(
        &self,
        organization: &OrganizationId,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let outbound = Outbound {
            channel: Channel::coin(organization),
            message: PostTransaction::from(tx),
        };
        self.transport.broadcast(outbound)?;
        debug!(organization = %organization, id = %tx.id(), "transaction broadcast");
        Ok(())
    }

    /// Pay `amount` from `signer` to `recipient`, consolidating everything the
    /// signer holds in `organization`.
    pub fn send<S>(
        &self,
        organization: &OrganizationId,
        signer: &S,
        recipient: &Hash,
        amount: i64,
    ) -> Result<Transaction, LedgerError>
    where
        S: TxSigner + ?Sized,
    {
        let available = self
            .ledger
            .spendable_outputs(organization, &signer.public_key().hash());
        let tx = build_spend(signer, recipient, amount, &available)?;
        self.submit(organization, &tx)?;
        Ok(tx)
    }

    pub fn issue(
        &self,
        grant: &IssuanceGrant,
        beneficiaries: &[Hash],
        amount_per_beneficiary: i64,
    ) -> Result<Transaction, LedgerError> {
        let tx = build_issuance(grant, beneficiaries, amount_per_beneficiary)?;
        self.submit(grant.organization(), &tx)?;
        Ok(tx)
    }

    /// Parse, authorize and apply one delivered message.
    pub fn deliver(&self, delivery: &Delivery) -> Result<ApplyOutcome, LedgerError> {
        let organization = Channel::parse(&delivery.channel)?.organization();
        let message = PostTransaction::from_json(&delivery.payload)?;
        let tx = Transaction::try_from(message)?;

        if tx.is_coinbase() && !self.policy.may_issue(&organization, &delivery.sender) {
            return Err(LedgerError::Unauthorized(organization.to_string()));
        }

        self.ledger.apply(&organization, tx)
    }

    /// Drain `inbound` until the transport closes it. Rejected messages are
    /// logged and dropped.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<Delivery>) {
        info!("coin service started");
        while let Some(delivery) = inbound.recv().await {
            match self.deliver(&delivery) {
                Ok(ApplyOutcome::Applied) => {}
                Ok(ApplyOutcome::AlreadyApplied) => {
                    debug!(channel = %delivery.channel, "duplicate delivery ignored");
                }
                Err(e) => {
                    warn!(
                        channel = %delivery.channel,
                        sender = %delivery.sender,
                        error = %e,
                        "transaction rejected"
                    );
                }
            }
        }
        info!("coin service stopped: inbound channel closed");
    }
}

/// Bounded outbound queue for a transport task to drain.
pub fn outbound_channel(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity.max(1))
}
