// src/message.rs
// Wire format of coin messages and the channel they travel on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;
use crate::hash::Hash;
use crate::policy::OrganizationId;
use crate::transaction::{Transaction, TransactionBody};

const ROOT_PREFIX: &str = "/root/";
const COIN_SUFFIX: &str = "/coin";

/// `{ "transaction_id": ..., "transaction": { ... } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTransaction {
    pub transaction_id: Hash,
    pub transaction: TransactionBody,
}

impl PostTransaction {
    pub fn from_json(bytes: &[u8]) -> Result<Self, LedgerError> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::MalformedMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, LedgerError> {
        serde_json::to_vec(self).map_err(|e| LedgerError::MalformedMessage(e.to_string()))
    }
}

impl From<&Transaction> for PostTransaction {
    fn from(tx: &Transaction) -> Self {
        PostTransaction {
            transaction_id: tx.id().clone(),
            transaction: tx.body().clone(),
        }
    }
}

impl TryFrom<PostTransaction> for Transaction {
    type Error = LedgerError;

    /// Schema-check the body and make sure the advertised id is the real one.
    fn try_from(message: PostTransaction) -> Result<Self, Self::Error> {
        message.transaction.check_schema()?;
        let tx = Transaction::new(message.transaction);
        if *tx.id() != message.transaction_id {
            return Err(LedgerError::MalformedMessage(format!(
                "transaction_id {} does not match computed id {}",
                message.transaction_id,
                tx.id()
            )));
        }
        Ok(tx)
    }
}

/// Pub/sub channel carrying an organization's coin messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel(String);

impl Channel {
    pub fn coin(organization: &OrganizationId) -> Self {
        Channel(format!("{ROOT_PREFIX}{organization}{COIN_SUFFIX}"))
    }

    pub fn parse(channel: &str) -> Result<Self, LedgerError> {
        let org = channel
            .strip_prefix(ROOT_PREFIX)
            .and_then(|rest| rest.strip_suffix(COIN_SUFFIX))
            .filter(|org| !org.is_empty() && !org.contains('/'))
            .ok_or_else(|| {
                LedgerError::MalformedMessage(format!("{channel:?} is not a coin channel"))
            })?;
        Ok(Channel::coin(&OrganizationId::new(org)))
    }

    pub fn organization(&self) -> OrganizationId {
        let inner = &self.0[ROOT_PREFIX.len()..self.0.len() - COIN_SUFFIX.len()];
        OrganizationId::new(inner)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
