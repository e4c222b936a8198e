// src/transaction.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{PublicKey, Signature};
use crate::encoding;
use crate::error::LedgerError;
use crate::hash::Hash;

/// Only protocol version currently produced or accepted.
pub const PROTOCOL_VERSION: u32 = 1;

/// Transaction id placeholder referenced by the money-creating input.
pub const COINBASE_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";
pub const COINBASE_INDEX: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "P2PKH")]
    P2pkh,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::P2pkh => "P2PKH",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A claim on output `tx_out_index` of transaction `tx_out_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_out_hash: Hash,
    pub tx_out_index: i64,
}

impl OutPoint {
    pub fn new(tx_out_hash: Hash, tx_out_index: i64) -> Self {
        OutPoint { tx_out_hash, tx_out_index }
    }

    pub fn coinbase() -> Self {
        OutPoint {
            tx_out_hash: Hash::from_static(COINBASE_HASH),
            tx_out_index: COINBASE_INDEX,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_out_index == COINBASE_INDEX && self.tx_out_hash.as_str() == COINBASE_HASH
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_out_hash, self.tx_out_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockingScript {
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    pub pubkey: PublicKey,
    pub sig: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockingScript {
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    pub pubkey_hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    #[serde(flatten)]
    pub outpoint: OutPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<UnlockingScript>,
}

impl TxIn {
    pub fn coinbase() -> Self {
        TxIn {
            outpoint: OutPoint::coinbase(),
            script: None,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.script.is_none() && self.outpoint.is_coinbase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script: LockingScript,
}

impl TxOut {
    pub fn pay_to(owner: Hash, value: u64) -> Self {
        TxOut {
            value,
            script: LockingScript {
                script_type: ScriptType::P2pkh,
                pubkey_hash: owner,
            },
        }
    }

    pub fn owner(&self) -> &Hash {
        &self.script.pubkey_hash
    }
}

/// The hashed and signed part of a transaction, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u64,
}

impl TransactionBody {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.iter().any(TxIn::is_coinbase)
    }

    /// Structural checks that need no ledger state.
    pub fn check_schema(&self) -> Result<(), LedgerError> {
        let malformed = |msg: String| Err(LedgerError::MalformedMessage(msg));

        if self.version != PROTOCOL_VERSION {
            return malformed(format!("unsupported version {}", self.version));
        }
        if self.lock_time != 0 {
            return malformed(format!("lock_time must be 0, got {}", self.lock_time));
        }
        if self.inputs.is_empty() {
            return malformed("transaction has no inputs".into());
        }
        if self.outputs.is_empty() {
            return malformed("transaction has no outputs".into());
        }

        for (i, input) in self.inputs.iter().enumerate() {
            if input.outpoint.is_coinbase() {
                if input.script.is_some() {
                    return malformed(format!("coinbase input {i} carries a script"));
                }
                if self.inputs.len() != 1 {
                    return malformed("coinbase input must be the only input".into());
                }
            } else {
                if input.outpoint.tx_out_index < 0 {
                    return malformed(format!("input {i} has negative output index"));
                }
                if input.script.is_none() {
                    return malformed(format!("input {i} has no unlocking script"));
                }
            }
        }
        Ok(())
    }
}

/// A transaction together with its content address.
///
/// The id is derived from the body on construction and never stored
/// independently, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: Hash,
    body: TransactionBody,
}

impl Transaction {
    pub fn new(body: TransactionBody) -> Self {
        let id = encoding::transaction_id(&body);
        Transaction { id, body }
    }

    pub fn id(&self) -> &Hash {
        &self.id
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.body.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.body.outputs
    }

    pub fn is_coinbase(&self) -> bool {
        self.body.is_coinbase()
    }

    pub fn into_body(self) -> TransactionBody {
        self.body
    }

    /// Sum of output values, `None` on overflow.
    pub fn total_output(&self) -> Option<u64> {
        self.body
            .outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Hash {
        Hash::of_public_key(&[3u8; 32])
    }

    fn issuance() -> TransactionBody {
        TransactionBody {
            version: PROTOCOL_VERSION,
            inputs: vec![TxIn::coinbase()],
            outputs: vec![TxOut::pay_to(owner(), 100)],
            lock_time: 0,
        }
    }

    #[test]
    fn coinbase_hash_is_valid_base64url() {
        assert!(Hash::new(COINBASE_HASH).is_ok());
    }

    #[test]
    fn coinbase_input_serializes_without_script() {
        let json = serde_json::to_value(TxIn::coinbase()).unwrap();
        assert_eq!(json["tx_out_hash"], COINBASE_HASH);
        assert_eq!(json["tx_out_index"], -1);
        assert!(json.get("script").is_none());
    }

    #[test]
    fn output_script_uses_wire_names() {
        let json = serde_json::to_value(TxOut::pay_to(owner(), 5)).unwrap();
        assert_eq!(json["value"], 5);
        assert_eq!(json["script"]["type"], "P2PKH");
        assert_eq!(json["script"]["pubkey_hash"], owner().as_str());
    }

    #[test]
    fn schema_accepts_issuance() {
        assert!(issuance().check_schema().is_ok());
        assert!(issuance().is_coinbase());
    }

    #[test]
    fn schema_rejects_wrong_version_and_lock_time() {
        let mut body = issuance();
        body.version = 2;
        assert!(matches!(body.check_schema(), Err(LedgerError::MalformedMessage(_))));

        let mut body = issuance();
        body.lock_time = 7;
        assert!(matches!(body.check_schema(), Err(LedgerError::MalformedMessage(_))));
    }

    #[test]
    fn schema_rejects_mixed_coinbase_and_empty_sides() {
        let mut body = issuance();
        body.inputs.push(TxIn::coinbase());
        assert!(body.check_schema().is_err());

        let mut body = issuance();
        body.outputs.clear();
        assert!(body.check_schema().is_err());

        let mut body = issuance();
        body.inputs.clear();
        assert!(body.check_schema().is_err());
    }

    #[test]
    fn schema_rejects_unsigned_spend() {
        let mut body = issuance();
        body.inputs = vec![TxIn {
            outpoint: OutPoint::new(owner(), 0),
            script: None,
        }];
        assert!(body.check_schema().is_err());
    }

    #[test]
    fn id_is_stable() {
        let a = Transaction::new(issuance());
        let b = Transaction::new(issuance());
        assert_eq!(a.id(), b.id());
        assert_eq!(a.total_output(), Some(100));
    }
}
