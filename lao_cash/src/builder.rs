// src/builder.rs
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::TxSigner;
use crate::encoding;
use crate::error::LedgerError;
use crate::hash::Hash;
use crate::policy::IssuanceGrant;
use crate::transaction::{
    OutPoint, ScriptType, Transaction, TransactionBody, TxIn, TxOut, UnlockingScript,
    PROTOCOL_VERSION,
};

/// A non-negative whole amount of coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, LedgerError> {
        u64::try_from(value)
            .map(Amount)
            .map_err(|_| LedgerError::InvalidAmount(format!("{value} is negative")))
    }

    /// Parse user input. Fractions, signs and anything non-numeric are rejected.
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::InvalidAmount(format!("{text:?} is not a whole number")));
        }
        trimmed
            .parse::<u64>()
            .map(Amount)
            .map_err(|_| LedgerError::InvalidAmount(format!("{text:?} is out of range")))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Amount as accepted by the builder entry points.
    pub fn as_i64(self) -> Result<i64, LedgerError> {
        i64::try_from(self.0)
            .map_err(|_| LedgerError::InvalidAmount(format!("{} is out of range", self.0)))
    }
}

/// An output a spender may consume, as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableOutput {
    pub outpoint: OutPoint,
    pub owner: Hash,
    pub value: u64,
}

/// Build and sign a payment of `amount` to `recipient`.
///
/// Every output in `available` owned by the signer becomes an input; whatever
/// is not paid to the recipient goes back to the signer as a change output.
pub fn build_spend<S>(
    signer: &S,
    recipient: &Hash,
    amount: i64,
    available: &[SpendableOutput],
) -> Result<Transaction, LedgerError>
where
    S: TxSigner + ?Sized,
{
    let amount = Amount::new(amount)?.value();
    let public_key = signer.public_key();
    let owner = public_key.hash();

    let owned: Vec<&SpendableOutput> = available.iter().filter(|o| o.owner == owner).collect();
    let total = owned
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.value))
        .ok_or(LedgerError::ValueOverflow)?;

    if owned.is_empty() || amount > total {
        return Err(LedgerError::InsufficientFunds {
            requested: amount,
            available: total,
        });
    }

    let mut outputs = vec![TxOut::pay_to(recipient.clone(), amount)];
    if amount < total {
        outputs.push(TxOut::pay_to(owner, total - amount));
    }

    let payload = encoding::signing_payload(owned.iter().map(|o| &o.outpoint), &outputs);
    let sig = signer.sign(&payload);

    let inputs = owned
        .iter()
        .map(|o| TxIn {
            outpoint: o.outpoint.clone(),
            script: Some(UnlockingScript {
                script_type: ScriptType::P2pkh,
                pubkey: public_key,
                sig,
            }),
        })
        .collect();

    let tx = Transaction::new(TransactionBody {
        version: PROTOCOL_VERSION,
        inputs,
        outputs,
        lock_time: 0,
    });
    debug!(id = %tx.id(), amount, total, "built spend");
    Ok(tx)
}

/// Build a money-creating transaction paying `amount_per_beneficiary` to each
/// beneficiary. The grant is the caller's proof of organizer authority.
pub fn build_issuance(
    grant: &IssuanceGrant,
    beneficiaries: &[Hash],
    amount_per_beneficiary: i64,
) -> Result<Transaction, LedgerError> {
    let amount = Amount::new(amount_per_beneficiary)?.value();
    if beneficiaries.is_empty() {
        return Err(LedgerError::NoBeneficiaries);
    }
    let outputs: Vec<TxOut> = beneficiaries
        .iter()
        .map(|b| TxOut::pay_to(b.clone(), amount))
        .collect();
    outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.value))
        .ok_or(LedgerError::ValueOverflow)?;

    let tx = Transaction::new(TransactionBody {
        version: PROTOCOL_VERSION,
        inputs: vec![TxIn::coinbase()],
        outputs,
        lock_time: 0,
    });
    debug!(
        id = %tx.id(),
        organization = %grant.organization(),
        beneficiaries = beneficiaries.len(),
        amount,
        "built issuance"
    );
    Ok(tx)
}
