// src/validation.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::encoding;
use crate::error::LedgerError;
use crate::hash::Hash;
use crate::transaction::{OutPoint, Transaction};

/// How consumed outputs affect balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountingMode {
    /// Outputs only ever credit their owner; spending never debits.
    #[default]
    RunningCredit,
    /// Outputs are spent exactly once and debited from their owner.
    StrictUtxo,
}

/// A recorded output as seen by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub owner: Hash,
    pub value: u64,
    pub spent: bool,
}

/// Read access to the outputs already in an organization's log.
pub trait OutputLookup {
    fn output(&self, outpoint: &OutPoint) -> Option<&OutputRecord>;
}

/// What an accepted transaction consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    pub consumed: Vec<OutPoint>,
    pub input_value: u64,
}

/// Check a transaction against the outputs it claims.
///
/// Coinbase transactions pass once their schema is sound; whether their issuer
/// was allowed to create money is decided before they get here.
pub fn validate_transaction<L>(
    tx: &Transaction,
    outputs: &L,
    mode: AccountingMode,
) -> Result<ValidatedTransaction, LedgerError>
where
    L: OutputLookup + ?Sized,
{
    tx.body().check_schema()?;
    let output_value = tx.total_output().ok_or(LedgerError::ValueOverflow)?;

    if tx.is_coinbase() {
        return Ok(ValidatedTransaction {
            consumed: Vec::new(),
            input_value: 0,
        });
    }

    let payload = encoding::body_signing_payload(tx.body());
    let mut seen = HashSet::new();
    let mut input_value = 0u64;

    for (i, input) in tx.inputs().iter().enumerate() {
        let outpoint = &input.outpoint;
        let referenced = outputs.output(outpoint).ok_or_else(|| LedgerError::UnknownOutput {
            tx_out_hash: outpoint.tx_out_hash.to_string(),
            tx_out_index: outpoint.tx_out_index,
        })?;

        let script = input
            .script
            .as_ref()
            .ok_or_else(|| {
                LedgerError::MalformedMessage(format!("input {i} has no unlocking script"))
            })?;

        if script.pubkey.hash() != referenced.owner {
            return Err(LedgerError::OwnershipMismatch {
                tx_out_hash: outpoint.tx_out_hash.to_string(),
                tx_out_index: outpoint.tx_out_index,
            });
        }

        if !script.pubkey.verify(&payload, &script.sig) {
            return Err(LedgerError::SignatureInvalid { input: i });
        }

        let respent = referenced.spent || !seen.insert(outpoint.clone());
        if mode == AccountingMode::StrictUtxo && respent {
            return Err(LedgerError::OutputAlreadySpent {
                tx_out_hash: outpoint.tx_out_hash.to_string(),
                tx_out_index: outpoint.tx_out_index,
            });
        }

        input_value = input_value
            .checked_add(referenced.value)
            .ok_or(LedgerError::ValueOverflow)?;
    }

    if mode == AccountingMode::StrictUtxo && output_value > input_value {
        return Err(LedgerError::UnbalancedTransaction {
            inputs: input_value,
            outputs: output_value,
        });
    }

    Ok(ValidatedTransaction {
        consumed: tx.inputs().iter().map(|i| i.outpoint.clone()).collect(),
        input_value,
    })
}
