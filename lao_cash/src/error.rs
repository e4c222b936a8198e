// src/error.rs
use thiserror::Error;

/// Failures surfaced by the builder, the validator and the delivery path.
///
/// None of these are fatal: a rejected transaction is dropped and the ledger
/// keeps the state it had before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("input references unknown output {tx_out_hash}:{tx_out_index}")]
    UnknownOutput { tx_out_hash: String, tx_out_index: i64 },

    #[error("public key does not own output {tx_out_hash}:{tx_out_index}")]
    OwnershipMismatch { tx_out_hash: String, tx_out_index: i64 },

    #[error("signature verification failed for input {input}")]
    SignatureInvalid { input: usize },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("output {tx_out_hash}:{tx_out_index} is already spent")]
    OutputAlreadySpent { tx_out_hash: String, tx_out_index: i64 },

    #[error("outputs ({outputs}) exceed inputs ({inputs})")]
    UnbalancedTransaction { inputs: u64, outputs: u64 },

    #[error("value overflow")]
    ValueOverflow,

    #[error("issuance needs at least one beneficiary")]
    NoBeneficiaries,

    #[error("not authorized to issue coins in organization {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
