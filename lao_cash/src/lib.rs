//! Digital cash for an organization (LAO): signed, content-addressed
//! transactions spending prior outputs, an append-only log per organization
//! and the balance index derived from it.
//!
//! Flow: [`builder`] constructs and signs, [`service::CoinService`] hands the
//! message to the transport, and every delivery (our own echo or a peer's)
//! goes through [`validation`] into the [`ledger`].

pub mod builder;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod message;
pub mod policy;
pub mod service;
pub mod snapshot;
pub mod transaction;
pub mod validation;

pub use builder::{build_issuance, build_spend, Amount, SpendableOutput};
pub use config::LedgerConfig;
pub use crypto::{KeyPair, PublicKey, Signature, TxSigner};
pub use error::{LedgerError, Result};
pub use hash::Hash;
pub use ledger::{ApplyOutcome, IndexSnapshot, Ledger, OrganizationLedger};
pub use message::{Channel, PostTransaction};
pub use policy::{IssuanceGrant, IssuancePolicy, OrganizationId, OrganizerRegistry};
pub use service::{Broadcast, CoinService, Delivery, Outbound};
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use transaction::{OutPoint, Transaction, TransactionBody, TxIn, TxOut, PROTOCOL_VERSION};
pub use validation::AccountingMode;
