// src/policy.rs
// Issuance authorization lives outside the ledger; the ledger only sees grants.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::PublicKey;
use crate::error::LedgerError;

/// Scope of a ledger instance (a LAO id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        OrganizationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(id: &str) -> Self {
        OrganizationId::new(id)
    }
}

/// Decides who may create money in an organization.
pub trait IssuancePolicy: Send + Sync {
    fn may_issue(&self, organization: &OrganizationId, issuer: &PublicKey) -> bool;
}

/// Proof that a policy allowed `issuer` to issue in `organization`.
///
/// Only obtainable through [`IssuanceGrant::request`].
#[derive(Debug, Clone)]
pub struct IssuanceGrant {
    organization: OrganizationId,
    issuer: PublicKey,
}

impl IssuanceGrant {
    pub fn request(
        policy: &dyn IssuancePolicy,
        organization: &OrganizationId,
        issuer: &PublicKey,
    ) -> Result<Self, LedgerError> {
        if !policy.may_issue(organization, issuer) {
            return Err(LedgerError::Unauthorized(organization.to_string()));
        }
        Ok(IssuanceGrant {
            organization: organization.clone(),
            issuer: *issuer,
        })
    }

    pub fn organization(&self) -> &OrganizationId {
        &self.organization
    }

    pub fn issuer(&self) -> &PublicKey {
        &self.issuer
    }
}

/// One organizer key per organization.
#[derive(Debug, Default)]
pub struct OrganizerRegistry {
    organizers: DashMap<OrganizationId, PublicKey>,
}

impl OrganizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the organizer of `organization`, replacing any previous one.
    pub fn register(
        &self,
        organization: OrganizationId,
        organizer: PublicKey,
    ) -> Option<PublicKey> {
        self.organizers.insert(organization, organizer)
    }

    pub fn organizer(&self, organization: &OrganizationId) -> Option<PublicKey> {
        self.organizers.get(organization).map(|entry| *entry.value())
    }

    pub fn entries(&self) -> Vec<(OrganizationId, PublicKey)> {
        let mut entries: Vec<_> = self
            .organizers
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl IssuancePolicy for OrganizerRegistry {
    fn may_issue(&self, organization: &OrganizationId, issuer: &PublicKey) -> bool {
        self.organizer(organization).as_ref() == Some(issuer)
    }
}
