// src/ledger.rs
// Per-organization transaction log with derived owner and balance indices.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::builder::SpendableOutput;
use crate::error::LedgerError;
use crate::hash::Hash;
use crate::policy::OrganizationId;
use crate::transaction::{OutPoint, Transaction};
use crate::validation::{validate_transaction, AccountingMode, OutputLookup, OutputRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The id was already in the log; nothing changed.
    AlreadyApplied,
}

/// Derived state of one organization, comparable across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSnapshot {
    pub balances: BTreeMap<Hash, u64>,
    pub by_owner: BTreeMap<Hash, Vec<Hash>>,
}

/// Ledger state of a single organization.
///
/// `log` is the primary record; every other field can be rebuilt by replaying
/// it from empty state.
#[derive(Debug, Clone, Default)]
pub struct OrganizationLedger {
    mode: AccountingMode,
    log: Vec<Transaction>,
    positions: HashMap<Hash, usize>,
    by_owner: HashMap<Hash, Vec<Hash>>,
    balances: HashMap<Hash, u64>,
    outputs: HashMap<OutPoint, OutputRecord>,
}

impl OutputLookup for OrganizationLedger {
    fn output(&self, outpoint: &OutPoint) -> Option<&OutputRecord> {
        self.outputs.get(outpoint)
    }
}

impl OrganizationLedger {
    pub fn new(mode: AccountingMode) -> Self {
        OrganizationLedger {
            mode,
            ..Default::default()
        }
    }

    /// Rebuild from an ordered log.
    pub fn replay<'a, I>(mode: AccountingMode, log: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut ledger = OrganizationLedger::new(mode);
        for tx in log {
            ledger.apply(tx.clone())?;
        }
        Ok(ledger)
    }

    pub fn mode(&self) -> AccountingMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Validate and append. On error nothing is modified.
    pub fn apply(&mut self, tx: Transaction) -> Result<ApplyOutcome, LedgerError> {
        if self.positions.contains_key(tx.id()) {
            debug!(id = %tx.id(), "transaction already applied");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let validated = validate_transaction(&tx, &*self, self.mode)?;
        let id = tx.id().clone();

        // Settle every balance first so an overflow leaves the state untouched.
        let mut settled: HashMap<Hash, u64> = HashMap::new();
        if self.mode == AccountingMode::StrictUtxo {
            for outpoint in &validated.consumed {
                if let Some(record) = self.outputs.get(outpoint) {
                    let balance = settled
                        .entry(record.owner.clone())
                        .or_insert_with(|| self.balance(&record.owner));
                    *balance = balance.saturating_sub(record.value);
                }
            }
        }
        for output in tx.outputs() {
            let balance = settled
                .entry(output.owner().clone())
                .or_insert_with(|| self.balance(output.owner()));
            *balance = balance
                .checked_add(output.value)
                .ok_or(LedgerError::ValueOverflow)?;
        }

        if self.mode == AccountingMode::StrictUtxo {
            for outpoint in &validated.consumed {
                if let Some(record) = self.outputs.get_mut(outpoint) {
                    record.spent = true;
                }
            }
        }
        self.balances.extend(settled);

        for (index, output) in tx.outputs().iter().enumerate() {
            let owner = output.owner().clone();
            let ids = self.by_owner.entry(owner.clone()).or_default();
            if ids.last() != Some(&id) {
                ids.push(id.clone());
            }

            self.outputs.insert(
                OutPoint::new(id.clone(), index as i64),
                OutputRecord {
                    owner,
                    value: output.value,
                    spent: false,
                },
            );
        }

        debug!(
            id = %id,
            inputs = tx.inputs().len(),
            outputs = tx.outputs().len(),
            input_value = validated.input_value,
            coinbase = tx.is_coinbase(),
            "transaction applied"
        );
        self.positions.insert(id, self.log.len());
        self.log.push(tx);
        Ok(ApplyOutcome::Applied)
    }

    pub fn balance(&self, owner: &Hash) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn transactions_by_owner(&self, owner: &Hash) -> Vec<&Transaction> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.transaction(id)).collect())
            .unwrap_or_default()
    }

    pub fn transaction(&self, id: &Hash) -> Option<&Transaction> {
        self.positions.get(id).map(|&pos| &self.log[pos])
    }

    pub fn log(&self) -> &[Transaction] {
        &self.log
    }

    /// Outputs `owner` may put into a spend, in log order.
    ///
    /// Under [`AccountingMode::RunningCredit`] that is every output ever paid
    /// to the owner, matching the credit-only balance.
    pub fn spendable_outputs(&self, owner: &Hash) -> Vec<SpendableOutput> {
        let mut spendable = Vec::new();
        for tx in self.transactions_by_owner(owner) {
            for (index, output) in tx.outputs().iter().enumerate() {
                if output.owner() != owner {
                    continue;
                }
                let outpoint = OutPoint::new(tx.id().clone(), index as i64);
                let spent = self.outputs.get(&outpoint).map(|r| r.spent).unwrap_or(false);
                if self.mode == AccountingMode::StrictUtxo && spent {
                    continue;
                }
                spendable.push(SpendableOutput {
                    outpoint,
                    owner: owner.clone(),
                    value: output.value,
                });
            }
        }
        spendable
    }

    pub fn index_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            balances: self.balances.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            by_owner: self.by_owner.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// All organizations known to this process.
///
/// Each organization's state sits behind its own mutex, so applies for
/// different organizations never contend.
#[derive(Debug, Default)]
pub struct Ledger {
    mode: AccountingMode,
    organizations: DashMap<OrganizationId, Arc<Mutex<OrganizationLedger>>>,
}

impl Ledger {
    pub fn new(mode: AccountingMode) -> Self {
        Ledger {
            mode,
            organizations: DashMap::new(),
        }
    }

    pub fn mode(&self) -> AccountingMode {
        self.mode
    }

    fn organization(
        &self,
        organization: &OrganizationId,
    ) -> Option<Arc<Mutex<OrganizationLedger>>> {
        self.organizations.get(organization).map(|e| Arc::clone(e.value()))
    }

    /// Validate `tx` against `organization`'s log and append it.
    ///
    /// The organization is created on its first accepted transaction and is
    /// never visible before that.
    pub fn apply(
        &self,
        organization: &OrganizationId,
        tx: Transaction,
    ) -> Result<ApplyOutcome, LedgerError> {
        let slot = match self.organizations.entry(organization.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                // The shard stays locked until the first transaction is
                // accepted, so a rejected one never publishes the organization.
                let mut state = OrganizationLedger::new(self.mode);
                let outcome = state.apply(tx)?;
                entry.insert(Arc::new(Mutex::new(state)));
                return Ok(outcome);
            }
        };

        let outcome = slot.lock().apply(tx);
        outcome
    }

    pub fn balance(&self, organization: &OrganizationId, owner: &Hash) -> u64 {
        self.organization(organization)
            .map(|org| org.lock().balance(owner))
            .unwrap_or(0)
    }

    pub fn transactions_by_owner(
        &self,
        organization: &OrganizationId,
        owner: &Hash,
    ) -> Vec<Transaction> {
        self.organization(organization)
            .map(|org| org.lock().transactions_by_owner(owner).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn transaction(&self, organization: &OrganizationId, id: &Hash) -> Option<Transaction> {
        self.organization(organization)
            .and_then(|org| org.lock().transaction(id).cloned())
    }

    pub fn log(&self, organization: &OrganizationId) -> Vec<Transaction> {
        self.organization(organization)
            .map(|org| org.lock().log().to_vec())
            .unwrap_or_default()
    }

    pub fn spendable_outputs(
        &self,
        organization: &OrganizationId,
        owner: &Hash,
    ) -> Vec<SpendableOutput> {
        self.organization(organization)
            .map(|org| org.lock().spendable_outputs(owner))
            .unwrap_or_default()
    }

    pub fn index_snapshot(&self, organization: &OrganizationId) -> IndexSnapshot {
        self.organization(organization)
            .map(|org| org.lock().index_snapshot())
            .unwrap_or_default()
    }

    /// Replay `organization`'s log from empty state and compare the result
    /// with the incrementally maintained indices.
    pub fn verify_indices(&self, organization: &OrganizationId) -> Result<bool, LedgerError> {
        let Some(org) = self.organization(organization) else {
            return Ok(true);
        };
        let org = org.lock();
        let rebuilt = OrganizationLedger::replay(org.mode(), org.log())?;
        Ok(rebuilt.index_snapshot() == org.index_snapshot())
    }

    pub fn organizations(&self) -> Vec<OrganizationId> {
        let mut ids: Vec<_> = self.organizations.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
