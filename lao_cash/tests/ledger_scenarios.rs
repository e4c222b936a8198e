// tests/ledger_scenarios.rs
use lao_cash::builder::{build_issuance, build_spend};
use lao_cash::encoding::{body_signing_payload, signing_fields};
use lao_cash::transaction::{ScriptType, UnlockingScript};
use lao_cash::{
    AccountingMode, ApplyOutcome, Hash, IssuanceGrant, KeyPair, Ledger, LedgerError,
    OrganizationId, OrganizationLedger, OrganizerRegistry, OutPoint, Transaction, TransactionBody,
    TxIn, TxOut, TxSigner, PROTOCOL_VERSION,
};

struct Fixture {
    ledger: Ledger,
    lao: OrganizationId,
    grant: IssuanceGrant,
    alice: KeyPair,
    bob: KeyPair,
}

fn fixture(mode: AccountingMode) -> Fixture {
    let organizer = KeyPair::from_secret_bytes([7u8; 32]);
    let lao = OrganizationId::new("L1");
    let registry = OrganizerRegistry::new();
    registry.register(lao.clone(), organizer.public_key());
    let grant = IssuanceGrant::request(&registry, &lao, &organizer.public_key()).unwrap();
    Fixture {
        ledger: Ledger::new(mode),
        lao,
        grant,
        alice: KeyPair::from_secret_bytes([1u8; 32]),
        bob: KeyPair::from_secret_bytes([2u8; 32]),
    }
}

fn h(keys: &KeyPair) -> Hash {
    keys.public_key().hash()
}

impl Fixture {
    fn issue(&self, to: &KeyPair, amount: i64) -> Transaction {
        let tx = build_issuance(&self.grant, &[h(to)], amount).unwrap();
        assert_eq!(self.ledger.apply(&self.lao, tx.clone()).unwrap(), ApplyOutcome::Applied);
        tx
    }

    fn spend(&self, from: &KeyPair, to: &KeyPair, amount: i64) -> Result<Transaction, LedgerError> {
        let available = self.ledger.spendable_outputs(&self.lao, &h(from));
        build_spend(from, &h(to), amount, &available)
    }
}

#[test]
fn running_credit_scenario_matches_the_documented_model() {
    let f = fixture(AccountingMode::RunningCredit);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), 0);

    f.issue(&f.alice, 100);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), 100);

    let tx = f.spend(&f.alice, &f.bob, 30).unwrap();
    assert_eq!(f.ledger.apply(&f.lao, tx).unwrap(), ApplyOutcome::Applied);

    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 30);
    // The initial 100 credit is never debited; the 70 change is added on top.
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), 170);
}

#[test]
fn strict_utxo_scenario_debits_the_spender() {
    let f = fixture(AccountingMode::StrictUtxo);
    f.issue(&f.alice, 100);

    let tx = f.spend(&f.alice, &f.bob, 30).unwrap();
    f.ledger.apply(&f.lao, tx).unwrap();

    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 30);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), 70);
    let spendable = f.ledger.spendable_outputs(&f.lao, &h(&f.alice));
    assert_eq!(spendable.len(), 1);
    assert_eq!(spendable[0].value, 70);
}

#[test]
fn strict_utxo_rejects_double_spend() {
    let f = fixture(AccountingMode::StrictUtxo);
    let coinbase = f.issue(&f.alice, 100);
    let stale = vec![lao_cash::SpendableOutput {
        outpoint: OutPoint::new(coinbase.id().clone(), 0),
        owner: h(&f.alice),
        value: 100,
    }];

    let first = build_spend(&f.alice, &h(&f.bob), 10, &stale).unwrap();
    f.ledger.apply(&f.lao, first).unwrap();

    let second = build_spend(&f.alice, &h(&f.bob), 20, &stale).unwrap();
    assert!(matches!(
        f.ledger.apply(&f.lao, second),
        Err(LedgerError::OutputAlreadySpent { .. })
    ));
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 10);
}

#[test]
fn running_credit_accepts_the_same_respend() {
    let f = fixture(AccountingMode::RunningCredit);
    let coinbase = f.issue(&f.alice, 100);
    let stale = vec![lao_cash::SpendableOutput {
        outpoint: OutPoint::new(coinbase.id().clone(), 0),
        owner: h(&f.alice),
        value: 100,
    }];
    f.ledger
        .apply(&f.lao, build_spend(&f.alice, &h(&f.bob), 10, &stale).unwrap())
        .unwrap();
    f.ledger
        .apply(&f.lao, build_spend(&f.alice, &h(&f.bob), 20, &stale).unwrap())
        .unwrap();
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 30);
}

#[test]
fn strict_utxo_rejects_outputs_exceeding_inputs() {
    let f = fixture(AccountingMode::StrictUtxo);
    let coinbase = f.issue(&f.alice, 10);
    let inflated = vec![lao_cash::SpendableOutput {
        outpoint: OutPoint::new(coinbase.id().clone(), 0),
        owner: h(&f.alice),
        value: 1_000,
    }];
    let tx = build_spend(&f.alice, &h(&f.bob), 500, &inflated).unwrap();
    assert_eq!(
        f.ledger.apply(&f.lao, tx),
        Err(LedgerError::UnbalancedTransaction {
            inputs: 10,
            outputs: 1_000
        })
    );
}

#[test]
fn exact_spend_has_no_change_output() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 40);
    let tx = f.spend(&f.alice, &f.bob, 40).unwrap();
    assert_eq!(tx.outputs().len(), 1);
    assert_eq!(tx.outputs()[0].value, 40);
}

#[test]
fn partial_spend_returns_change_to_the_signer() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 25);
    f.issue(&f.alice, 15);
    let tx = f.spend(&f.alice, &f.bob, 12).unwrap();

    assert_eq!(tx.inputs().len(), 2);
    assert_eq!(tx.outputs().len(), 2);
    assert_eq!(tx.outputs()[0].owner(), &h(&f.bob));
    assert_eq!(tx.outputs()[1].owner(), &h(&f.alice));
    assert_eq!(tx.outputs().iter().map(|o| o.value).sum::<u64>(), 40);
}

#[test]
fn overspend_fails_without_side_effects() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 10);
    let before = f.ledger.index_snapshot(&f.lao);

    assert_eq!(
        f.spend(&f.alice, &f.bob, 11).unwrap_err(),
        LedgerError::InsufficientFunds {
            requested: 11,
            available: 10
        }
    );
    assert_eq!(
        f.spend(&f.alice, &f.bob, -1).unwrap_err(),
        LedgerError::InvalidAmount("-1 is negative".into())
    );
    assert_eq!(f.ledger.index_snapshot(&f.lao), before);
    assert_eq!(f.ledger.log(&f.lao).len(), 1);
}

#[test]
fn unknown_outpoint_is_rejected_and_state_unchanged() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 10);
    let before = f.ledger.index_snapshot(&f.lao);

    let ghost = vec![lao_cash::SpendableOutput {
        outpoint: OutPoint::new(Hash::from_fields(["ghost"]), 0),
        owner: h(&f.alice),
        value: 10,
    }];
    let tx = build_spend(&f.alice, &h(&f.bob), 5, &ghost).unwrap();
    assert!(matches!(f.ledger.apply(&f.lao, tx), Err(LedgerError::UnknownOutput { .. })));

    let coinbase_id = f.ledger.log(&f.lao)[0].id().clone();
    let out_of_range = vec![lao_cash::SpendableOutput {
        outpoint: OutPoint::new(coinbase_id, 3),
        owner: h(&f.alice),
        value: 10,
    }];
    let tx = build_spend(&f.alice, &h(&f.bob), 5, &out_of_range).unwrap();
    assert!(matches!(f.ledger.apply(&f.lao, tx), Err(LedgerError::UnknownOutput { .. })));

    assert_eq!(f.ledger.index_snapshot(&f.lao), before);
    assert_eq!(f.ledger.log(&f.lao).len(), 1);
}

#[test]
fn spending_someone_elses_output_is_rejected() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 50);
    let mallory = KeyPair::from_secret_bytes([3u8; 32]);

    // Mallory signs with her own key: the key hash does not match the lock.
    let mut victims = f.ledger.spendable_outputs(&f.lao, &h(&f.alice));
    for o in &mut victims {
        o.owner = h(&mallory);
    }
    let stolen = build_spend(&mallory, &h(&mallory), 50, &victims).unwrap();
    assert!(matches!(
        f.ledger.apply(&f.lao, stolen.clone()),
        Err(LedgerError::OwnershipMismatch { .. })
    ));

    // Mallory claims Alice's key but can only sign with her own.
    let mut body = stolen.into_body();
    let payload = body_signing_payload(&body);
    for input in &mut body.inputs {
        input.script = Some(UnlockingScript {
            script_type: ScriptType::P2pkh,
            pubkey: f.alice.public_key(),
            sig: mallory.sign(&payload),
        });
    }
    let forged = Transaction::new(body);
    assert_eq!(
        f.ledger.apply(&f.lao, forged),
        Err(LedgerError::SignatureInvalid { input: 0 })
    );
    assert_eq!(f.ledger.balance(&f.lao, &h(&mallory)), 0);
}

#[test]
fn replay_reproduces_incremental_indices() {
    for mode in [AccountingMode::RunningCredit, AccountingMode::StrictUtxo] {
        let f = fixture(mode);
        let carol = KeyPair::from_secret_bytes([4u8; 32]);
        f.issue(&f.alice, 100);
        f.issue(&f.bob, 20);
        f.ledger.apply(&f.lao, f.spend(&f.alice, &f.bob, 30).unwrap()).unwrap();
        f.ledger.apply(&f.lao, f.spend(&f.bob, &carol, 45).unwrap()).unwrap();
        f.ledger.apply(&f.lao, f.spend(&carol, &f.alice, 45).unwrap()).unwrap();

        let log = f.ledger.log(&f.lao);
        let rebuilt = OrganizationLedger::replay(mode, &log).unwrap();
        assert_eq!(rebuilt.index_snapshot(), f.ledger.index_snapshot(&f.lao), "{mode:?}");
        assert!(f.ledger.verify_indices(&f.lao).unwrap());
    }
}

#[test]
fn history_by_owner_is_in_log_order() {
    let f = fixture(AccountingMode::RunningCredit);
    let first = f.issue(&f.alice, 5);
    let second = f.issue(&f.alice, 6);
    let pay = f.spend(&f.alice, &f.bob, 11).unwrap();
    f.ledger.apply(&f.lao, pay.clone()).unwrap();

    let ids: Vec<Hash> = f
        .ledger
        .transactions_by_owner(&f.lao, &h(&f.alice))
        .iter()
        .map(|t| t.id().clone())
        .collect();
    assert_eq!(ids, vec![first.id().clone(), second.id().clone()]);
    assert_eq!(f.ledger.transactions_by_owner(&f.lao, &h(&f.bob)), vec![pay.clone()]);
    assert_eq!(f.ledger.transaction(&f.lao, pay.id()), Some(pay));
}

#[test]
fn multi_beneficiary_issuance() {
    let f = fixture(AccountingMode::RunningCredit);
    let tx = build_issuance(&f.grant, &[h(&f.alice), h(&f.bob)], 25).unwrap();
    assert_eq!(tx.inputs().len(), 1);
    assert!(tx.inputs()[0].script.is_none());
    assert_eq!(tx.outputs().len(), 2);
    f.ledger.apply(&f.lao, tx).unwrap();
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), 25);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 25);

    assert_eq!(build_issuance(&f.grant, &[], 5).unwrap_err(), LedgerError::NoBeneficiaries);
    assert!(matches!(
        build_issuance(&f.grant, &[h(&f.alice)], -5),
        Err(LedgerError::InvalidAmount(_))
    ));
}

#[test]
fn signing_hash_and_id_differ_for_spends() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 9);
    let tx = f.spend(&f.alice, &f.bob, 4).unwrap();
    let signed = Hash::from_fields(signing_fields(
        tx.inputs().iter().map(|i| &i.outpoint),
        tx.outputs(),
    ));
    assert_ne!(&signed, tx.id());
    assert_eq!(Transaction::new(tx.body().clone()).id(), tx.id());
}

fn minted(outputs: Vec<TxOut>) -> Transaction {
    Transaction::new(TransactionBody {
        version: PROTOCOL_VERSION,
        inputs: vec![TxIn::coinbase()],
        outputs,
        lock_time: 0,
    })
}

const HALF: u64 = 1 << 63;

#[test]
fn balance_overflow_is_rejected_without_side_effects() {
    for mode in [AccountingMode::RunningCredit, AccountingMode::StrictUtxo] {
        let f = fixture(mode);
        f.ledger
            .apply(&f.lao, minted(vec![TxOut::pay_to(h(&f.alice), HALF)]))
            .unwrap();
        let before = f.ledger.index_snapshot(&f.lao);

        let overflowing = minted(vec![
            TxOut::pay_to(h(&f.bob), 5),
            TxOut::pay_to(h(&f.alice), HALF + 1),
        ]);
        assert_eq!(
            f.ledger.apply(&f.lao, overflowing),
            Err(LedgerError::ValueOverflow),
            "{mode:?}"
        );
        assert_eq!(f.ledger.index_snapshot(&f.lao), before);
        assert_eq!(f.ledger.log(&f.lao).len(), 1);
        assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 0);
        assert!(f.ledger.verify_indices(&f.lao).unwrap());
    }
}

#[test]
fn running_credit_change_cannot_wrap_the_balance() {
    let f = fixture(AccountingMode::RunningCredit);
    f.issue(&f.alice, 1 << 62);

    let first = f.spend(&f.alice, &f.bob, 0).unwrap();
    f.ledger.apply(&f.lao, first).unwrap();
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), HALF);
    let before = f.ledger.index_snapshot(&f.lao);

    let second = f.spend(&f.alice, &f.bob, 0).unwrap();
    assert_eq!(f.ledger.apply(&f.lao, second), Err(LedgerError::ValueOverflow));
    assert_eq!(f.ledger.index_snapshot(&f.lao), before);
    assert_eq!(f.ledger.log(&f.lao).len(), 2);
}

#[test]
fn strict_overflow_leaves_consumed_outputs_unspent() {
    let f = fixture(AccountingMode::StrictUtxo);
    f.ledger
        .apply(&f.lao, minted(vec![TxOut::pay_to(h(&f.alice), HALF)]))
        .unwrap();
    f.ledger
        .apply(&f.lao, minted(vec![TxOut::pay_to(h(&f.bob), HALF + 1)]))
        .unwrap();
    let before = f.ledger.index_snapshot(&f.lao);

    let tx = f.spend(&f.alice, &f.bob, i64::MAX).unwrap();
    assert_eq!(f.ledger.apply(&f.lao, tx), Err(LedgerError::ValueOverflow));

    assert_eq!(f.ledger.index_snapshot(&f.lao), before);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.alice)), HALF);
    assert_eq!(f.ledger.spendable_outputs(&f.lao, &h(&f.alice)).len(), 1);
}

#[test]
fn unpadded_owner_hash_is_the_same_owner() {
    let f = fixture(AccountingMode::StrictUtxo);
    let padded = h(&f.alice);
    let unpadded = Hash::new(padded.as_str().trim_end_matches('=')).unwrap();
    assert_ne!(padded.as_str(), unpadded.as_str());

    let tx = build_issuance(&f.grant, &[unpadded.clone()], 100).unwrap();
    f.ledger.apply(&f.lao, tx).unwrap();
    assert_eq!(f.ledger.balance(&f.lao, &padded), 100);
    assert_eq!(f.ledger.balance(&f.lao, &unpadded), 100);

    let pay = f.spend(&f.alice, &f.bob, 40).unwrap();
    assert_eq!(f.ledger.apply(&f.lao, pay).unwrap(), ApplyOutcome::Applied);
    assert_eq!(f.ledger.balance(&f.lao, &padded), 60);
    assert_eq!(f.ledger.balance(&f.lao, &h(&f.bob)), 40);
}
