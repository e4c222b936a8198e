// src/encoding.rs
// Canonical field order for transaction ids and signing payloads.

use crate::hash::Hash;
use crate::transaction::{OutPoint, TransactionBody, TxOut};

/// Ordered fields hashed into a transaction id.
///
/// `lock_time`, then every input (`pubkey, sig, type, tx_out_hash,
/// tx_out_index` when it carries a script, `tx_out_hash, tx_out_index` for
/// coinbase), then every output (`pubkey_hash, type, value`), then `version`.
pub fn id_fields(body: &TransactionBody) -> Vec<String> {
    let mut fields = Vec::with_capacity(2 + body.inputs.len() * 5 + body.outputs.len() * 3);
    fields.push(body.lock_time.to_string());

    for input in &body.inputs {
        if let Some(script) = &input.script {
            fields.push(script.pubkey.to_base64());
            fields.push(script.sig.to_base64());
            fields.push(script.script_type.as_str().to_string());
        }
        fields.push(input.outpoint.tx_out_hash.as_str().to_string());
        fields.push(input.outpoint.tx_out_index.to_string());
    }

    for output in &body.outputs {
        fields.push(output.script.pubkey_hash.as_str().to_string());
        fields.push(output.script.script_type.as_str().to_string());
        fields.push(output.value.to_string());
    }

    fields.push(body.version.to_string());
    fields
}

pub fn transaction_id(body: &TransactionBody) -> Hash {
    Hash::from_fields(id_fields(body))
}

/// Ordered fields covered by an input signature: outpoints, then outputs as
/// `value, type, pubkey_hash`. Scripts and signatures are never included.
pub fn signing_fields<'a, I>(outpoints: I, outputs: &[TxOut]) -> Vec<String>
where
    I: IntoIterator<Item = &'a OutPoint>,
{
    let mut fields = Vec::new();
    for outpoint in outpoints {
        fields.push(outpoint.tx_out_hash.as_str().to_string());
        fields.push(outpoint.tx_out_index.to_string());
    }
    for output in outputs {
        fields.push(output.value.to_string());
        fields.push(output.script.script_type.as_str().to_string());
        fields.push(output.script.pubkey_hash.as_str().to_string());
    }
    fields
}

/// Bytes actually signed: the signing fields concatenated as UTF-8.
pub fn signing_payload<'a, I>(outpoints: I, outputs: &[TxOut]) -> Vec<u8>
where
    I: IntoIterator<Item = &'a OutPoint>,
{
    signing_fields(outpoints, outputs).concat().into_bytes()
}

/// Signing payload of an assembled transaction.
pub fn body_signing_payload(body: &TransactionBody) -> Vec<u8> {
    signing_payload(body.inputs.iter().map(|i| &i.outpoint), &body.outputs)
}
