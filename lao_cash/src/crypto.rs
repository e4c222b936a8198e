// src/crypto.rs
use base64::Engine as _;
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;
use crate::hash::{Hash, BASE64URL};

/// Ed25519 public key, base64url on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_base64(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = BASE64URL
            .decode(encoded.as_bytes())
            .map_err(|e| {
                LedgerError::MalformedMessage(format!("public key is not base64url: {e}"))
            })?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::MalformedMessage("public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&bytes)
            .map(PublicKey)
            .map_err(|e| LedgerError::MalformedMessage(format!("invalid public key: {e}")))
    }

    pub fn to_base64(&self) -> String {
        BASE64URL.encode(self.0.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// The owner identity this key unlocks.
    pub fn hash(&self) -> Hash {
        Hash::of_public_key(self.0.as_bytes())
    }

    /// Strict Ed25519 verification of `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.0.verify_strict(message, &signature.0).is_ok()
    }
}

impl TryFrom<String> for PublicKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PublicKey::from_base64(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_base64()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn from_base64(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = BASE64URL
            .decode(encoded.as_bytes())
            .map_err(|e| {
                LedgerError::MalformedMessage(format!("signature is not base64url: {e}"))
            })?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| LedgerError::MalformedMessage("signature must be 64 bytes".into()))?;
        Ok(Signature(ed25519_dalek::Signature::from_bytes(&bytes)))
    }

    pub fn to_base64(&self) -> String {
        BASE64URL.encode(self.0.to_bytes())
    }
}

impl TryFrom<String> for Signature {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Signature::from_base64(&value)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_base64()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base64())
    }
}

/// Signing capability handed to the transaction builder.
///
/// Key storage and per-roll-call derivation live outside this crate; anything
/// that can name its public key and sign a payload can spend.
pub trait TxSigner {
    fn public_key(&self) -> PublicKey;
    fn sign(&self, payload: &[u8]) -> Signature;
}

pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        KeyPair {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        KeyPair {
            signing: SigningKey::from_bytes(&secret),
        }
    }

    pub fn from_secret_base64(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = BASE64URL
            .decode(encoded.as_bytes())
            .map_err(|e| {
                LedgerError::MalformedMessage(format!("secret key is not base64url: {e}"))
            })?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::MalformedMessage("secret key must be 32 bytes".into()))?;
        Ok(KeyPair::from_secret_bytes(secret))
    }

    pub fn secret_base64(&self) -> String {
        BASE64URL.encode(self.signing.to_bytes())
    }
}

impl TxSigner for KeyPair {
    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    fn sign(&self, payload: &[u8]) -> Signature {
        Signature(self.signing.sign(payload))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
