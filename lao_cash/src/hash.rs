// src/hash.rs
// Content addresses: SHA-256 over length-prefixed fields, base64url encoded.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

use crate::error::LedgerError;

/// Padded base64url on encode; padding is optional on decode.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bytes of the SHA-256 digest kept for a public-key-hash.
pub const PUBLIC_KEY_HASH_LEN: usize = 20;

/// A base64url content address.
///
/// The wire spelling is kept verbatim, since ids hash it, but equality,
/// ordering and hashing use the canonical padded form of the decoded bytes:
/// `abc` and `abc=` name the same thing.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash {
    encoded: String,
    canonical: String,
}

impl Hash {
    /// Wrap an already encoded hash, rejecting anything that is not base64url.
    pub fn new(encoded: impl Into<String>) -> Result<Self, LedgerError> {
        let encoded = encoded.into();
        if encoded.is_empty() {
            return Err(LedgerError::MalformedMessage("empty hash".into()));
        }
        let bytes = BASE64URL.decode(encoded.as_bytes()).map_err(|e| {
            LedgerError::MalformedMessage(format!("hash {encoded:?} is not base64url: {e}"))
        })?;
        let canonical = BASE64URL.encode(bytes);
        Ok(Hash { encoded, canonical })
    }

    /// For constants that are valid and canonical by construction.
    pub(crate) fn from_static(encoded: &'static str) -> Self {
        Self::canonical(encoded.to_string())
    }

    fn canonical(encoded: String) -> Self {
        Hash {
            canonical: encoded.clone(),
            encoded,
        }
    }

    /// Hash an ordered sequence of fields.
    ///
    /// Each field is fed to SHA-256 as its decimal UTF-8 byte length followed
    /// by its bytes, so moving a boundary between two fields changes the digest.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for field in fields {
            let field = field.as_ref();
            hasher.update(field.len().to_string().as_bytes());
            hasher.update(field.as_bytes());
        }
        Self::canonical(BASE64URL.encode(hasher.finalize()))
    }

    /// Owner identity used in locking scripts.
    pub fn of_public_key(key_bytes: &[u8]) -> Self {
        let digest = Sha256::digest(key_bytes);
        Self::canonical(BASE64URL.encode(&digest[..PUBLIC_KEY_HASH_LEN]))
    }

    /// The spelling this hash arrived with.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Validated at construction.
        BASE64URL.decode(self.canonical.as_bytes()).unwrap_or_default()
    }
}

impl PartialEq for Hash {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Hash {}

impl std::hash::Hash for Hash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.canonical, state);
    }
}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.encoded)
    }
}

impl TryFrom<String> for Hash {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Hash::new(value)
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.encoded
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
