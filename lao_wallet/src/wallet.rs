use anyhow::{anyhow, Context, Result};
use lao_cash::snapshot::write_atomic;
use lao_cash::{Hash, KeyPair, PublicKey, TxSigner};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const KEY_FILE: &str = "key.json";
const STATE_FILE: &str = "state.json";
const DEFAULT_DIR: &str = ".lao_wallet";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub public_key: PublicKey,
    /// Public-key hash: what other members pay to.
    pub address: Hash,
    secret_key: String,
    pub created_at: String,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_keys(&KeyPair::generate())
    }

    /// Import from a base64url-encoded 32-byte Ed25519 secret
    pub fn from_secret(secret: &str) -> Result<Self> {
        let keys = KeyPair::from_secret_base64(secret.trim())
            .map_err(|e| anyhow!("Invalid secret key: {}", e))?;
        Ok(Self::from_keys(&keys))
    }

    fn from_keys(keys: &KeyPair) -> Self {
        let public_key = keys.public_key();
        Wallet {
            public_key,
            address: public_key.hash(),
            secret_key: keys.secret_base64(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn keys(&self) -> Result<KeyPair> {
        let keys = KeyPair::from_secret_base64(&self.secret_key)
            .map_err(|e| anyhow!("Corrupt key file: {}", e))?;
        if keys.public_key() != self.public_key {
            return Err(anyhow!("Key file public key does not match its secret"));
        }
        Ok(keys)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let path = key_path(dir);
        write_atomic(&path, &json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = key_path(dir);
        if !path.exists() {
            return Err(anyhow!(
                "No wallet found in {}. Create one with 'lao-wallet keygen'",
                dir.display()
            ));
        }
        let json = fs::read_to_string(&path)?;
        let wallet: Wallet = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(wallet)
    }

    pub fn exists(dir: &Path) -> bool {
        key_path(dir).exists()
    }
}

pub fn key_path(dir: &Path) -> PathBuf {
    dir.join(KEY_FILE)
}

pub fn default_state_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE)
}

/// `~/.lao_wallet`, or the working directory when there is no home.
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR))
}
