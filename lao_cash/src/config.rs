// src/config.rs
// Environment-driven configuration with a startup validation summary.

use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::validation::AccountingMode;

pub const ENV_ACCOUNTING: &str = "LAO_CASH_ACCOUNTING";
pub const ENV_STATE_PATH: &str = "LAO_CASH_STATE_PATH";
pub const ENV_OUTBOUND_CAPACITY: &str = "LAO_CASH_OUTBOUND_CAPACITY";

const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Validation result for configuration checks
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    fn new() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.valid = false;
    }

    pub fn log_summary(&self) {
        for w in &self.warnings {
            warn!("config: {}", w);
        }
        for e in &self.errors {
            error!("config: {}", e);
        }
        if self.valid && self.warnings.is_empty() {
            info!("configuration validation passed");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub accounting: AccountingMode,
    pub state_path: Option<PathBuf>,
    pub outbound_capacity: usize,
    raw_accounting: Option<String>,
    raw_capacity: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            accounting: AccountingMode::default(),
            state_path: None,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            raw_accounting: None,
            raw_capacity: None,
        }
    }
}

impl LedgerConfig {
    /// Read the process environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults and
    /// are reported by [`LedgerConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_accounting = lookup(ENV_ACCOUNTING).filter(|v| !v.trim().is_empty());
        let raw_capacity = lookup(ENV_OUTBOUND_CAPACITY).filter(|v| !v.trim().is_empty());

        let accounting = raw_accounting
            .as_deref()
            .and_then(parse_accounting)
            .unwrap_or_default();
        let outbound_capacity = raw_capacity
            .as_deref()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_OUTBOUND_CAPACITY);
        let state_path = lookup(ENV_STATE_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        LedgerConfig {
            accounting,
            state_path,
            outbound_capacity,
            raw_accounting,
            raw_capacity,
        }
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        match self.raw_accounting.as_deref() {
            Some(raw) if parse_accounting(raw).is_none() => validation.add_error(format!(
                "{ENV_ACCOUNTING}={raw:?} is not one of running-credit, strict-utxo"
            )),
            None => validation.add_warning(format!(
                "{ENV_ACCOUNTING} not set - using running-credit (spent outputs are never debited)"
            )),
            _ => {}
        }

        if let Some(raw) = self.raw_capacity.as_deref() {
            if raw.trim().parse::<usize>().ok().filter(|&n| n > 0).is_none() {
                validation.add_error(format!(
                    "{ENV_OUTBOUND_CAPACITY}={raw:?} must be a positive integer"
                ));
            }
        }

        match &self.state_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !parent.exists() {
                        validation.add_error(format!(
                            "{ENV_STATE_PATH} directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            }
            None => validation.add_warning(format!(
                "{ENV_STATE_PATH} not set - ledger state lives in memory only"
            )),
        }

        validation
    }
}

fn parse_accounting(raw: &str) -> Option<AccountingMode> {
    match raw.trim().to_lowercase().as_str() {
        "running-credit" | "credit" | "compat" => Some(AccountingMode::RunningCredit),
        "strict-utxo" | "strict" | "utxo" => Some(AccountingMode::StrictUtxo),
        _ => None,
    }
}
