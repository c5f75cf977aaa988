//! # Ledger Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`KIRANA_*`)
//! 2. Config file (`kirana.toml`, platform config dir or an explicit path)
//! 3. Defaults (this file)
//!
//! ```toml
//! [database]
//! path = "/var/lib/kirana/kirana.db"
//! max_connections = 5
//! acquire_timeout_secs = 5
//!
//! [locking]
//! lock_timeout_ms = 2000
//!
//! [invoicing]
//! prefix = "INV"
//! fiscal_year_start_month = 4
//! seller_state_code = "27"
//!
//! [stock]
//! default_reorder_threshold = 5
//! expiry_warning_days = 30
//! ```
//!
//! Read-only after startup.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use kirana_core::fiscal::DEFAULT_FISCAL_START_MONTH;
use kirana_core::validation::validate_state_code;
use kirana_core::DEFAULT_REORDER_THRESHOLD;
use kirana_db::DbConfig;

const CONFIG_FILE_NAME: &str = "kirana.toml";
const DB_FILE_NAME: &str = "kirana.db";

/// Complete ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    pub database: DatabaseSection,
    pub locking: LockingSection,
    pub invoicing: InvoicingSection,
    pub stock: StockSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file. `None` uses the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    /// Bound on waiting for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingSection {
    /// Longest a posting waits for its product locks.
    pub lock_timeout_ms: u64,
}

impl Default for LockingSection {
    fn default() -> Self {
        LockingSection {
            lock_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicingSection {
    /// Printed before the fiscal year in display numbers.
    pub prefix: String,
    /// 1-12; April for the Indian fiscal year.
    pub fiscal_year_start_month: u32,
    /// Two-digit GST state code of the seller.
    pub seller_state_code: String,
}

impl Default for InvoicingSection {
    fn default() -> Self {
        InvoicingSection {
            prefix: "INV".to_string(),
            fiscal_year_start_month: DEFAULT_FISCAL_START_MONTH,
            seller_state_code: "27".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSection {
    /// Threshold for products created without one.
    pub default_reorder_threshold: i64,
    /// Window used by the expiry report when the caller gives none.
    pub expiry_warning_days: u32,
}

impl Default for StockSection {
    fn default() -> Self {
        StockSection {
            default_reorder_threshold: DEFAULT_REORDER_THRESHOLD,
            expiry_warning_days: 30,
        }
    }
}

impl LedgerConfig {
    /// Loads `kirana.toml` from the platform config directory (if present),
    /// then applies environment overrides.
    pub fn load() -> LedgerResult<Self> {
        let path = project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));
        match path {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Self::from_parts(None, |key| std::env::var(key).ok())
            }
        }
    }

    /// Loads an explicit config file, then applies environment overrides.
    pub fn load_from(path: &Path) -> LedgerResult<Self> {
        info!(path = %path.display(), "Loading ledger configuration");
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_parts(Some(&text), |key| std::env::var(key).ok())
    }

    /// Parses TOML text without looking at the environment.
    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        Self::from_parts(Some(text), |_| None)
    }

    fn from_parts(text: Option<&str>, env: impl Fn(&str) -> Option<String>) -> LedgerResult<Self> {
        let mut config = match text {
            Some(text) => toml::from_str::<LedgerConfig>(text)
                .map_err(|e| LedgerError::ConfigLoadFailed(e.to_string()))?,
            None => LedgerConfig::default(),
        };
        config.apply_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `KIRANA_*` overrides from `env`.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> LedgerResult<()> {
        if let Some(path) = env("KIRANA_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(ms) = env("KIRANA_LOCK_TIMEOUT_MS") {
            self.locking.lock_timeout_ms = parse_env("KIRANA_LOCK_TIMEOUT_MS", &ms)?;
        }
        if let Some(prefix) = env("KIRANA_INVOICE_PREFIX") {
            self.invoicing.prefix = prefix;
        }
        if let Some(code) = env("KIRANA_SELLER_STATE_CODE") {
            self.invoicing.seller_state_code = code;
        }
        if let Some(days) = env("KIRANA_EXPIRY_WARNING_DAYS") {
            self.stock.expiry_warning_days = parse_env("KIRANA_EXPIRY_WARNING_DAYS", &days)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> LedgerResult<()> {
        let invalid = |msg: String| Err(LedgerError::InvalidConfig(msg));

        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be at least 1".to_string());
        }
        if self.locking.lock_timeout_ms == 0 {
            return invalid("locking.lock_timeout_ms must be positive".to_string());
        }
        if self.invoicing.prefix.trim().is_empty() {
            return invalid("invoicing.prefix must not be empty".to_string());
        }
        if !(1..=12).contains(&self.invoicing.fiscal_year_start_month) {
            return invalid(format!(
                "invoicing.fiscal_year_start_month must be 1-12, got {}",
                self.invoicing.fiscal_year_start_month
            ));
        }
        validate_state_code(&self.invoicing.seller_state_code)
            .map_err(|e| LedgerError::InvalidConfig(format!("invoicing.seller_state_code: {}", e)))?;
        if self.stock.default_reorder_threshold < 0 {
            return invalid("stock.default_reorder_threshold must not be negative".to_string());
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.locking.lock_timeout_ms)
    }

    /// Database file: the configured path, else `kirana.db` in the
    /// platform data directory, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join(DB_FILE_NAME),
            None => PathBuf::from(DB_FILE_NAME),
        }
    }

    /// Store configuration. Creates the parent directory of the database
    /// file if needed.
    pub fn db_config(&self) -> LedgerResult<DbConfig> {
        let path = self.database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::ConfigLoadFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        Ok(DbConfig::new(path)
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.acquire_timeout_secs)))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("in", "kirana", "ledger")
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> LedgerResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LedgerError::InvalidConfig(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.invoicing.fiscal_year_start_month, 4);
        assert_eq!(config.stock.default_reorder_threshold, 5);
        assert_eq!(config.lock_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [invoicing]
            prefix = "KS"
            seller_state_code = "29"

            [stock]
            expiry_warning_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.invoicing.prefix, "KS");
        assert_eq!(config.invoicing.seller_state_code, "29");
        assert_eq!(config.invoicing.fiscal_year_start_month, 4);
        assert_eq!(config.stock.expiry_warning_days, 14);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("KIRANA_DB_PATH", "/tmp/shop.db"),
            ("KIRANA_LOCK_TIMEOUT_MS", "250"),
            ("KIRANA_INVOICE_PREFIX", "BILL"),
        ]
        .into_iter()
        .collect();

        let config = LedgerConfig::from_parts(Some("[invoicing]\nprefix = \"KS\"\n"), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert_eq!(config.invoicing.prefix, "BILL");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let err = LedgerConfig::from_parts(None, |key| {
            (key == "KIRANA_LOCK_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));

        let err = LedgerConfig::from_toml_str("[invoicing]\nseller_state_code = \"77\"\n").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));

        let err = LedgerConfig::from_toml_str("[locking]\nlock_timeout_ms = \"x\"\n").unwrap_err();
        assert!(matches!(err, LedgerError::ConfigLoadFailed(_)));
    }
}
