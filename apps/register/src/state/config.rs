//! # Configuration State
//!
//! Register configuration loaded at startup.
//!
//! ## Sources (later wins)
//! 1. Defaults (this file)
//! 2. `register.toml` in the platform config dir, or an explicit path
//! 3. Environment variables (`DUKA_*`)
//!
//! ```toml
//! shop_id = "shop-42"
//! shop_name = "Mama Njeri Duka"
//! currency_symbol = "KSh"
//! utc_offset_minutes = 180
//! initial_capital = 5000000
//! seller_id = "seller-7"
//! seller_name = "Njeri"
//! ```
//!
//! Read-only after startup.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use duka_core::{Money, Seller};

pub const CONFIG_FILE_NAME: &str = "register.toml";
pub const DATABASE_FILE_NAME: &str = "duka.db";

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Could not determine the platform data directory")]
    NoPlatformDir,
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Register configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigState {
    /// Tenant every query is scoped to.
    pub shop_id: String,

    /// Printed on receipts.
    pub shop_name: String,

    /// ISO 4217
    pub currency_code: String,

    pub currency_symbol: String,

    /// Minor units per major unit, as a power of ten.
    pub currency_decimals: u8,

    /// Offset of the shop's local day from UTC.
    pub utc_offset_minutes: i32,

    /// Capital the shop started with, for growth and ROI.
    pub initial_capital: Money,

    /// Cart slots and the default database live here.
    /// Default: the platform data dir.
    pub data_dir: Option<PathBuf>,

    /// Default: `<data_dir>/duka.db`
    pub database_path: Option<PathBuf>,

    pub seller_id: String,
    pub seller_name: String,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            shop_id: "shop-default".to_string(),
            shop_name: "Duka POS".to_string(),
            currency_code: "KES".to_string(),
            currency_symbol: "KSh".to_string(),
            currency_decimals: 2,
            utc_offset_minutes: 180,
            initial_capital: Money::zero(),
            data_dir: None,
            database_path: None,
            seller_id: "seller-default".to_string(),
            seller_name: "Seller".to_string(),
        }
    }
}

impl ConfigState {
    /// Loads defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_toml_file(&path)?,
                other => {
                    debug!(path = ?other, "No config file, using defaults");
                    ConfigState::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        info!(shop_id = %config.shop_id, seller_id = %config.seller_id, "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Config file read");
        Ok(config)
    }

    /// Overrides fields from `DUKA_*` variables.
    ///
    /// Unparseable numbers are ignored with a warning and the previous value
    /// kept.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let text = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *target = value.trim().to_string();
            }
        };
        text("DUKA_SHOP_ID", &mut self.shop_id);
        text("DUKA_SHOP_NAME", &mut self.shop_name);
        text("DUKA_CURRENCY_CODE", &mut self.currency_code);
        text("DUKA_CURRENCY_SYMBOL", &mut self.currency_symbol);
        text("DUKA_SELLER_ID", &mut self.seller_id);
        text("DUKA_SELLER_NAME", &mut self.seller_name);

        if let Some(decimals) = parse_env(&lookup, "DUKA_CURRENCY_DECIMALS") {
            self.currency_decimals = decimals;
        }
        if let Some(minutes) = parse_env(&lookup, "DUKA_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = minutes;
        }
        if let Some(minor) = parse_env(&lookup, "DUKA_INITIAL_CAPITAL") {
            self.initial_capital = Money::from_minor(minor);
        }
        if let Some(dir) = lookup("DUKA_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("DUKA_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shop_id.trim().is_empty() {
            return Err(ConfigError::invalid("shop_id", "must not be empty"));
        }
        if self.seller_id.trim().is_empty() {
            return Err(ConfigError::invalid("seller_id", "must not be empty"));
        }
        if self.currency_decimals > 4 {
            return Err(ConfigError::invalid("currency_decimals", "must be at most 4"));
        }
        if FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_none() {
            return Err(ConfigError::invalid(
                "utc_offset_minutes",
                "must be within ±24 hours",
            ));
        }
        if self.initial_capital.is_negative() {
            return Err(ConfigError::invalid("initial_capital", "must not be negative"));
        }
        Ok(())
    }

    /// The shop's local-day offset. UTC if out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }

    pub fn seller(&self) -> Seller {
        Seller::new(&self.seller_id, &self.seller_name)
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoPlatformDir)
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.data_dir()?.join(DATABASE_FILE_NAME)),
        }
    }

    /// Formats an amount in minor units, e.g. `KSh 1,234.50`.
    ///
    /// ```rust
    /// # use duka_register::state::ConfigState;
    /// # use duka_core::Money;
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(Money::from_minor(123_450)), "KSh 1,234.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let minor = amount.minor();
        let divisor = 10_i64.pow(u32::from(self.currency_decimals));
        let whole = group_thousands((minor / divisor).unsigned_abs());
        let sign = if minor < 0 { "-" } else { "" };

        if self.currency_decimals == 0 {
            format!("{sign}{} {whole}", self.currency_symbol)
        } else {
            let frac = (minor % divisor).unsigned_abs();
            format!(
                "{sign}{} {whole}.{frac:0width$}",
                self.currency_symbol,
                width = usize::from(self.currency_decimals)
            )
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "duka", "register")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(Money::from_minor(1234)), "KSh 12.34");
        assert_eq!(config.format_currency(Money::from_minor(1)), "KSh 0.01");
        assert_eq!(config.format_currency(Money::zero()), "KSh 0.00");
        assert_eq!(config.format_currency(Money::from_minor(-123_456_789)), "-KSh 1,234,567.89");

        let whole = ConfigState {
            currency_symbol: "UGX".to_string(),
            currency_decimals: 0,
            ..ConfigState::default()
        };
        assert_eq!(whole.format_currency(Money::from_minor(15_000)), "UGX 15,000");
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "shop_id = \"shop-42\"\nshop_name = \"Mama Njeri\"\nutc_offset_minutes = 60\n",
        )
        .unwrap();

        let mut config = ConfigState::from_toml_file(&path).unwrap();
        assert_eq!(config.shop_id, "shop-42");
        assert_eq!(config.currency_code, "KES");

        let env: HashMap<&str, &str> = [
            ("DUKA_SHOP_NAME", "Njeri Stores"),
            ("DUKA_UTC_OFFSET_MINUTES", "not-a-number"),
            ("DUKA_INITIAL_CAPITAL", "500000"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.shop_id, "shop-42");
        assert_eq!(config.shop_name, "Njeri Stores");
        assert_eq!(config.utc_offset_minutes, 60);
        assert_eq!(config.initial_capital.minor(), 500_000);
        assert_eq!(config.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_validation() {
        assert!(ConfigState::default().validate().is_ok());

        let bad_offset = ConfigState {
            utc_offset_minutes: 25 * 60,
            ..ConfigState::default()
        };
        assert!(matches!(bad_offset.validate(), Err(ConfigError::Invalid { .. })));

        let no_shop = ConfigState {
            shop_id: " ".to_string(),
            ..ConfigState::default()
        };
        assert!(no_shop.validate().is_err());
    }

    #[test]
    fn test_bad_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "shop_id = [").unwrap();

        assert!(matches!(
            ConfigState::from_toml_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            ConfigState::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let config = ConfigState {
            data_dir: Some(PathBuf::from("/var/lib/duka")),
            ..ConfigState::default()
        };
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/var/lib/duka/duka.db"));
    }
}
