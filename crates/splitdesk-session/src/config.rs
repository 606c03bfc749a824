//! # SplitDesk Configuration
//!
//! Engine knobs, database location and the payment method catalog.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SPLITDESK_DB_PATH=/var/lib/splitdesk/splitdesk.db                  │
//! │     SPLITDESK_TOLERANCE_CENTS=1                                        │
//! │     SPLITDESK_PAYER_PREFIX=Cliente                                     │
//! │     SPLITDESK_MAX_PAYERS=50                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/splitdesk/splitdesk.toml (Linux)                         │
//! │     ~/Library/Application Support/com.splitdesk.splitdesk/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     1 cent tolerance, "Cliente N", Dinheiro/PIX/Crédito/Débito         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [engine]
//! tolerance_cents = 1
//! payer_name_prefix = "Cliente"
//! max_payers = 50
//!
//! [database]
//! path = "/var/lib/splitdesk/splitdesk.db"
//!
//! [[payment_methods]]
//! id = "dinheiro"
//! name = "Dinheiro"
//! accepts_change = true
//!
//! [[payment_methods]]
//! id = "credito"
//! name = "Crédito"
//! fee_bps = 299
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use splitdesk_core::{
    Money, PaymentMethod, PaymentMethodCatalog, SessionSettings, DEFAULT_MAX_PAYERS,
    DEFAULT_PAYER_NAME_PREFIX, DEFAULT_TOLERANCE_CENTS,
};

const CONFIG_FILE_NAME: &str = "splitdesk.toml";
const DATABASE_FILE_NAME: &str = "splitdesk.db";

/// Hard ceiling on the tolerance: anything above one real is a typo.
const MAX_TOLERANCE_CENTS: i64 = 100;
const MAX_PAYERS_LIMIT: usize = 500;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Settlement engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Accepted |Σ payer totals − order total| at finalization.
    #[serde(default = "default_tolerance_cents")]
    pub tolerance_cents: i64,

    #[serde(default = "default_payer_name_prefix")]
    pub payer_name_prefix: String,

    #[serde(default = "default_max_payers")]
    pub max_payers: usize,
}

fn default_tolerance_cents() -> i64 {
    DEFAULT_TOLERANCE_CENTS
}

fn default_payer_name_prefix() -> String {
    DEFAULT_PAYER_NAME_PREFIX.to_string()
}

fn default_max_payers() -> usize {
    DEFAULT_MAX_PAYERS
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            tolerance_cents: default_tolerance_cents(),
            payer_name_prefix: default_payer_name_prefix(),
            max_payers: default_max_payers(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; the platform data directory is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// One `[[payment_methods]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fee_bps: u32,
    #[serde(default)]
    pub accepts_change: bool,
}

impl PaymentMethodConfig {
    fn new(id: &str, name: &str, fee_bps: u32, accepts_change: bool) -> Self {
        PaymentMethodConfig {
            id: id.to_string(),
            name: name.to_string(),
            fee_bps,
            accepts_change,
        }
    }
}

impl From<&PaymentMethodConfig> for PaymentMethod {
    fn from(cfg: &PaymentMethodConfig) -> Self {
        PaymentMethod::new(&cfg.id, &cfg.name, cfg.fee_bps, cfg.accepts_change)
    }
}

fn default_payment_methods() -> Vec<PaymentMethodConfig> {
    vec![
        PaymentMethodConfig::new("dinheiro", "Dinheiro", 0, true),
        PaymentMethodConfig::new("pix", "PIX", 0, false),
        PaymentMethodConfig::new("credito", "Crédito", 0, false),
        PaymentMethodConfig::new("debito", "Débito", 0, false),
    ]
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDeskConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default = "default_payment_methods")]
    pub payment_methods: Vec<PaymentMethodConfig>,
}

impl Default for SplitDeskConfig {
    fn default() -> Self {
        SplitDeskConfig {
            engine: EngineSettings::default(),
            database: DatabaseSettings::default(),
            payment_methods: default_payment_methods(),
        }
    }
}

impl SplitDeskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`splitdesk.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or falls back to defaults (with a warning).
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0..=MAX_TOLERANCE_CENTS).contains(&self.engine.tolerance_cents) {
            return Err(ConfigError::Invalid(format!(
                "tolerance_cents must be between 0 and {}",
                MAX_TOLERANCE_CENTS
            )));
        }

        let prefix = self.engine.payer_name_prefix.trim();
        if prefix.is_empty() || prefix.chars().count() > 40 {
            return Err(ConfigError::Invalid(
                "payer_name_prefix must be 1 to 40 characters".into(),
            ));
        }

        if self.engine.max_payers == 0 || self.engine.max_payers > MAX_PAYERS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_payers must be between 1 and {}",
                MAX_PAYERS_LIMIT
            )));
        }

        if self.payment_methods.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one payment method is required".into(),
            ));
        }

        self.payment_catalog()?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `SPLITDESK_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SPLITDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("SPLITDESK_TOLERANCE_CENTS") {
            match value.parse::<i64>() {
                Ok(cents) => self.engine.tolerance_cents = cents,
                Err(_) => warn!(value = %value, "Ignoring invalid SPLITDESK_TOLERANCE_CENTS"),
            }
        }

        if let Some(prefix) = lookup("SPLITDESK_PAYER_PREFIX") {
            self.engine.payer_name_prefix = prefix;
        }

        if let Some(value) = lookup("SPLITDESK_MAX_PAYERS") {
            match value.parse::<usize>() {
                Ok(max) => self.engine.max_payers = max,
                Err(_) => warn!(value = %value, "Ignoring invalid SPLITDESK_MAX_PAYERS"),
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "splitdesk", "splitdesk")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn default_database_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "splitdesk", "splitdesk")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file: configured path, else the platform data directory,
    /// else `splitdesk.db` in the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(Self::default_database_path)
            .unwrap_or_else(|| Path::new(DATABASE_FILE_NAME).to_path_buf())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tolerance: Money::from_cents(self.engine.tolerance_cents),
            payer_name_prefix: self.engine.payer_name_prefix.trim().to_string(),
            max_payers: self.engine.max_payers,
        }
    }

    pub fn payment_catalog(&self) -> ConfigResult<PaymentMethodCatalog> {
        PaymentMethodCatalog::new(self.payment_methods.iter().map(PaymentMethod::from).collect())
            .map_err(|e| ConfigError::Invalid(format!("payment_methods: {}", e)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SplitDeskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.tolerance_cents, 1);
        assert_eq!(config.session_settings().payer_name_prefix, "Cliente");

        let catalog = config.payment_catalog().unwrap();
        assert!(catalog.get("dinheiro").unwrap().accepts_change);
        assert!(!catalog.get("pix").unwrap().accepts_change);
        assert_eq!(catalog.methods().len(), 4);
    }

    #[test]
    fn test_parse_toml() {
        let config: SplitDeskConfig = toml::from_str(
            r#"
            [engine]
            tolerance_cents = 2
            payer_name_prefix = "Guest"

            [[payment_methods]]
            id = "cash"
            name = "Cash"
            accepts_change = true

            [[payment_methods]]
            id = "card"
            name = "Card"
            fee_bps = 299
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.tolerance_cents, 2);
        assert_eq!(config.engine.max_payers, DEFAULT_MAX_PAYERS);
        assert_eq!(config.database.path, None);
        assert_eq!(config.payment_methods.len(), 2);
        assert_eq!(config.payment_methods[1].fee_bps, 299);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_gets_default_methods() {
        let config: SplitDeskConfig = toml::from_str("").unwrap();
        assert_eq!(config, SplitDeskConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = SplitDeskConfig::default();
        config.engine.tolerance_cents = -1;
        assert!(config.validate().is_err());

        let mut config = SplitDeskConfig::default();
        config.engine.max_payers = 0;
        assert!(config.validate().is_err());

        let mut config = SplitDeskConfig::default();
        config.engine.payer_name_prefix = "  ".into();
        assert!(config.validate().is_err());

        let mut config = SplitDeskConfig::default();
        config
            .payment_methods
            .push(PaymentMethodConfig::new("pix", "PIX again", 0, false));
        assert!(config.validate().is_err());

        let mut config = SplitDeskConfig::default();
        config.payment_methods.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SPLITDESK_DB_PATH", "/tmp/x.db"),
            ("SPLITDESK_TOLERANCE_CENTS", "3"),
            ("SPLITDESK_PAYER_PREFIX", "Mesa"),
            ("SPLITDESK_MAX_PAYERS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = SplitDeskConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(config.engine.tolerance_cents, 3);
        assert_eq!(config.engine.payer_name_prefix, "Mesa");
        assert_eq!(config.engine.max_payers, DEFAULT_MAX_PAYERS);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("splitdesk-config-{}", std::process::id()));
        let path = dir.join("splitdesk.toml");

        let mut config = SplitDeskConfig::default();
        config.engine.payer_name_prefix = "Pessoa".into();
        config.save(Some(path.clone())).unwrap();

        let loaded: SplitDeskConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(dir).ok();
    }
}
