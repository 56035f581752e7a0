//! Configuration for the course marketplace ledger

use crate::constants::*;
use crate::{Address, LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Platform owner; receives platform fees and owns the token
    pub owner: Address,
    /// Account students approve as spender when purchasing courses
    pub marketplace_address: Address,
    /// Platform configuration
    #[serde(default)]
    pub platform: PlatformSettings,
    /// Token configuration
    #[serde(default)]
    pub token: TokenSettings,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Percentage of each course price routed to the owner (0-20)
    pub fee_percentage: u8,
}

/// Token configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places of one whole token
    pub decimals: u8,
    /// Whole tokens credited to the owner at genesis
    pub initial_supply_tokens: u64,
    /// Tokens per unit of ETH for `buy_tokens`/`sell_tokens`
    pub exchange_rate: u64,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Where `LedgerService::persist` writes snapshots
    pub snapshot_path: PathBuf,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            fee_percentage: DEFAULT_PLATFORM_FEE_PERCENTAGE,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            initial_supply_tokens: DEFAULT_INITIAL_SUPPLY_TOKENS,
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_path: LedgerConfig::default_config_dir().join("ledger.json"),
        }
    }
}

impl LedgerConfig {
    /// Configuration with default platform, token and storage settings
    pub fn new(owner: Address, marketplace_address: Address) -> Self {
        Self {
            owner,
            marketplace_address,
            platform: PlatformSettings::default(),
            token: TokenSettings::default(),
            storage: StorageSettings::default(),
        }
    }

    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> LedgerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LedgerConfig =
            toml::from_str(&content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        tracing::info!("Loaded ledger configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> LedgerResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_default().join("yd")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("ledger.toml")
    }

    /// Validate configuration
    pub fn validate(&self) -> LedgerResult<()> {
        if self.owner.is_zero() {
            return Err(LedgerError::Config("Owner cannot be the null account".to_string()));
        }

        if self.marketplace_address.is_zero() {
            return Err(LedgerError::Config(
                "Marketplace address cannot be the null account".to_string(),
            ));
        }

        if self.owner == self.marketplace_address {
            return Err(LedgerError::Config(
                "Marketplace address must differ from the owner".to_string(),
            ));
        }

        if self.platform.fee_percentage > MAX_PLATFORM_FEE_PERCENTAGE {
            return Err(LedgerError::FeeTooHigh(self.platform.fee_percentage));
        }

        if self.token.name.is_empty() || self.token.symbol.is_empty() {
            return Err(LedgerError::Config("Token name and symbol cannot be empty".to_string()));
        }

        if self.token.decimals > 36 {
            return Err(LedgerError::Config(format!(
                "Token decimals too large: {}",
                self.token.decimals
            )));
        }

        if self.token.exchange_rate == 0 {
            return Err(LedgerError::Config("Exchange rate cannot be zero".to_string()));
        }

        Ok(())
    }
}
