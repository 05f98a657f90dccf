//! Exchange configuration.

use serde::{Deserialize, Serialize};

use bondcurve_common::{Amount, ExchangeError, Result, DECIMALS};
use bondcurve_pricing::{BondingCurve, DEFAULT_BASE_PRICE, DEFAULT_SLOPE_DENOMINATOR};

/// Unit metadata reported by the readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Fractional digits. Fixed at 18.
    pub decimals: u32,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Bonding Curve Unit".to_string(),
            symbol: "BCU".to_string(),
            decimals: DECIMALS,
        }
    }
}

/// Curve constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Price at zero volume.
    pub base_price: Amount,
    /// Volume over which the price grows by one base price.
    pub slope_denominator: Amount,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_BASE_PRICE,
            slope_denominator: DEFAULT_SLOPE_DENOMINATOR,
        }
    }
}

impl CurveConfig {
    /// Build the curve.
    pub fn build(&self) -> Result<BondingCurve> {
        BondingCurve::new(self.base_price, self.slope_denominator)
    }
}

/// Main exchange configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Unit metadata.
    pub token: TokenMetadata,
    /// Curve constants.
    pub curve: CurveConfig,
    /// Allow the seed-mint testing backdoor.
    pub seed_mint_enabled: bool,
    /// Log level.
    pub log_level: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            token: TokenMetadata::default(),
            curve: CurveConfig::default(),
            seed_mint_enabled: false,
            log_level: "info".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable numeric values are reported rather than ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("BONDCURVE_TOKEN_NAME") {
            config.token.name = name;
        }

        if let Ok(symbol) = std::env::var("BONDCURVE_TOKEN_SYMBOL") {
            config.token.symbol = symbol;
        }

        if let Ok(price) = std::env::var("BONDCURVE_BASE_PRICE") {
            config.curve.base_price = parse_raw("BONDCURVE_BASE_PRICE", &price)?;
        }

        if let Ok(slope) = std::env::var("BONDCURVE_SLOPE_DENOMINATOR") {
            config.curve.slope_denominator = parse_raw("BONDCURVE_SLOPE_DENOMINATOR", &slope)?;
        }

        if let Ok(flag) = std::env::var("BONDCURVE_SEED_MINT") {
            config.seed_mint_enabled = parse_flag(&flag);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.token.name.trim().is_empty() {
            return Err(ExchangeError::ConfigurationError(
                "Token name cannot be empty".to_string(),
            ));
        }

        if self.token.symbol.trim().is_empty() {
            return Err(ExchangeError::ConfigurationError(
                "Token symbol cannot be empty".to_string(),
            ));
        }

        if self.token.decimals != DECIMALS {
            return Err(ExchangeError::ConfigurationError(format!(
                "Decimals must be {}",
                DECIMALS
            )));
        }

        self.curve.build().map(|_| ())
    }
}

fn parse_raw(key: &str, value: &str) -> Result<Amount> {
    value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|_| ExchangeError::ConfigurationError(format!("{} is not an integer: {}", key, value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
