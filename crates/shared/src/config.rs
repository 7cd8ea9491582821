//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger and workflow tunables.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger and workflow configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Zero-padding width of the counter segment in document numbers.
    #[serde(default = "default_document_number_width")]
    pub document_number_width: usize,
    /// Vendor-invoice deviation (percent of PO total) above which a warning is raised.
    #[serde(default = "default_invoice_deviation_tolerance_pct")]
    pub invoice_deviation_tolerance_pct: Decimal,
}

fn default_document_number_width() -> usize {
    6
}

fn default_invoice_deviation_tolerance_pct() -> Decimal {
    Decimal::from(5)
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            document_number_width: default_document_number_width(),
            invoice_deviation_tolerance_pct: default_invoice_deviation_tolerance_pct(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `COREBOOK__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COREBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
