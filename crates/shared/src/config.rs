//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Outbox worker configuration.
    pub worker: WorkerConfig,
    /// Fallback account codes used when no mapping rule matches.
    pub default_accounts: DefaultAccounts,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
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

/// Outbox worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between outbox polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Maximum events claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Retry attempts before an event is parked as dead.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    /// Per-event processing timeout in seconds.
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,
    /// Base delay in seconds for exponential retry backoff.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: i64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_batch_size() -> u64 {
    25
}

fn default_max_retries() -> i32 {
    5
}

fn default_item_timeout() -> u64 {
    30
}

fn default_backoff_base() -> i64 {
    10
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            item_timeout_secs: default_item_timeout(),
            backoff_base_secs: default_backoff_base(),
        }
    }
}

/// Fallback account codes, one per posting role.
///
/// Tenant mapping rules take precedence; these codes are used when no
/// rule matches an event.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultAccounts {
    /// Cash on hand.
    #[serde(default = "default_cash")]
    pub cash: String,
    /// Bank account (non-cash payment methods).
    #[serde(default = "default_bank")]
    pub bank: String,
    /// Accounts receivable.
    #[serde(default = "default_accounts_receivable")]
    pub accounts_receivable: String,
    /// Accounts payable.
    #[serde(default = "default_accounts_payable")]
    pub accounts_payable: String,
    /// Sales revenue.
    #[serde(default = "default_sales_revenue")]
    pub sales_revenue: String,
    /// Inventory / purchases.
    #[serde(default = "default_inventory")]
    pub inventory: String,
    /// Tax payable.
    #[serde(default = "default_tax_payable")]
    pub tax_payable: String,
    /// Sales discounts (contra-revenue).
    #[serde(default = "default_sales_discounts")]
    pub sales_discounts: String,
    /// General expense fallback.
    #[serde(default = "default_general_expense")]
    pub general_expense: String,
}

fn default_cash() -> String {
    "1000".to_string()
}

fn default_bank() -> String {
    "1010".to_string()
}

fn default_accounts_receivable() -> String {
    "1100".to_string()
}

fn default_accounts_payable() -> String {
    "2000".to_string()
}

fn default_sales_revenue() -> String {
    "4000".to_string()
}

fn default_inventory() -> String {
    "1200".to_string()
}

fn default_tax_payable() -> String {
    "2100".to_string()
}

fn default_sales_discounts() -> String {
    "4900".to_string()
}

fn default_general_expense() -> String {
    "6000".to_string()
}

impl Default for DefaultAccounts {
    fn default() -> Self {
        Self {
            cash: default_cash(),
            bank: default_bank(),
            accounts_receivable: default_accounts_receivable(),
            accounts_payable: default_accounts_payable(),
            sales_revenue: default_sales_revenue(),
            inventory: default_inventory(),
            tax_payable: default_tax_payable(),
            sales_discounts: default_sales_discounts(),
            general_expense: default_general_expense(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SALDO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
