//! Configuration management for the Bodega inventory backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with BODEGA_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Inventory business rules and paging defaults
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify HS256 bearer tokens
    pub secret: String,

    /// Expected `iss` claim, not checked when unset
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Refuse exits from a deactivated warehouse. Entries always require an
    /// active warehouse.
    #[serde(default)]
    pub require_active_warehouse_on_exit: bool,

    #[serde(default = "default_movement_page_size")]
    pub movement_page_size: i64,

    #[serde(default = "default_stock_page_size")]
    pub stock_page_size: i64,

    #[serde(default = "default_warehouse_page_size")]
    pub warehouse_page_size: i64,
}

fn default_movement_page_size() -> i64 {
    10
}

fn default_stock_page_size() -> i64 {
    20
}

fn default_warehouse_page_size() -> i64 {
    10
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            require_active_warehouse_on_exit: false,
            movement_page_size: default_movement_page_size(),
            stock_page_size: default_stock_page_size(),
            warehouse_page_size: default_warehouse_page_size(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BODEGA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.require_active_warehouse_on_exit", false)?
            .set_default("inventory.movement_page_size", 10)?
            .set_default("inventory.stock_page_size", 20)?
            .set_default("inventory.warehouse_page_size", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BODEGA prefix)
            .add_source(
                Environment::with_prefix("BODEGA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration for tests and local tooling that never touches a database
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                issuer: None,
            },
            inventory: InventoryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
