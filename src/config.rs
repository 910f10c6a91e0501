//! Configuration loader and validator for the shop store.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://./data/shop.db`.
    pub url: String,
    /// Log every executed statement.
    #[serde(default)]
    pub echo: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// How much sample data the seeder generates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SeedConfig {
    pub users: usize,
    pub orders: usize,
    pub products: usize,
    pub products_per_order: usize,
    pub rng_seed: u64,
    /// Skip clearing users, orders and products before seeding.
    pub keep_existing: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: 10,
            orders: 10,
            products: 10,
            products_per_order: 3,
            rng_seed: 0,
            keep_existing: false,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            echo: false,
            max_connections: default_max_connections(),
        }
    }

    /// Apply `DATABASE_URL` and `DATABASE_ECHO` from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.url = url;
            }
        }
        if let Ok(echo) = std::env::var("DATABASE_ECHO") {
            self.echo = parse_flag(&echo);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load configuration from a YAML file, apply environment overrides and
/// validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - A `.env` file in the working directory is loaded first when present.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.database.apply_env_overrides();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }
    if cfg.database.max_connections == 0 {
        return Err(ConfigError::Invalid("database.max_connections must be > 0"));
    }
    if cfg.seed.users > crate::seed::USER_ID_SPACE {
        return Err(ConfigError::Invalid("seed.users must be <= 10000"));
    }
    if cfg.seed.products > 0 && cfg.seed.orders > 0 && cfg.seed.products_per_order == 0 {
        return Err(ConfigError::Invalid("seed.products_per_order must be > 0"));
    }
    Ok(())
}

/// Example configuration shipped with the binaries.
pub fn example() -> &'static str {
    r#"database:
  url: "sqlite://./data/shop.db"
  echo: false
  max_connections: 5

seed:
  users: 10
  orders: 10
  products: 10
  products_per_order: 3
  rng_seed: 0
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.seed, SeedConfig::default());
        assert!(!cfg.database.echo);
    }

    #[test]
    fn seed_section_is_optional() {
        let cfg: Config = serde_yaml::from_str("database:\n  url: \"sqlite::memory:\"\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.seed.products_per_order, 3);
    }

    #[test]
    fn invalid_database_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.url = "  ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("database.url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_pool_and_seed_sizes() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.max_connections = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.seed.products_per_order = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("products_per_order")),
            _ => panic!("wrong error"),
        }

        // No orders to link, so zero links per order is fine.
        cfg.seed.orders = 0;
        validate(&cfg).unwrap();
    }

    #[test]
    fn too_many_seed_users() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.seed.users = crate::seed::USER_ID_SPACE;
        validate(&cfg).unwrap();

        cfg.seed.users += 1;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("seed.users")),
            _ => panic!("wrong error"),
        }
    }

    // The only test touching DATABASE_URL/DATABASE_ECHO, so the process-wide
    // variables are not raced by other tests.
    #[test]
    fn env_overrides_apply() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();

        std::env::set_var("DATABASE_URL", "sqlite://override/shop.db");
        std::env::set_var("DATABASE_ECHO", "true");
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.database.url, "sqlite://override/shop.db");
        assert!(cfg.database.echo);

        std::env::set_var("DATABASE_URL", "   ");
        std::env::set_var("DATABASE_ECHO", "0");
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.database.url, "sqlite://./data/shop.db");
        assert!(!cfg.database.echo);

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("DATABASE_ECHO");
    }

    #[test]
    fn flags() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.seed.users, 10);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
