//! Configuration model loaded from external sources.

use std::env;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::pagination::Pageable;

fn default_count_elision() -> bool {
    true
}

fn default_pool_size() -> u32 {
    8
}

fn default_page_size() -> i64 {
    20
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
/// Settings for the member query repository and its SQLite backend.
pub struct RepositoryConfig {
    pub database_url: String,
    /// Skip the count query when the fetched slice already fixes the total.
    #[serde(default = "default_count_elision")]
    pub count_elision: bool,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
}

impl RepositoryConfig {
    /// Loads `config/default.yaml`, then `config/{APP_ENV}.yaml` if present,
    /// then `MEMBER_QUERY__*` environment variables. A `.env` file is read
    /// first when one exists.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        // Select config profile (defaults to `local`).
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".into());

        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(
                Environment::with_prefix("MEMBER_QUERY")
                    .prefix_separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Zero-based page request using the configured page size.
    pub fn page(&self, page: i64) -> Pageable {
        Pageable::of_page(page, self.default_page_size)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }
}
