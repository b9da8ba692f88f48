use crate::catalog::ClientOptions;
use crate::connectors::{ApiConfig, DatabaseConfig, FilesystemConfig};
use crate::error::{ConnectorError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "purview-connector.toml";

/// Contents of the connector TOML file. Every section is optional and
/// unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub purview: PurviewSection,
    pub database: Option<DatabaseConfig>,
    pub filesystem: Option<FilesystemConfig>,
    pub api: Option<ApiConfig>,
}

/// Non-secret client settings. Secrets only come from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurviewSection {
    pub account_name: Option<String>,
    pub endpoint: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(default)]
    pub use_managed_identity: bool,
    pub managed_identity_client_id: Option<String>,
    #[serde(default)]
    pub use_cli_credentials: bool,
    #[serde(default)]
    pub interactive: bool,
}

impl PurviewSection {
    /// Fill options not already set (e.g. from the environment) with file values.
    pub fn merge_into(&self, mut options: ClientOptions) -> ClientOptions {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut options.account_name, &self.account_name);
        fill(&mut options.endpoint, &self.endpoint);
        fill(&mut options.tenant_id, &self.tenant_id);
        fill(&mut options.client_id, &self.client_id);
        fill(
            &mut options.managed_identity_client_id,
            &self.managed_identity_client_id,
        );
        options.use_managed_identity |= self.use_managed_identity;
        options.use_cli_credentials |= self.use_cli_credentials;
        options.interactive |= self.interactive;
        options
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConnectorError::Configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
