// Concrete metadata sources; each plugs extract + transform into the shared pipeline.
pub mod api;
pub mod database;
pub mod filesystem;

use crate::error::{ConnectorError, Result};
use crate::pipeline::{scan_and_ingest, Connector, ScanSummary};
use serde::Serialize;

pub use api::{ApiConfig, ApiConnector, ApiMetadata};
pub use database::{DatabaseConfig, DatabaseConnector, DatabaseKind, DatabaseMetadata};
pub use filesystem::{FilesystemConfig, FilesystemConnector, FilesystemMetadata};

/// A source reached through an on-premises gateway must name the gateway.
pub(crate) fn check_gateway(use_gateway: bool, gateway_id: Option<&str>) -> Result<()> {
    if use_gateway && gateway_id.map_or(true, |id| id.trim().is_empty()) {
        return Err(ConnectorError::Configuration(
            "gateway_id is required when use_gateway is set".to_string(),
        ));
    }
    Ok(())
}

/// Extracted metadata of whichever source was scanned.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SourceMetadata {
    Database(DatabaseMetadata),
    Filesystem(FilesystemMetadata),
    Api(ApiMetadata),
}

/// One of the bundled connectors, chosen at runtime.
pub enum SourceConnector {
    Database(DatabaseConnector),
    Filesystem(FilesystemConnector),
    Api(ApiConnector),
}

impl SourceConnector {
    pub fn name(&self) -> &'static str {
        match self {
            SourceConnector::Database(c) => c.name(),
            SourceConnector::Filesystem(c) => c.name(),
            SourceConnector::Api(c) => c.name(),
        }
    }

    pub async fn scan_and_ingest(&self) -> Result<ScanSummary<SourceMetadata>> {
        match self {
            SourceConnector::Database(c) => Ok(scan_and_ingest(c)
                .await?
                .map_metadata(SourceMetadata::Database)),
            SourceConnector::Filesystem(c) => Ok(scan_and_ingest(c)
                .await?
                .map_metadata(SourceMetadata::Filesystem)),
            SourceConnector::Api(c) => Ok(scan_and_ingest(c)
                .await?
                .map_metadata(SourceMetadata::Api)),
        }
    }
}

impl From<DatabaseConnector> for SourceConnector {
    fn from(c: DatabaseConnector) -> Self {
        SourceConnector::Database(c)
    }
}

impl From<FilesystemConnector> for SourceConnector {
    fn from(c: FilesystemConnector) -> Self {
        SourceConnector::Filesystem(c)
    }
}

impl From<ApiConnector> for SourceConnector {
    fn from(c: ApiConnector) -> Self {
        SourceConnector::Api(c)
    }
}
