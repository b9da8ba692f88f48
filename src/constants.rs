/// Connector identifiers used on the command line, in config sections and as
/// log/metric labels.
pub const DATABASE_CONNECTOR: &str = "database";
pub const FILESYSTEM_CONNECTOR: &str = "filesystem";
pub const API_CONNECTOR: &str = "api";

// Type names that seed the default qualified-name prefix (`<name lowercased>://`)
pub const DATABASE_CONNECTOR_TYPE: &str = "DatabaseConnector";
pub const FILESYSTEM_CONNECTOR_TYPE: &str = "FileSystemConnector";
pub const API_CONNECTOR_TYPE: &str = "APIConnector";

// Collections used by the CLI when neither flags, env nor the config file name one
pub const DATABASE_DEFAULT_COLLECTION: &str = "DatabaseAssets";
pub const FILESYSTEM_DEFAULT_COLLECTION: &str = "FileAssets";

/// Get all supported connector identifiers
pub fn get_supported_connectors() -> Vec<&'static str> {
    vec![DATABASE_CONNECTOR, FILESYSTEM_CONNECTOR, API_CONNECTOR]
}
