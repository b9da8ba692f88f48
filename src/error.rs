use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Connection to data source failed: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transformation failed: {0}")]
    Transformation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConnectorError {
    /// Process exit status used by the `purview-connector` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConnectorError::Configuration(_) | ConnectorError::Toml(_) => 2,
            ConnectorError::Authentication(_) => 3,
            ConnectorError::Validation(_) => 4,
            ConnectorError::Transformation(_) => 5,
            ConnectorError::Connection(_) => 6,
            ConnectorError::Ingestion(_) => 7,
            ConnectorError::Io(_) | ConnectorError::Json(_) => 1,
        }
    }

    /// Whether a caller could reasonably try the same call again.
    ///
    /// Nothing in this crate retries; the flag only classifies failures for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::Connection(_) | ConnectorError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let errors = [
            ConnectorError::Configuration("x".into()),
            ConnectorError::Authentication("x".into()),
            ConnectorError::Validation("x".into()),
            ConnectorError::Transformation("x".into()),
            ConnectorError::Connection("x".into()),
            ConnectorError::Ingestion("x".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_only_connection_failures_are_retryable() {
        assert!(ConnectorError::Connection("timeout".into()).is_retryable());
        assert!(!ConnectorError::Validation("missing typeName".into()).is_retryable());
        assert!(!ConnectorError::Authentication("bad secret".into()).is_retryable());
    }
}
