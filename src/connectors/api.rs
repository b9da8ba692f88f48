use crate::catalog::Catalog;
use crate::constants::{API_CONNECTOR, API_CONNECTOR_TYPE};
use crate::error::{ConnectorError, Result};
use crate::models::{AtlasEntity, Entity, EntityType};
use crate::pipeline::{Connector, ConnectorBase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub api_endpoint: String,
    /// Opaque auth settings for the source API (header names, key references, ...).
    #[serde(default)]
    pub auth: BTreeMap<String, String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub qualified_name_prefix: Option<String>,
}

impl ApiConfig {
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            auth: BTreeMap::new(),
            collection_name: None,
            qualified_name_prefix: None,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("auth", &self.auth.keys().collect::<Vec<_>>())
            .field("collection_name", &self.collection_name)
            .field("qualified_name_prefix", &self.qualified_name_prefix)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetadata {
    pub api_name: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointInfo>,
}

/// Describes a REST API as a single catalog dataset.
pub struct ApiConnector {
    base: ConnectorBase,
    config: ApiConfig,
}

impl ApiConnector {
    pub fn new(catalog: Arc<dyn Catalog>, config: ApiConfig) -> Result<Self> {
        if config.api_endpoint.trim().is_empty() {
            return Err(ConnectorError::Configuration(
                "api_endpoint must not be empty".to_string(),
            ));
        }
        let base = ConnectorBase::new(
            catalog,
            API_CONNECTOR_TYPE,
            config.collection_name.clone(),
            config.qualified_name_prefix.clone(),
        );
        Ok(Self { base, config })
    }

    pub fn api_endpoint(&self) -> &str {
        &self.config.api_endpoint
    }
}

#[async_trait]
impl Connector for ApiConnector {
    type Metadata = ApiMetadata;

    fn name(&self) -> &'static str {
        API_CONNECTOR
    }

    fn base(&self) -> &ConnectorBase {
        &self.base
    }

    /// Returns a fixed self-description; the endpoint is not called.
    #[instrument(skip(self), fields(endpoint = %self.config.api_endpoint))]
    async fn extract_metadata(&self) -> Result<ApiMetadata> {
        info!("Extracting metadata from API");

        Ok(ApiMetadata {
            api_name: "Sample API".to_string(),
            endpoints: vec![
                EndpointInfo {
                    path: "/users".to_string(),
                    method: "GET".to_string(),
                    description: "Get all users".to_string(),
                },
                EndpointInfo {
                    path: "/users/{id}".to_string(),
                    method: "GET".to_string(),
                    description: "Get user by ID".to_string(),
                },
            ],
        })
    }

    // Endpoints stay on the metadata; only the API itself becomes an entity.
    fn transform_to_atlas(&self, metadata: &ApiMetadata) -> Result<Vec<AtlasEntity>> {
        let api_name = if metadata.api_name.trim().is_empty() {
            "unknown"
        } else {
            metadata.api_name.as_str()
        };

        let entities = vec![Entity::new(
            EntityType::DataSet,
            self.base.create_qualified_name([api_name]),
            api_name,
        )
        .with_attribute("description", format!("API: {}", api_name))
        .to_atlas()];

        info!("Transformed {} entities", entities.len());
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use serde_json::json;

    fn connector() -> ApiConnector {
        ApiConnector::new(
            Arc::new(InMemoryCatalog::new()),
            ApiConfig::new("https://api.example.com"),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        let result = ApiConnector::new(Arc::new(InMemoryCatalog::new()), ApiConfig::new("  "));
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_single_dataset_entity() {
        let connector = connector();
        let metadata = connector.extract_metadata().await.unwrap();
        assert_eq!(metadata.endpoints.len(), 2);

        let entities = connector.transform_to_atlas(&metadata).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].type_name.as_deref(), Some("DataSet"));
        assert_eq!(entities[0].qualified_name(), Some("apiconnector://Sample API"));
        assert_eq!(entities[0].attribute("description"), Some(&json!("API: Sample API")));
    }

    #[test]
    fn test_blank_api_name_falls_back_to_unknown() {
        let metadata = ApiMetadata {
            api_name: String::new(),
            endpoints: vec![],
        };
        let entities = connector().transform_to_atlas(&metadata).unwrap();
        assert_eq!(entities[0].name(), Some("unknown"));
    }

    #[test]
    fn test_auth_values_are_not_debug_printed() {
        let mut config = ApiConfig::new("https://api.example.com");
        config.auth.insert("api_key".into(), "s3cr3t".into());
        let printed = format!("{:?}", config);
        assert!(printed.contains("api_key"));
        assert!(!printed.contains("s3cr3t"));
    }
}
