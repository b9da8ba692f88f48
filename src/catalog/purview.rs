use super::{
    BulkCreateResult, Catalog, LineageDirection, LineageResult, SearchRequest, SearchResults,
};
use crate::auth::{Credential, TokenCredential, PURVIEW_SCOPE};
use crate::error::{ConnectorError, Result};
use crate::models::{AtlasEntity, AtlasRelationship};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Inputs for building a [`PurviewClient`].
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub account_name: Option<String>,
    pub endpoint: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credential: Option<Arc<dyn TokenCredential>>,
    pub use_managed_identity: bool,
    pub managed_identity_client_id: Option<String>,
    pub use_cli_credentials: bool,
    pub interactive: bool,
}

impl ClientOptions {
    /// Read client options from the process environment.
    ///
    /// `PURVIEW_ACCESS_TOKEN`, when set, becomes the explicit credential.
    pub fn from_env() -> Self {
        let credential = non_empty_env("PURVIEW_ACCESS_TOKEN").map(|token| {
            Arc::new(crate::auth::StaticTokenCredential::new(token)) as Arc<dyn TokenCredential>
        });

        Self {
            account_name: non_empty_env("PURVIEW_ACCOUNT_NAME"),
            endpoint: non_empty_env("PURVIEW_ENDPOINT"),
            tenant_id: non_empty_env("AZURE_TENANT_ID"),
            client_id: non_empty_env("AZURE_CLIENT_ID"),
            client_secret: non_empty_env("AZURE_CLIENT_SECRET"),
            credential,
            use_managed_identity: env_flag("AZURE_USE_MANAGED_IDENTITY"),
            managed_identity_client_id: non_empty_env("AZURE_MANAGED_IDENTITY_CLIENT_ID"),
            use_cli_credentials: env_flag("AZURE_USE_CLI"),
            interactive: env_flag("AZURE_INTERACTIVE"),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("account_name", &self.account_name)
            .field("endpoint", &self.endpoint)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("credential", &self.credential.as_ref().map(|_| ".."))
            .field("use_managed_identity", &self.use_managed_identity)
            .field("managed_identity_client_id", &self.managed_identity_client_id)
            .field("use_cli_credentials", &self.use_cli_credentials)
            .field("interactive", &self.interactive)
            .finish()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub name: Option<String>,
    pub endpoint: String,
    pub status: String,
}

/// Client facade for a Purview account.
///
/// Holds one credential; catalog calls are logged and echoed back without
/// leaving the process.
#[derive(Debug)]
pub struct PurviewClient {
    account_name: Option<String>,
    endpoint: String,
    credential: Credential,
}

impl PurviewClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let endpoint = match (&options.endpoint, &options.account_name) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => format!("https://{}.purview.azure.com", account),
            (None, None) => {
                return Err(ConnectorError::Authentication(
                    "Either account_name or endpoint must be provided".to_string(),
                ))
            }
        };

        let credential = Credential::select(&options)?;
        info!(endpoint = %endpoint, credential = credential.kind(), "Initialized Purview client");

        Ok(Self {
            account_name: options.account_name,
            endpoint,
            credential,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn account_name(&self) -> Option<&str> {
        self.account_name.as_deref()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn get_account_info(&self) -> AccountInfo {
        AccountInfo {
            name: self.account_name.clone(),
            endpoint: self.endpoint.clone(),
            status: "active".to_string(),
        }
    }

    /// Bearer token for the Purview data plane.
    pub async fn get_access_token(&self) -> Result<String> {
        self.credential
            .get_token(PURVIEW_SCOPE)
            .await
            .map(|t| t.token)
            .map_err(|e| match e {
                ConnectorError::Authentication(msg) => {
                    ConnectorError::Authentication(format!("Failed to get access token: {}", msg))
                }
                other => {
                    ConnectorError::Authentication(format!("Failed to get access token: {}", other))
                }
            })
    }
}

#[async_trait]
impl Catalog for PurviewClient {
    #[instrument(skip(self, entity), fields(endpoint = %self.endpoint))]
    async fn create_entity(&self, entity: &AtlasEntity) -> Result<AtlasEntity> {
        info!(
            "Creating entity: {}",
            entity.type_name.as_deref().unwrap_or_default()
        );
        Ok(entity.clone())
    }

    #[instrument(skip(self, entities), fields(endpoint = %self.endpoint))]
    async fn bulk_create_entities(&self, entities: &[AtlasEntity]) -> Result<BulkCreateResult> {
        info!("Bulk creating {} entities", entities.len());
        Ok(BulkCreateResult {
            entities_created: entities.len(),
            status: "success".to_string(),
        })
    }

    async fn get_entity(&self, guid: &str) -> Result<Option<AtlasEntity>> {
        info!("Getting entity: {}", guid);
        Ok(None)
    }

    async fn update_entity(&self, guid: &str, entity: &AtlasEntity) -> Result<AtlasEntity> {
        info!("Updating entity: {}", guid);
        Ok(entity.clone())
    }

    async fn delete_entity(&self, guid: &str) -> Result<()> {
        info!("Deleting entity: {}", guid);
        Ok(())
    }

    async fn search_entities(&self, request: &SearchRequest) -> Result<SearchResults> {
        info!(limit = request.limit, offset = request.offset, "Searching entities: {}", request.query);
        Ok(SearchResults {
            query: request.query.clone(),
            total: 0,
            results: Vec::new(),
        })
    }

    async fn create_relationship(
        &self,
        relationship: &AtlasRelationship,
    ) -> Result<AtlasRelationship> {
        info!("Creating relationship: {}", relationship.type_name);
        Ok(relationship.clone())
    }

    async fn get_lineage(
        &self,
        guid: &str,
        direction: LineageDirection,
        depth: u32,
    ) -> Result<LineageResult> {
        info!(%direction, depth, "Getting lineage for entity: {}", guid);
        Ok(LineageResult {
            guid: guid.to_string(),
            direction,
            depth,
            lineage: serde_json::json!({}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenCredential;
    use crate::models::Entity;

    fn client() -> PurviewClient {
        PurviewClient::new(ClientOptions {
            account_name: Some("contoso".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_is_derived_from_account_name() {
        assert_eq!(client().endpoint(), "https://contoso.purview.azure.com");
    }

    #[test]
    fn test_explicit_endpoint_is_kept() {
        let client = PurviewClient::new(ClientOptions {
            endpoint: Some("https://custom.example.net/".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "https://custom.example.net");
        assert_eq!(client.account_name(), None);
    }

    #[test]
    fn test_account_info_reports_name_and_endpoint() {
        let info = client().get_account_info();
        assert_eq!(
            info,
            AccountInfo {
                name: Some("contoso".to_string()),
                endpoint: "https://contoso.purview.azure.com".to_string(),
                status: "active".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_account_and_endpoint_fails() {
        let err = PurviewClient::new(ClientOptions::default()).unwrap_err();
        assert!(matches!(err, ConnectorError::Authentication(_)));
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[tokio::test]
    async fn test_access_token_from_provided_credential() {
        let client = PurviewClient::new(ClientOptions {
            account_name: Some("contoso".into()),
            credential: Some(Arc::new(StaticTokenCredential::new("tok"))),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.get_access_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_access_token_failure_is_wrapped() {
        let err = client().get_access_token().await.unwrap_err();
        match err {
            ConnectorError::Authentication(msg) => {
                assert!(msg.starts_with("Failed to get access token"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_facade_operations_echo_input() {
        let client = client();
        let entity = Entity::new("DataSet", "api://x", "x").to_atlas();

        assert_eq!(client.create_entity(&entity).await.unwrap(), entity);
        assert_eq!(client.get_entity("g").await.unwrap(), None);

        let bulk = client
            .bulk_create_entities(&[entity.clone(), entity.clone()])
            .await
            .unwrap();
        assert_eq!(bulk.entities_created, 2);
        assert_eq!(bulk.status, "success");

        let lineage = client
            .get_lineage("g", LineageDirection::default(), super::super::DEFAULT_LINEAGE_DEPTH)
            .await
            .unwrap();
        assert_eq!(lineage.direction, LineageDirection::Both);
        assert_eq!(lineage.depth, 3);
        assert_eq!(lineage.lineage, serde_json::json!({}));
    }
}
