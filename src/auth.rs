use crate::catalog::ClientOptions;
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Resource audience for Purview data-plane tokens.
pub const PURVIEW_SCOPE: &str = "https://purview.azure.net/.default";

/// Bearer token issued for a scope.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Anything that can hand out bearer tokens for a scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// Credential backed by a token that was issued out of band.
pub struct StaticTokenCredential {
    token: String,
    expires_on: Option<DateTime<Utc>>,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_on: None,
        }
    }

    pub fn with_expiry(mut self, expires_on: DateTime<Utc>) -> Self {
        self.expires_on = Some(expires_on);
        self
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        if let Some(expires_on) = self.expires_on {
            if expires_on <= Utc::now() {
                return Err(ConnectorError::Authentication(format!(
                    "static token expired at {}",
                    expires_on
                )));
            }
        }
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: self.expires_on,
        })
    }
}

/// The single authentication strategy held by a client.
#[derive(Clone)]
pub enum Credential {
    Provided(Arc<dyn TokenCredential>),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    ManagedIdentity {
        client_id: Option<String>,
    },
    Interactive,
    AzureCli,
    DefaultChain,
}

impl Credential {
    /// Pick the credential strategy for the given options.
    ///
    /// Priority: explicit credential, service principal, managed identity,
    /// interactive browser, CLI session, default chain.
    pub fn select(options: &ClientOptions) -> Result<Self> {
        if let Some(credential) = &options.credential {
            info!("Using provided credential");
            return Ok(Credential::Provided(credential.clone()));
        }

        if let (Some(client_id), Some(client_secret)) =
            (&options.client_id, &options.client_secret)
        {
            let tenant_id = options.tenant_id.clone().ok_or_else(|| {
                ConnectorError::Authentication(
                    "tenant_id required for Service Principal auth".to_string(),
                )
            })?;
            info!("Using Service Principal authentication");
            return Ok(Credential::ClientSecret {
                tenant_id,
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            });
        }

        if options.use_managed_identity {
            info!("Using Managed Identity authentication");
            return Ok(Credential::ManagedIdentity {
                client_id: options.managed_identity_client_id.clone(),
            });
        }

        if options.interactive {
            warn!("Using interactive authentication - not recommended for production");
            return Ok(Credential::Interactive);
        }

        if options.use_cli_credentials {
            info!("Using Azure CLI credentials");
            return Ok(Credential::AzureCli);
        }

        info!("Using default credential chain");
        Ok(Credential::DefaultChain)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Provided(_) => "provided",
            Credential::ClientSecret { .. } => "client_secret",
            Credential::ManagedIdentity { .. } => "managed_identity",
            Credential::Interactive => "interactive",
            Credential::AzureCli => "azure_cli",
            Credential::DefaultChain => "default_chain",
        }
    }

    /// Exchange the credential for a bearer token.
    ///
    /// Only provided credentials can issue tokens; the other strategies name
    /// an identity flow that this SDK does not speak.
    pub async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        match self {
            Credential::Provided(inner) => inner.get_token(scope).await,
            other => Err(ConnectorError::Authentication(format!(
                "{} token exchange is not available; supply a pre-built credential (e.g. PURVIEW_ACCESS_TOKEN)",
                other.kind()
            ))),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Provided(_) => f.write_str("Provided(..)"),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Credential::ManagedIdentity { client_id } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
            Credential::Interactive => f.write_str("Interactive"),
            Credential::AzureCli => f.write_str("AzureCli"),
            Credential::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}
