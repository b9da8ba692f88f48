use crate::catalog::Catalog;
use crate::constants::{DATABASE_CONNECTOR, DATABASE_CONNECTOR_TYPE};
use crate::error::{ConnectorError, Result};
use crate::models::{AtlasEntity, Entity, EntityType};
use crate::pipeline::{Connector, ConnectorBase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// Database engines the connector knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    SqlServer,
    Postgresql,
    Mysql,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::SqlServer => "sql_server",
            DatabaseKind::Postgresql => "postgresql",
            DatabaseKind::Mysql => "mysql",
        }
    }

    /// Driver-style connection string for the given parameters.
    pub fn connection_string(&self, params: &ConnectionParams) -> String {
        let server = params.server.as_deref().unwrap_or_default();
        let database = params.database.as_deref().unwrap_or_default();
        let user = params.user.as_deref().unwrap_or_default();
        let password = params.password.as_deref().unwrap_or_default();

        match self {
            DatabaseKind::SqlServer => format!(
                "Driver={{ODBC Driver 17 for SQL Server}};Server={};Database={};UID={};PWD={}",
                server, database, user, password
            ),
            DatabaseKind::Postgresql => {
                format!("postgresql://{}:{}@{}/{}", user, password, server, database)
            }
            DatabaseKind::Mysql => {
                format!("mysql+pymysql://{}:{}@{}/{}", user, password, server, database)
            }
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql_server" | "sqlserver" | "mssql" => Ok(DatabaseKind::SqlServer),
            "postgresql" | "postgres" => Ok(DatabaseKind::Postgresql),
            "mysql" => Ok(DatabaseKind::Mysql),
            other => Err(ConnectorError::Configuration(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionParams {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub source_type: DatabaseKind,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub connection: ConnectionParams,
    #[serde(default)]
    pub use_gateway: bool,
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub qualified_name_prefix: Option<String>,
}

impl DatabaseConfig {
    pub fn new(source_type: DatabaseKind) -> Self {
        Self {
            source_type,
            connection_string: None,
            connection: ConnectionParams::default(),
            use_gateway: false,
            gateway_id: None,
            collection_name: None,
            qualified_name_prefix: None,
        }
    }

    /// Explicit connection string, or one built from the connection parameters.
    pub fn resolved_connection_string(&self) -> Option<String> {
        self.connection_string.clone().or_else(|| {
            self.connection
                .server
                .as_ref()
                .map(|_| self.source_type.connection_string(&self.connection))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub database_name: String,
    #[serde(default)]
    pub schemas: Vec<SchemaInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    pub fn new(name: &str, data_type: &str, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
        }
    }
}

/// Scans schema, table and column metadata of a relational database.
pub struct DatabaseConnector {
    base: ConnectorBase,
    config: DatabaseConfig,
}

impl DatabaseConnector {
    pub fn new(catalog: Arc<dyn Catalog>, config: DatabaseConfig) -> Result<Self> {
        super::check_gateway(config.use_gateway, config.gateway_id.as_deref())?;
        let base = ConnectorBase::new(
            catalog,
            DATABASE_CONNECTOR_TYPE,
            config.collection_name.clone(),
            config.qualified_name_prefix.clone(),
        );
        Ok(Self { base, config })
    }

    pub fn source_type(&self) -> DatabaseKind {
        self.config.source_type
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

fn require_name<'a>(kind: &str, name: &'a str) -> Result<&'a str> {
    if name.trim().is_empty() {
        return Err(ConnectorError::Transformation(format!(
            "{} with empty name",
            kind
        )));
    }
    Ok(name)
}

#[async_trait]
impl Connector for DatabaseConnector {
    type Metadata = DatabaseMetadata;

    fn name(&self) -> &'static str {
        DATABASE_CONNECTOR
    }

    fn base(&self) -> &ConnectorBase {
        &self.base
    }

    /// Returns a fixed sample schema; no driver connection is opened.
    #[instrument(skip(self), fields(source_type = %self.config.source_type))]
    async fn extract_metadata(&self) -> Result<DatabaseMetadata> {
        info!(
            server = self.config.connection.server.as_deref().unwrap_or("-"),
            gateway = self.config.use_gateway,
            "Extracting metadata from {}",
            self.config.source_type
        );

        Ok(DatabaseMetadata {
            database_name: "sample_database".to_string(),
            schemas: vec![SchemaInfo {
                name: "dbo".to_string(),
                tables: vec![TableInfo {
                    name: "customers".to_string(),
                    columns: vec![
                        ColumnInfo::new("id", "int", false),
                        ColumnInfo::new("name", "varchar", false),
                        ColumnInfo::new("email", "varchar", true),
                    ],
                }],
            }],
        })
    }

    /// Emits the database, then every table followed by its columns.
    fn transform_to_atlas(&self, metadata: &DatabaseMetadata) -> Result<Vec<AtlasEntity>> {
        let mut entities = Vec::new();
        let db_name = if metadata.database_name.trim().is_empty() {
            "unknown"
        } else {
            metadata.database_name.as_str()
        };

        entities.push(
            Entity::new(
                EntityType::RdbmsDb,
                self.base.create_qualified_name([db_name]),
                db_name,
            )
            .with_attribute("description", format!("{} database", self.config.source_type))
            .to_atlas(),
        );

        for schema in &metadata.schemas {
            let schema_name = require_name("schema", &schema.name)?;

            for table in &schema.tables {
                let table_name = require_name("table", &table.name)?;
                entities.push(
                    Entity::new(
                        EntityType::RdbmsTable,
                        self.base
                            .create_qualified_name([db_name, schema_name, table_name]),
                        table_name,
                    )
                    .with_attribute("description", format!("Table in {} schema", schema_name))
                    .to_atlas(),
                );

                for column in &table.columns {
                    let column_name = require_name("column", &column.name)?;
                    entities.push(
                        Entity::new(
                            EntityType::RdbmsColumn,
                            self.base.create_qualified_name([
                                db_name,
                                schema_name,
                                table_name,
                                column_name,
                            ]),
                            column_name,
                        )
                        .with_attribute("data_type", column.data_type.clone())
                        .with_attribute("isNullable", column.nullable)
                        .to_atlas(),
                    );
                }
            }
        }

        info!("Transformed {} entities", entities.len());
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use serde_json::json;

    fn connector(config: DatabaseConfig) -> DatabaseConnector {
        DatabaseConnector::new(Arc::new(InMemoryCatalog::new()), config).unwrap()
    }

    #[test]
    fn test_parse_database_kind() {
        assert_eq!("sql_server".parse::<DatabaseKind>().unwrap(), DatabaseKind::SqlServer);
        assert_eq!("Postgres".parse::<DatabaseKind>().unwrap(), DatabaseKind::Postgresql);
        assert!(matches!(
            "oracle".parse::<DatabaseKind>(),
            Err(ConnectorError::Configuration(_))
        ));
    }

    #[test]
    fn test_connection_strings() {
        let params = ConnectionParams {
            server: Some("db01".into()),
            database: Some("sales".into()),
            user: Some("svc".into()),
            password: Some("pw".into()),
        };
        assert_eq!(
            DatabaseKind::Postgresql.connection_string(&params),
            "postgresql://svc:pw@db01/sales"
        );
        assert_eq!(
            DatabaseKind::SqlServer.connection_string(&params),
            "Driver={ODBC Driver 17 for SQL Server};Server=db01;Database=sales;UID=svc;PWD=pw"
        );
        assert!(!format!("{:?}", params).contains("pw\""));
    }

    #[test]
    fn test_explicit_connection_string_wins() {
        let mut config = DatabaseConfig::new(DatabaseKind::Mysql);
        assert_eq!(config.resolved_connection_string(), None);

        config.connection.server = Some("h".into());
        assert_eq!(
            config.resolved_connection_string().as_deref(),
            Some("mysql+pymysql://:@h/")
        );

        config.connection_string = Some("custom".into());
        assert_eq!(config.resolved_connection_string().as_deref(), Some("custom"));
    }

    #[test]
    fn test_gateway_without_id_is_rejected() {
        let mut config = DatabaseConfig::new(DatabaseKind::SqlServer);
        config.use_gateway = true;
        let result = DatabaseConnector::new(Arc::new(InMemoryCatalog::new()), config);
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }

    #[test]
    fn test_column_attributes() {
        let connector = connector(DatabaseConfig::new(DatabaseKind::SqlServer));
        let metadata: DatabaseMetadata = serde_json::from_value(json!({
            "database_name": "sales",
            "schemas": [{ "name": "dbo", "tables": [{ "name": "t", "columns": [
                { "name": "note", "type": "text" }
            ]}]}]
        }))
        .unwrap();

        let entities = connector.transform_to_atlas(&metadata).unwrap();
        let column = &entities[2];
        assert_eq!(column.type_name.as_deref(), Some("rdbms_column"));
        assert_eq!(column.qualified_name(), Some("databaseconnector://sales/dbo/t/note"));
        assert_eq!(column.attribute("data_type"), Some(&json!("text")));
        assert_eq!(column.attribute("isNullable"), Some(&json!(true)));
        assert_eq!(
            entities[0].attribute("description"),
            Some(&json!("sql_server database"))
        );
    }

    #[test]
    fn test_empty_table_name_is_a_transformation_error() {
        let connector = connector(DatabaseConfig::new(DatabaseKind::SqlServer));
        let metadata = DatabaseMetadata {
            database_name: "sales".into(),
            schemas: vec![SchemaInfo {
                name: "dbo".into(),
                tables: vec![TableInfo {
                    name: " ".into(),
                    columns: vec![],
                }],
            }],
        };
        assert!(matches!(
            connector.transform_to_atlas(&metadata),
            Err(ConnectorError::Transformation(_))
        ));
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let parsed: std::result::Result<DatabaseConfig, _> = toml::from_str(
            r#"
            source_type = "postgresql"
            hostname = "db01"
            "#,
        );
        assert!(parsed.is_err());
    }
}
