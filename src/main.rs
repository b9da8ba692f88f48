use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use purview_connector_sdk::catalog::{Catalog, ClientOptions, InMemoryCatalog, PurviewClient};
use purview_connector_sdk::config::{AppConfig, DEFAULT_CONFIG_PATH};
use purview_connector_sdk::connectors::{
    ApiConfig, ApiConnector, DatabaseConfig, DatabaseConnector, DatabaseKind, FilesystemConfig,
    FilesystemConnector, SourceConnector,
};
use purview_connector_sdk::error::ConnectorError;
use purview_connector_sdk::{constants, logging};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "purview-connector")]
#[command(about = "Scan a data source and ingest its metadata into Microsoft Purview")]
#[command(version)]
struct Cli {
    /// Connector config file (TOML). Defaults to ./purview-connector.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ingest into an in-process catalog instead of Purview
    #[arg(long, global = true)]
    in_memory: bool,

    /// Directory for the rolling JSON log file
    #[arg(long, global = true, env = "PURVIEW_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a relational database (sql_server, postgresql, mysql)
    Database {
        #[arg(long, env = "DB_TYPE")]
        db_type: Option<String>,
        #[arg(long, env = "DB_SERVER")]
        server: Option<String>,
        #[arg(long, env = "DB_NAME")]
        database: Option<String>,
        #[arg(long, env = "DB_USER")]
        user: Option<String>,
        #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, env = "COLLECTION_NAME")]
        collection: Option<String>,
        /// Qualified-name prefix; defaults to <db_type>://<server>/<database>
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Scan a directory tree
    Filesystem {
        #[arg(long, env = "ROOT_PATH")]
        root: Option<PathBuf>,
        /// Comma-separated extension allow-list, e.g. .csv,.xlsx
        #[arg(long, env = "FILE_EXTENSIONS", value_delimiter = ',')]
        extensions: Vec<String>,
        /// Accepts true/false, yes/no, on/off or 1/0 in any case
        #[arg(long, env = "RECURSIVE", value_parser = BoolishValueParser::new())]
        recursive: Option<bool>,
        #[arg(long, env = "COLLECTION_NAME")]
        collection: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Describe a REST API
    Api {
        #[arg(long, env = "API_ENDPOINT")]
        endpoint: Option<String>,
        #[arg(long, env = "COLLECTION_NAME")]
        collection: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
    },
}

fn override_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn build_connector(
    command: Commands,
    file_config: AppConfig,
    catalog: Arc<dyn Catalog>,
) -> Result<SourceConnector, ConnectorError> {
    match command {
        Commands::Database {
            db_type,
            server,
            database,
            user,
            password,
            collection,
            prefix,
        } => {
            let mut config = match (file_config.database, db_type) {
                (Some(mut config), Some(db_type)) => {
                    config.source_type = db_type.parse()?;
                    config
                }
                (Some(config), None) => config,
                (None, db_type) => DatabaseConfig::new(
                    db_type.as_deref().unwrap_or("sql_server").parse::<DatabaseKind>()?,
                ),
            };
            override_some(&mut config.connection.server, server);
            override_some(&mut config.connection.database, database);
            override_some(&mut config.connection.user, user);
            override_some(&mut config.connection.password, password);
            override_some(&mut config.collection_name, collection);
            override_some(&mut config.qualified_name_prefix, prefix);
            config
                .collection_name
                .get_or_insert_with(|| constants::DATABASE_DEFAULT_COLLECTION.to_string());

            if config.qualified_name_prefix.is_none() {
                if let (Some(server), Some(database)) =
                    (&config.connection.server, &config.connection.database)
                {
                    config.qualified_name_prefix =
                        Some(format!("{}://{}/{}", config.source_type, server, database));
                }
            }

            info!("Creating connector for {} database...", config.source_type);
            Ok(DatabaseConnector::new(catalog, config)?.into())
        }
        Commands::Filesystem {
            root,
            extensions,
            recursive,
            collection,
            prefix,
        } => {
            let mut config = file_config
                .filesystem
                .unwrap_or_else(|| FilesystemConfig::new("./sample_data"));
            if let Some(root) = root {
                config.root_path = root;
            }
            let extensions: Vec<String> = extensions
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if !extensions.is_empty() {
                config.file_extensions = Some(extensions);
            }
            if let Some(recursive) = recursive {
                config.recursive = recursive;
            }
            override_some(&mut config.collection_name, collection);
            override_some(&mut config.qualified_name_prefix, prefix);
            config
                .collection_name
                .get_or_insert_with(|| constants::FILESYSTEM_DEFAULT_COLLECTION.to_string());

            info!(
                recursive = config.recursive,
                "Scanning directory: {}",
                config.root_path.display()
            );
            Ok(FilesystemConnector::new(catalog, config)?.into())
        }
        Commands::Api {
            endpoint,
            collection,
            prefix,
        } => {
            let mut config = match (file_config.api, endpoint) {
                (Some(mut config), Some(endpoint)) => {
                    config.api_endpoint = endpoint;
                    config
                }
                (Some(config), None) => config,
                (None, Some(endpoint)) => ApiConfig::new(endpoint),
                (None, None) => {
                    return Err(ConnectorError::Configuration(
                        "api endpoint required (--endpoint, API_ENDPOINT or [api] section)"
                            .to_string(),
                    ))
                }
            };
            override_some(&mut config.collection_name, collection);
            override_some(&mut config.qualified_name_prefix, prefix);

            Ok(ApiConnector::new(catalog, config)?.into())
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => AppConfig::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?,
        None => AppConfig::default(),
    };

    let catalog: Arc<dyn Catalog> = if cli.in_memory {
        info!("Using in-memory catalog");
        Arc::new(InMemoryCatalog::new())
    } else {
        let options = file_config.purview.merge_into(ClientOptions::from_env());
        let client = PurviewClient::new(options).context("initializing Purview client")?;
        let account = client.get_account_info();
        info!(
            account = account.name.as_deref().unwrap_or("-"),
            status = %account.status,
            "Connected to Purview: {}",
            account.endpoint
        );
        Arc::new(client)
    };

    let connector = build_connector(cli.command, file_config, catalog)?;
    info!(
        connector = connector.name(),
        supported = ?constants::get_supported_connectors(),
        "Starting scan and ingest"
    );

    let summary = connector.scan_and_ingest().await?;
    info!(
        status = %summary.status,
        extracted = summary.entities_extracted,
        created = summary.entities_created,
        "Ingestion results"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let _guard = match logging::init_logging(&cli.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("⚠️  Logging disabled: {}", e);
            None
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Scan failed: {:#}", e);
            eprintln!("❌ {:#}", e);
            let code = e
                .downcast_ref::<ConnectorError>()
                .map(ConnectorError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
