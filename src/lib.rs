//! Building blocks for Microsoft Purview metadata connectors.
//!
//! A connector extracts metadata from a source, transforms it into Atlas
//! entity records and hands them to a [`catalog::Catalog`]. The shared
//! orchestration lives in [`pipeline`]; the bundled sources live in
//! [`connectors`].

pub mod auth;
pub mod catalog;
pub mod config;
pub mod connectors;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;

pub use catalog::{Catalog, ClientOptions, InMemoryCatalog, PurviewClient};
pub use connectors::{ApiConnector, DatabaseConnector, FilesystemConnector, SourceConnector};
pub use error::{ConnectorError, Result};
pub use models::{AtlasEntity, Entity, EntityType, Relationship, Status};
pub use pipeline::{scan_and_ingest, Connector, ConnectorBase, ScanSummary};
