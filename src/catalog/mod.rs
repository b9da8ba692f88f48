pub mod in_memory;
pub mod purview;

use crate::error::Result;
use crate::models::{AtlasEntity, AtlasRelationship, Attributes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use in_memory::InMemoryCatalog;
pub use purview::{AccountInfo, ClientOptions, PurviewClient};

pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_LINEAGE_DEPTH: u32 = 3;

/// Response of a bulk entity create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateResult {
    pub entities_created: usize,
    pub status: String,
}

/// Free-text search over catalog entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub filters: Attributes,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
            filters: Attributes::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Restrict results to entities whose attribute `key` equals `value`.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub total: usize,
    pub results: Vec<AtlasEntity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineageDirection {
    Input,
    Output,
    #[default]
    Both,
}

impl fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineageDirection::Input => "INPUT",
            LineageDirection::Output => "OUTPUT",
            LineageDirection::Both => "BOTH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageResult {
    pub guid: String,
    pub direction: LineageDirection,
    pub depth: u32,
    pub lineage: serde_json::Value,
}

/// Operations against the catalog's entity, relationship, search and lineage APIs.
///
/// Implementations are expected to treat the qualified name as the identity of
/// an entity: re-creating an existing qualified name updates it.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn create_entity(&self, entity: &AtlasEntity) -> Result<AtlasEntity>;

    async fn bulk_create_entities(&self, entities: &[AtlasEntity]) -> Result<BulkCreateResult>;

    async fn get_entity(&self, guid: &str) -> Result<Option<AtlasEntity>>;

    async fn update_entity(&self, guid: &str, entity: &AtlasEntity) -> Result<AtlasEntity>;

    async fn delete_entity(&self, guid: &str) -> Result<()>;

    async fn search_entities(&self, request: &SearchRequest) -> Result<SearchResults>;

    async fn create_relationship(
        &self,
        relationship: &AtlasRelationship,
    ) -> Result<AtlasRelationship>;

    async fn get_lineage(
        &self,
        guid: &str,
        direction: LineageDirection,
        depth: u32,
    ) -> Result<LineageResult>;
}
