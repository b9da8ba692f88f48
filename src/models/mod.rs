pub mod entity;
pub mod relationship;

use serde::{Deserialize, Serialize};

pub use entity::{AtlasEntity, Entity, EntityType};
pub use relationship::{AtlasRelationship, Relationship, RelationshipEnd};

/// Open attribute bag carried by entities and relationships.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status shared by entities and relationships.
///
/// `Deleted` is a soft-delete marker; the record stays in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Active,
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
