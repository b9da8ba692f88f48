use super::{Attributes, Status};
use serde::{Deserialize, Serialize};

/// One end of a relationship on the wire: `{"guid": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEnd {
    #[serde(default)]
    pub guid: String,
}

/// Relationship record in the Atlas wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasRelationship {
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub end1: RelationshipEnd,
    #[serde(default)]
    pub end2: RelationshipEnd,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Link between two catalog entities, addressed by their catalog guids.
///
/// Both ends must already exist in the catalog; build relationships only after
/// the endpoint entities have been ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub type_name: String,
    pub end1_guid: String,
    pub end2_guid: String,
    pub guid: Option<String>,
    pub status: Status,
    pub attributes: Attributes,
}

impl Relationship {
    pub fn new(
        type_name: impl Into<String>,
        end1_guid: impl Into<String>,
        end2_guid: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            end1_guid: end1_guid.into(),
            end2_guid: end2_guid.into(),
            guid: None,
            status: Status::Active,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn to_atlas(&self) -> AtlasRelationship {
        AtlasRelationship {
            type_name: self.type_name.clone(),
            end1: RelationshipEnd {
                guid: self.end1_guid.clone(),
            },
            end2: RelationshipEnd {
                guid: self.end2_guid.clone(),
            },
            status: self.status,
            guid: self.guid.clone(),
            attributes: self.attributes.clone(),
        }
    }

    pub fn from_atlas(data: &AtlasRelationship) -> Self {
        Self {
            type_name: data.type_name.clone(),
            end1_guid: data.end1.guid.clone(),
            end2_guid: data.end2.guid.clone(),
            guid: data.guid.clone(),
            status: data.status,
            attributes: data.attributes.clone(),
        }
    }
}
