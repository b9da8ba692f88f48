use super::{Attributes, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const QUALIFIED_NAME_KEY: &str = "qualifiedName";
pub const NAME_KEY: &str = "name";

/// Well-known Atlas type names used by the bundled connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    DataSet,
    Process,
    RdbmsDb,
    RdbmsTable,
    RdbmsColumn,
    FsPath,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::DataSet => "DataSet",
            EntityType::Process => "Process",
            EntityType::RdbmsDb => "rdbms_db",
            EntityType::RdbmsTable => "rdbms_table",
            EntityType::RdbmsColumn => "rdbms_column",
            EntityType::FsPath => "fs_path",
        }
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

/// Entity record in the Atlas wire format.
///
/// Fields are optional so that records coming from a transform step (or a
/// catalog response) can be checked for completeness before ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<i64>,
}

impl AtlasEntity {
    pub fn qualified_name(&self) -> Option<&str> {
        self.attribute_str(QUALIFIED_NAME_KEY)
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute_str(NAME_KEY)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.as_ref().and_then(|attrs| attrs.get(key))
    }

    fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }
}

/// A catalog asset as seen by connector code.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub type_name: String,
    pub qualified_name: String,
    pub name: String,
    pub attributes: Attributes,
    pub guid: Option<String>,
    pub status: Status,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl Entity {
    pub fn new(
        type_name: impl Into<String>,
        qualified_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            qualified_name: qualified_name.into(),
            name: name.into(),
            attributes: Attributes::new(),
            guid: None,
            status: Status::Active,
            created_by: None,
            updated_by: None,
            create_time: None,
            update_time: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Convert to the Atlas wire format.
    ///
    /// `qualifiedName` and `name` are written after the open attributes, so they
    /// win over same-named keys in `attributes`.
    pub fn to_atlas(&self) -> AtlasEntity {
        let mut attributes = self.attributes.clone();
        attributes.insert(
            QUALIFIED_NAME_KEY.to_string(),
            Value::String(self.qualified_name.clone()),
        );
        attributes.insert(NAME_KEY.to_string(), Value::String(self.name.clone()));

        AtlasEntity {
            type_name: Some(self.type_name.clone()),
            attributes: Some(attributes),
            status: Some(self.status),
            guid: self.guid.clone(),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
            create_time: self.create_time,
            update_time: self.update_time,
        }
    }

    /// Rebuild an entity from a catalog response. Missing fields fall back to
    /// empty strings and `ACTIVE`.
    pub fn from_atlas(data: &AtlasEntity) -> Self {
        let attributes = data.attributes.clone().unwrap_or_default();

        Self {
            type_name: data.type_name.clone().unwrap_or_default(),
            qualified_name: data.qualified_name().unwrap_or_default().to_string(),
            name: data.name().unwrap_or_default().to_string(),
            attributes: attributes
                .into_iter()
                .filter(|(k, _)| k != QUALIFIED_NAME_KEY && k != NAME_KEY)
                .collect(),
            guid: data.guid.clone(),
            status: data.status.unwrap_or_default(),
            created_by: data.created_by.clone(),
            updated_by: data.updated_by.clone(),
            create_time: data.create_time,
            update_time: data.update_time,
        }
    }
}

impl From<&Entity> for AtlasEntity {
    fn from(entity: &Entity) -> Self {
        entity.to_atlas()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_identity_fields() {
        let entity = Entity::new(EntityType::RdbmsColumn, "db://sales/dbo/customers/id", "id")
            .with_attribute("data_type", "int")
            .with_attribute("isNullable", false);

        let back = Entity::from_atlas(&entity.to_atlas());

        assert_eq!(back.type_name, "rdbms_column");
        assert_eq!(back.qualified_name, "db://sales/dbo/customers/id");
        assert_eq!(back.name, "id");
        assert_eq!(back.attributes, entity.attributes);
        assert_eq!(back.guid, None);
        assert_eq!(back.status, Status::Active);
    }

    #[test]
    fn test_promoted_keys_win_over_attributes() {
        let entity = Entity::new("DataSet", "api://real", "real")
            .with_attribute("qualifiedName", "api://shadow")
            .with_attribute("name", "shadow");

        let atlas = entity.to_atlas();
        assert_eq!(atlas.qualified_name(), Some("api://real"));
        assert_eq!(atlas.name(), Some("real"));

        let back = Entity::from_atlas(&atlas);
        assert_eq!(back.qualified_name, "api://real");
        assert!(back.attributes.is_empty());
    }

    #[test]
    fn test_wire_shape_omits_absent_guid() {
        let entity = Entity::new("fs_path", "fs://data", "data");
        let wire = serde_json::to_value(entity.to_atlas()).unwrap();

        assert_eq!(
            wire,
            json!({
                "typeName": "fs_path",
                "attributes": { "qualifiedName": "fs://data", "name": "data" },
                "status": "ACTIVE"
            })
        );
    }

    #[test]
    fn test_from_catalog_response_with_guid_and_deleted_status() {
        let response: AtlasEntity = serde_json::from_value(json!({
            "typeName": "rdbms_table",
            "guid": "7f1c",
            "status": "DELETED",
            "createdBy": "scanner",
            "attributes": { "qualifiedName": "db://x/t", "name": "t", "owner": "ops" }
        }))
        .unwrap();

        let entity = Entity::from_atlas(&response);
        assert_eq!(entity.guid.as_deref(), Some("7f1c"));
        assert_eq!(entity.status, Status::Deleted);
        assert_eq!(entity.created_by.as_deref(), Some("scanner"));
        assert_eq!(entity.attributes.get("owner"), Some(&json!("ops")));
    }

    #[test]
    fn test_from_empty_response_uses_defaults() {
        let entity = Entity::from_atlas(&AtlasEntity::default());
        assert_eq!(entity.type_name, "");
        assert_eq!(entity.qualified_name, "");
        assert_eq!(entity.status, Status::Active);
    }
}
