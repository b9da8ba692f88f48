use super::{
    BulkCreateResult, Catalog, LineageDirection, LineageResult, SearchRequest, SearchResults,
};
use crate::error::{ConnectorError, Result};
use crate::models::{AtlasEntity, AtlasRelationship, Status};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// The non-empty string `qualifiedName` an entity is keyed by.
fn storable_qualified_name(entity: &AtlasEntity) -> Result<&str> {
    entity
        .qualified_name()
        .filter(|qn| !qn.is_empty())
        .ok_or_else(|| ConnectorError::Ingestion("entity has no qualifiedName".to_string()))
}

#[derive(Default)]
struct State {
    entities: HashMap<String, AtlasEntity>,
    guid_by_qualified_name: HashMap<String, String>,
    // creation order, for stable search results
    order: Vec<String>,
    relationships: HashMap<String, AtlasRelationship>,
    bulk_create_calls: usize,
}

impl State {
    /// Insert or update by qualified name. Returns the stored record and
    /// whether it was newly created.
    fn upsert(&mut self, entity: &AtlasEntity) -> Result<(AtlasEntity, bool)> {
        let qualified_name = storable_qualified_name(entity)?.to_string();
        let now = Utc::now().timestamp_millis();

        if let Some(guid) = self.guid_by_qualified_name.get(&qualified_name).cloned() {
            let existing = self.entities.get(&guid).cloned().unwrap_or_default();
            let mut updated = entity.clone();
            updated.guid = Some(guid.clone());
            updated.status = Some(entity.status.unwrap_or_default());
            updated.created_by = existing.created_by;
            updated.create_time = existing.create_time;
            updated.update_time = Some(now);
            self.entities.insert(guid.clone(), updated.clone());
            debug!("Updated entity {} ({})", qualified_name, guid);
            return Ok((updated, false));
        }

        let guid = Uuid::new_v4().to_string();
        let mut created = entity.clone();
        created.guid = Some(guid.clone());
        created.status = Some(entity.status.unwrap_or_default());
        created.create_time = Some(now);
        created.update_time = Some(now);
        self.guid_by_qualified_name
            .insert(qualified_name.clone(), guid.clone());
        self.entities.insert(guid.clone(), created.clone());
        self.order.push(guid.clone());
        debug!("Created entity {} ({})", qualified_name, guid);
        Ok((created, true))
    }

    fn require_entity(&self, guid: &str) -> Result<&AtlasEntity> {
        self.entities
            .get(guid)
            .ok_or_else(|| ConnectorError::Ingestion(format!("entity {} not found", guid)))
    }
}

/// Catalog kept in process memory, for development and tests.
///
/// Behaves like the real catalog where it matters to connectors: guids are
/// assigned on create, qualified names are unique, deletes are soft and
/// relationships must point at existing entities.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| ConnectorError::Ingestion("catalog state lock poisoned".to_string()))
    }

    /// Number of `bulk_create_entities` calls seen so far.
    pub fn bulk_create_calls(&self) -> usize {
        self.state().map(|s| s.bulk_create_calls).unwrap_or_default()
    }

    pub fn entity_count(&self) -> usize {
        self.state().map(|s| s.entities.len()).unwrap_or_default()
    }

    pub fn find_by_qualified_name(&self, qualified_name: &str) -> Option<AtlasEntity> {
        let state = self.state().ok()?;
        let guid = state.guid_by_qualified_name.get(qualified_name)?;
        state.entities.get(guid).cloned()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn create_entity(&self, entity: &AtlasEntity) -> Result<AtlasEntity> {
        let mut state = self.state()?;
        state.upsert(entity).map(|(stored, _)| stored)
    }

    async fn bulk_create_entities(&self, entities: &[AtlasEntity]) -> Result<BulkCreateResult> {
        let mut state = self.state()?;
        state.bulk_create_calls += 1;

        // reject the whole batch before any record is written
        for entity in entities {
            storable_qualified_name(entity)?;
        }

        let mut created = 0;
        for entity in entities {
            if state.upsert(entity)?.1 {
                created += 1;
            }
        }
        debug!(
            "Bulk create stored {} entities ({} new)",
            entities.len(),
            created
        );

        Ok(BulkCreateResult {
            entities_created: created,
            status: "success".to_string(),
        })
    }

    async fn get_entity(&self, guid: &str) -> Result<Option<AtlasEntity>> {
        Ok(self.state()?.entities.get(guid).cloned())
    }

    async fn update_entity(&self, guid: &str, entity: &AtlasEntity) -> Result<AtlasEntity> {
        let mut state = self.state()?;
        let existing = state.require_entity(guid)?.clone();

        let old_qn = existing.qualified_name().unwrap_or_default().to_string();
        let new_qn = entity.qualified_name().unwrap_or(&old_qn).to_string();
        if new_qn != old_qn {
            if let Some(owner) = state.guid_by_qualified_name.get(&new_qn) {
                return Err(ConnectorError::Ingestion(format!(
                    "qualifiedName {} already belongs to entity {}",
                    new_qn, owner
                )));
            }
            state.guid_by_qualified_name.remove(&old_qn);
            state
                .guid_by_qualified_name
                .insert(new_qn.clone(), guid.to_string());
        }

        let mut updated = entity.clone();
        if updated.qualified_name().is_none() {
            updated
                .attributes
                .get_or_insert_with(Default::default)
                .insert("qualifiedName".to_string(), Value::String(old_qn));
        }
        updated.guid = Some(guid.to_string());
        updated.status = Some(entity.status.or(existing.status).unwrap_or_default());
        updated.created_by = existing.created_by;
        updated.create_time = existing.create_time;
        updated.update_time = Some(Utc::now().timestamp_millis());
        state.entities.insert(guid.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete_entity(&self, guid: &str) -> Result<()> {
        let mut state = self.state()?;
        state.require_entity(guid)?;
        if let Some(entity) = state.entities.get_mut(guid) {
            entity.status = Some(Status::Deleted);
            entity.update_time = Some(Utc::now().timestamp_millis());
        }
        debug!("Soft-deleted entity {}", guid);
        Ok(())
    }

    async fn search_entities(&self, request: &SearchRequest) -> Result<SearchResults> {
        let state = self.state()?;
        let needle = request.query.to_lowercase();

        let matches: Vec<&AtlasEntity> = state
            .order
            .iter()
            .filter_map(|guid| state.entities.get(guid))
            .filter(|e| e.status != Some(Status::Deleted))
            .filter(|e| {
                needle.is_empty()
                    || e.qualified_name()
                        .is_some_and(|qn| qn.to_lowercase().contains(&needle))
                    || e.name()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .filter(|e| {
                request
                    .filters
                    .iter()
                    .all(|(k, v)| e.attribute(k) == Some(v))
            })
            .collect();

        Ok(SearchResults {
            query: request.query.clone(),
            total: matches.len(),
            results: matches
                .into_iter()
                .skip(request.offset)
                .take(request.limit)
                .cloned()
                .collect(),
        })
    }

    async fn create_relationship(
        &self,
        relationship: &AtlasRelationship,
    ) -> Result<AtlasRelationship> {
        let mut state = self.state()?;
        state.require_entity(&relationship.end1.guid)?;
        state.require_entity(&relationship.end2.guid)?;

        let mut stored = relationship.clone();
        let guid = stored
            .guid
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        state.relationships.insert(guid.clone(), stored.clone());
        debug!(
            "Created relationship {} {} -> {}",
            guid, relationship.end1.guid, relationship.end2.guid
        );
        Ok(stored)
    }

    /// Walks active relationships breadth-first from `guid`. `end1` is treated
    /// as upstream of `end2`.
    async fn get_lineage(
        &self,
        guid: &str,
        direction: LineageDirection,
        depth: u32,
    ) -> Result<LineageResult> {
        let state = self.state()?;
        state.require_entity(guid)?;

        let active: Vec<(&String, &AtlasRelationship)> = state
            .relationships
            .iter()
            .filter(|(_, r)| r.status == Status::Active)
            .collect();

        let mut seen_entities: HashSet<String> = HashSet::from([guid.to_string()]);
        let mut seen_relations: HashSet<&String> = HashSet::new();
        let mut relations = Vec::new();
        let mut queue = VecDeque::from([(guid.to_string(), 0u32)]);

        while let Some((current, level)) = queue.pop_front() {
            if level >= depth {
                continue;
            }
            for (rel_guid, rel) in &active {
                let next = match direction {
                    LineageDirection::Output if rel.end1.guid == current => &rel.end2.guid,
                    LineageDirection::Input if rel.end2.guid == current => &rel.end1.guid,
                    LineageDirection::Both if rel.end1.guid == current => &rel.end2.guid,
                    LineageDirection::Both if rel.end2.guid == current => &rel.end1.guid,
                    _ => continue,
                };
                if seen_relations.insert(*rel_guid) {
                    relations.push(json!({
                        "fromEntityId": rel.end1.guid,
                        "toEntityId": rel.end2.guid,
                        "relationshipId": rel_guid,
                    }));
                }
                if seen_entities.insert(next.clone()) {
                    queue.push_back((next.clone(), level + 1));
                }
            }
        }

        let mut guid_entity_map = serde_json::Map::new();
        for entity_guid in &seen_entities {
            if let Some(entity) = state.entities.get(entity_guid) {
                guid_entity_map.insert(entity_guid.clone(), serde_json::to_value(entity)?);
            }
        }

        Ok(LineageResult {
            guid: guid.to_string(),
            direction,
            depth,
            lineage: json!({
                "baseEntityGuid": guid,
                "relations": relations,
                "guidEntityMap": guid_entity_map,
            }),
        })
    }
}
