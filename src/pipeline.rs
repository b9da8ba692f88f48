use crate::catalog::{BulkCreateResult, Catalog};
use crate::error::{ConnectorError, Result};
use crate::models::AtlasEntity;
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_COLLECTION: &str = "default";

/// State shared by every connector: the catalog it writes to, the target
/// collection and the prefix for qualified names.
#[derive(Clone)]
pub struct ConnectorBase {
    catalog: Arc<dyn Catalog>,
    collection_name: String,
    qualified_name_prefix: String,
}

impl ConnectorBase {
    /// `connector_name` seeds the default prefix (`<connector_name>://`).
    pub fn new(
        catalog: Arc<dyn Catalog>,
        connector_name: &str,
        collection_name: Option<String>,
        qualified_name_prefix: Option<String>,
    ) -> Self {
        let qualified_name_prefix = qualified_name_prefix
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("{}://", connector_name.to_lowercase()));
        let collection_name = collection_name
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        info!(
            connector = connector_name,
            collection = %collection_name,
            prefix = %qualified_name_prefix,
            "Initialized connector"
        );

        Self {
            catalog,
            collection_name,
            qualified_name_prefix,
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn qualified_name_prefix(&self) -> &str {
        &self.qualified_name_prefix
    }

    /// Build a qualified name from path segments.
    ///
    /// Each part is stripped of leading and trailing `/`; parts that end up
    /// empty are skipped. Optional parts can be passed through `.flatten()`.
    pub fn create_qualified_name<I, S>(&self, parts: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = parts
            .into_iter()
            .map(|p| p.as_ref().trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        let prefix = &self.qualified_name_prefix;
        if path.is_empty() || prefix.ends_with('/') {
            format!("{}{}", prefix, path)
        } else {
            format!("{}/{}", prefix, path)
        }
    }
}

/// A metadata source that can be scanned into catalog entities.
///
/// Implementors supply extraction and transformation; validation, ingestion
/// and orchestration live in this module and are shared.
#[async_trait]
pub trait Connector: Send + Sync {
    type Metadata: Serialize + Send + Sync;

    /// Short identifier used in logs and metric labels.
    fn name(&self) -> &'static str;

    fn base(&self) -> &ConnectorBase;

    /// Pull raw facts from the source.
    async fn extract_metadata(&self) -> Result<Self::Metadata>;

    /// Map extracted metadata to Atlas entity records. Must be deterministic.
    fn transform_to_atlas(&self, metadata: &Self::Metadata) -> Result<Vec<AtlasEntity>>;
}

/// Outcome of [`scan_and_ingest`].
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary<M> {
    pub status: String,
    pub entities_extracted: usize,
    pub entities_created: usize,
    pub metadata: M,
}

impl<M> ScanSummary<M> {
    pub fn map_metadata<N>(self, f: impl FnOnce(M) -> N) -> ScanSummary<N> {
        ScanSummary {
            status: self.status,
            entities_extracted: self.entities_extracted,
            entities_created: self.entities_created,
            metadata: f(self.metadata),
        }
    }
}

/// Check that every record carries `typeName`, `attributes` and
/// `attributes.qualifiedName`. The first violation rejects the whole batch.
pub fn validate_entities(entities: &[AtlasEntity]) -> Result<()> {
    for (index, entity) in entities.iter().enumerate() {
        if entity.type_name.as_deref().map_or(true, str::is_empty) {
            return Err(ConnectorError::Validation(format!(
                "entity {} missing typeName",
                index
            )));
        }
        let attributes = entity.attributes.as_ref().ok_or_else(|| {
            ConnectorError::Validation(format!("entity {} missing attributes", index))
        })?;
        if !attributes.contains_key("qualifiedName") {
            return Err(ConnectorError::Validation(format!(
                "entity {} ({}) missing qualifiedName",
                index,
                entity.type_name.as_deref().unwrap_or_default()
            )));
        }
    }
    Ok(())
}

/// Validate, then hand the batch to the catalog in one bulk call. The catalog
/// response is returned unchanged.
#[instrument(skip(catalog, entities), fields(count = entities.len()))]
pub async fn ingest_to_purview(
    catalog: &dyn Catalog,
    entities: &[AtlasEntity],
) -> Result<BulkCreateResult> {
    validate_entities(entities)?;
    warn_on_duplicate_names(entities);

    info!("Ingesting {} entities to Purview", entities.len());
    let result = catalog.bulk_create_entities(entities).await?;
    info!(
        created = result.entities_created,
        status = %result.status,
        "Ingestion complete"
    );
    Ok(result)
}

fn warn_on_duplicate_names(entities: &[AtlasEntity]) {
    let mut seen = HashSet::new();
    for qn in entities.iter().filter_map(AtlasEntity::qualified_name) {
        if !seen.insert(qn) {
            warn!("Duplicate qualifiedName in batch: {}", qn);
        }
    }
}

fn stage_failed(connector: &'static str, stage: &'static str, e: ConnectorError) -> ConnectorError {
    error!(connector, stage, "Scan stage failed: {}", e);
    counter!("purview_scan_failures_total", "connector" => connector, "stage" => stage)
        .increment(1);
    e
}

/// Run extract, transform and ingest in order for one connector.
///
/// The first failing stage aborts the scan; nothing is retried and nothing is
/// partially committed.
#[instrument(skip(connector), fields(connector = connector.name()))]
pub async fn scan_and_ingest<C: Connector>(connector: &C) -> Result<ScanSummary<C::Metadata>> {
    let name = connector.name();
    info!("Starting scan and ingest workflow");
    counter!("purview_scan_runs_total", "connector" => name).increment(1);
    let started = std::time::Instant::now();

    info!("Extracting metadata...");
    let metadata = connector
        .extract_metadata()
        .await
        .map_err(|e| stage_failed(name, "extract", e))?;

    info!("Transforming to Atlas format...");
    let entities = connector
        .transform_to_atlas(&metadata)
        .map_err(|e| stage_failed(name, "transform", e))?;
    info!("Transformed {} entities", entities.len());
    counter!("purview_entities_extracted_total", "connector" => name)
        .increment(entities.len() as u64);

    info!("Ingesting to Purview...");
    let result = ingest_to_purview(connector.base().catalog(), &entities)
        .await
        .map_err(|e| stage_failed(name, "ingest", e))?;
    counter!("purview_entities_created_total", "connector" => name)
        .increment(result.entities_created as u64);

    histogram!("purview_scan_duration_seconds", "connector" => name)
        .record(started.elapsed().as_secs_f64());
    info!("Scan and ingest workflow complete");

    Ok(ScanSummary {
        status: "success".to_string(),
        entities_extracted: entities.len(),
        entities_created: result.entities_created,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::models::{Attributes, Entity};
    use serde_json::json;

    fn base(prefix: Option<&str>) -> ConnectorBase {
        ConnectorBase::new(
            Arc::new(InMemoryCatalog::new()),
            "DatabaseConnector",
            None,
            prefix.map(str::to_string),
        )
    }

    #[test]
    fn test_default_prefix_and_collection() {
        let base = base(None);
        assert_eq!(base.qualified_name_prefix(), "databaseconnector://");
        assert_eq!(base.collection_name(), "default");
    }

    #[test]
    fn test_qualified_name_skips_empty_parts() {
        let base = base(None);
        let with_gaps = base.create_qualified_name(
            [Some("a"), Some(""), None, Some("b")].into_iter().flatten(),
        );
        assert_eq!(with_gaps, base.create_qualified_name(["a", "b"]));
        assert_eq!(with_gaps, "databaseconnector://a/b");
    }

    #[test]
    fn test_qualified_name_strips_slashes() {
        let base = base(None);
        assert_eq!(
            base.create_qualified_name(["/data/", "sub/", "/file.csv"]),
            "databaseconnector://data/sub/file.csv"
        );
        assert_eq!(base.create_qualified_name(["/", "x"]), "databaseconnector://x");
    }

    #[test]
    fn test_custom_prefix_gets_separator() {
        let base = base(Some("sql_server://db01/sales"));
        assert_eq!(
            base.create_qualified_name(["dbo", "orders"]),
            "sql_server://db01/sales/dbo/orders"
        );
        assert_eq!(base.create_qualified_name(Vec::<String>::new()), "sql_server://db01/sales");
    }

    #[test]
    fn test_validation_accepts_complete_records() {
        let entities = vec![Entity::new("DataSet", "x://a", "a").to_atlas()];
        assert!(validate_entities(&entities).is_ok());
        assert!(validate_entities(&[]).is_ok());
    }

    #[test]
    fn test_validation_rejects_each_missing_field() {
        let complete = Entity::new("DataSet", "x://a", "a").to_atlas();

        let mut no_type = complete.clone();
        no_type.type_name = None;
        let mut empty_type = complete.clone();
        empty_type.type_name = Some(String::new());
        let mut no_attrs = complete.clone();
        no_attrs.attributes = None;
        let mut no_qn = complete.clone();
        no_qn.attributes = Some(Attributes::from_iter([("name".to_string(), json!("a"))]));

        for bad in [no_type, empty_type, no_attrs, no_qn] {
            let batch = vec![complete.clone(), bad];
            let err = validate_entities(&batch).unwrap_err();
            assert!(matches!(err, ConnectorError::Validation(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_ingest_skips_catalog_on_invalid_batch() {
        let catalog = InMemoryCatalog::new();
        let mut bad = Entity::new("DataSet", "x://a", "a").to_atlas();
        bad.attributes.as_mut().unwrap().remove("qualifiedName");

        let good = Entity::new("DataSet", "x://b", "b").to_atlas();
        assert!(ingest_to_purview(&catalog, &[good, bad]).await.is_err());
        assert_eq!(catalog.bulk_create_calls(), 0);
        assert_eq!(catalog.entity_count(), 0);
    }

    #[tokio::test]
    async fn test_ingest_returns_catalog_result() {
        let catalog = InMemoryCatalog::new();
        let entities = vec![
            Entity::new("DataSet", "x://a", "a").to_atlas(),
            Entity::new("DataSet", "x://b", "b").to_atlas(),
        ];
        let result = ingest_to_purview(&catalog, &entities).await.unwrap();
        assert_eq!(result.entities_created, 2);
        assert_eq!(result.status, "success");
    }
}
