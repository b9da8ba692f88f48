use purview_connector_sdk::auth::StaticTokenCredential;
use purview_connector_sdk::catalog::{Catalog, LineageDirection, SearchRequest};
use purview_connector_sdk::connectors::{DatabaseConfig, DatabaseKind};
use purview_connector_sdk::models::Relationship;
use purview_connector_sdk::{
    scan_and_ingest, ClientOptions, ConnectorError, DatabaseConnector, InMemoryCatalog,
    PurviewClient, Status,
};
use serde_json::json;
use std::sync::Arc;

async fn scanned_catalog() -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut config = DatabaseConfig::new(DatabaseKind::SqlServer);
    config.qualified_name_prefix = Some("mssql://db01".to_string());
    let connector = DatabaseConnector::new(catalog.clone(), config).unwrap();
    scan_and_ingest(&connector).await.unwrap();
    catalog
}

fn guid_of(catalog: &InMemoryCatalog, qualified_name: &str) -> String {
    catalog
        .find_by_qualified_name(qualified_name)
        .and_then(|e| e.guid)
        .unwrap()
}

#[tokio::test]
async fn test_search_scanned_columns_by_type() {
    let catalog = scanned_catalog().await;

    let columns = catalog
        .search_entities(&SearchRequest::new("customers").with_filter("data_type", "varchar"))
        .await
        .unwrap();
    assert_eq!(columns.total, 2);

    let page = catalog
        .search_entities(&SearchRequest::new("mssql://db01").with_offset(1).with_limit(2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.results.len(), 2);
    assert_eq!(
        page.results[0].qualified_name(),
        Some("mssql://db01/sample_database/dbo/customers")
    );
}

#[tokio::test]
async fn test_lineage_between_scanned_entities() {
    let catalog = scanned_catalog().await;
    let db = guid_of(&catalog, "mssql://db01/sample_database");
    let table = guid_of(&catalog, "mssql://db01/sample_database/dbo/customers");
    let column = guid_of(&catalog, "mssql://db01/sample_database/dbo/customers/id");

    for (from, to) in [(&db, &table), (&table, &column)] {
        catalog
            .create_relationship(&Relationship::new("contains", from, to).to_atlas())
            .await
            .unwrap();
    }

    let downstream = catalog
        .get_lineage(&db, LineageDirection::Output, 3)
        .await
        .unwrap();
    assert_eq!(downstream.lineage["relations"].as_array().unwrap().len(), 2);
    assert!(downstream.lineage["guidEntityMap"].get(&column).is_some());

    let one_hop = catalog
        .get_lineage(&db, LineageDirection::Output, 1)
        .await
        .unwrap();
    assert_eq!(one_hop.lineage["relations"].as_array().unwrap().len(), 1);

    let upstream = catalog
        .get_lineage(&db, LineageDirection::Input, 3)
        .await
        .unwrap();
    assert_eq!(upstream.lineage["relations"], json!([]));
}

#[tokio::test]
async fn test_deleted_entity_stays_retrievable() {
    let catalog = scanned_catalog().await;
    let column = guid_of(&catalog, "mssql://db01/sample_database/dbo/customers/email");

    catalog.delete_entity(&column).await.unwrap();

    let stored = catalog.get_entity(&column).await.unwrap().unwrap();
    assert_eq!(stored.status, Some(Status::Deleted));
    let search = catalog
        .search_entities(&SearchRequest::new("email"))
        .await
        .unwrap();
    assert_eq!(search.total, 0);
}

#[tokio::test]
async fn test_relationship_to_unknown_entity_is_rejected() {
    let catalog = scanned_catalog().await;
    let db = guid_of(&catalog, "mssql://db01/sample_database");

    let err = catalog
        .create_relationship(&Relationship::new("contains", &db, "missing").to_atlas())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Ingestion(_)));
}

#[tokio::test]
async fn test_purview_client_requires_account_or_endpoint() {
    let err = PurviewClient::new(ClientOptions::default()).unwrap_err();
    assert!(matches!(err, ConnectorError::Authentication(_)));
    assert_eq!(err.exit_code(), 3);

    let client = PurviewClient::new(ClientOptions {
        account_name: Some("contoso".to_string()),
        credential: Some(Arc::new(StaticTokenCredential::new("token"))),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(client.endpoint(), "https://contoso.purview.azure.com");
    assert_eq!(client.get_access_token().await.unwrap(), "token");
}
