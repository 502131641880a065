//! Integration tests for cypherlink-graph against a live Neo4j instance.
//!
//! These tests need a reachable server (settings from `cypherlink.toml` or
//! `CYPHERLINK__NEO4J__*`) and write throwaway nodes tagged with a per-test
//! marker label. Run with:
//! cargo test --package cypherlink-graph --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use std::time::{SystemTime, UNIX_EPOCH};

use cypherlink_core::{ConnectorConfig, GraphValue, Params};
use cypherlink_graph::{Connector, Page};

async fn connect_or_skip() -> Option<Connector> {
    let config = ConnectorConfig::load("cypherlink").unwrap_or_default();
    match Connector::connect(&config).await {
        Ok(connector) => Some(connector),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

/// A label unique to one test run, so parallel tests never see each other.
fn marker(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}{nanos}")
}

async fn cleanup(connector: &Connector, label: &str) {
    let _ = connector
        .execute_query(&format!("MATCH (n:{label}) DETACH DELETE n"), Params::new())
        .await;
}

#[tokio::test]
#[ignore = "requires live Neo4j: run with cargo test --package cypherlink-graph --test integration -- --ignored"]
async fn test_schema_infers_person_knows_person() {
    let Some(connector) = connect_or_skip().await else {
        return;
    };
    let tag = marker("ItPerson");

    connector
        .execute_query(
            &format!(
                "CREATE (a:Person:{tag} {{name: 'a', age: 1}}),
                        (b:Person:{tag} {{name: 'b', age: 2}}),
                        (c:Person:{tag} {{name: 'c', age: 3}}),
                        (d:Person:{tag} {{name: 'd'}}),
                        (a)-[:KNOWS]->(b), (b)-[:KNOWS]->(c)"
            ),
            Params::new(),
        )
        .await
        .unwrap();

    let schema = connector.get_graph_schema().await.unwrap();

    let person = schema.entity("Person").unwrap();
    assert!(person.attributes.contains("name"));
    assert!(person.attributes.contains("age"));
    assert!(person.relations.contains("KNOWS"));

    let marker_entity = schema.entity(&tag).unwrap();
    assert_eq!(
        marker_entity.attributes.iter().collect::<Vec<_>>(),
        vec!["age", "name"]
    );

    cleanup(&connector, &tag).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_paginated_query_with_total() {
    let Some(connector) = connect_or_skip().await else {
        return;
    };
    let tag = marker("ItPage");

    let mut params = Params::new();
    params.insert(
        "names".to_string(),
        GraphValue::from(vec!["a", "b", "c", "d", "e"]),
    );
    connector
        .execute_query(
            &format!("UNWIND $names AS name CREATE (:{tag} {{name: name}})"),
            params,
        )
        .await
        .unwrap();

    let query = format!("MATCH (n:{tag}) RETURN n.name AS name ORDER BY name");
    let page = connector
        .execute_query_paginated(&query, Params::new(), Page::new(1, 2).with_total())
        .await
        .unwrap();

    assert_eq!(page.total, Some(5));
    let names: Vec<_> = page
        .records
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["b", "c"]);

    cleanup(&connector, &tag).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_existing_limit_is_respected() {
    let Some(connector) = connect_or_skip().await else {
        return;
    };

    let page = connector
        .execute_query_paginated(
            "UNWIND range(1, 10) AS i RETURN i LIMIT 5",
            Params::new(),
            Page::new(0, 2),
        )
        .await
        .unwrap();
    assert_eq!(page.records.len(), 5);
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_temporal_values_are_iso_strings() {
    let Some(connector) = connect_or_skip().await else {
        return;
    };

    let records = connector
        .execute_query(
            "RETURN date('2024-02-29') AS d, datetime('2024-02-29T10:15:30+02:00') AS dt",
            Params::new(),
        )
        .await
        .unwrap();

    assert_eq!(records[0]["d"], "2024-02-29");
    let dt = records[0]["dt"].as_str().unwrap();
    let parsed = chrono::DateTime::parse_from_rfc3339(dt).unwrap();
    assert_eq!(parsed.to_rfc3339(), "2024-02-29T10:15:30+02:00");
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_bad_query_is_a_query_error() {
    let Some(connector) = connect_or_skip().await else {
        return;
    };

    let err = connector
        .execute_query("THIS IS NOT CYPHER", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, cypherlink_graph::GraphError::Query(_)));
}
