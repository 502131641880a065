//! Bolt backend built on `neo4rs`.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};

use cypherlink_core::{ConnectorConfig, Params, Row};

use crate::bolt::{decode_row, to_bolt};
use crate::client::GraphError;
use crate::session::{GraphBackend, GraphSession};

/// Pooled Neo4j connection with the database bound at construction.
pub struct Neo4jBackend {
    graph: Graph,
}

impl Neo4jBackend {
    pub async fn connect(config: &ConnectorConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphBackend for Neo4jBackend {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        Ok(Box::new(Neo4jSession {
            graph: self.graph.clone(),
        }))
    }
}

/// Each `run` borrows a pooled connection for the lifetime of its result
/// stream; the connection goes back to the pool when the stream is dropped.
pub struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, cypher: &str, params: &Params) -> Result<Vec<Row>, GraphError> {
        let q = build_query(cypher, params);
        let mut stream = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }
}

fn build_query(cypher: &str, params: &Params) -> Query {
    params
        .iter()
        .fold(neo4rs::query(cypher), |q, (key, value)| {
            q.param(key, to_bolt(value.clone()))
        })
}
