//! Connection management and the shared graph connector.

use std::sync::Arc;

use cypherlink_core::{ConnectorConfig, CoreError};

use crate::neo4j::Neo4jBackend;
use crate::session::{GraphBackend, GraphSession};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[source] BoxError),

    #[error("Connector is closed")]
    Closed,
}

impl GraphError {
    /// A query failure described by a message alone.
    pub fn query(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        Self::Query(msg.into())
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        Self::Query(Box::new(e))
    }
}

impl From<CoreError> for GraphError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Config(msg) => Self::Connection(msg),
            decode @ CoreError::Decode(_) => Self::Query(Box::new(decode)),
        }
    }
}

/// Write the full failure, including its source chain, to the error sink.
pub(crate) fn report(operation: &str, database: &str, err: &GraphError) {
    let mut chain = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    tracing::error!(
        operation,
        database,
        error = %err,
        causes = ?chain,
        detail = ?err,
        "Graph operation failed"
    );
}

/// Graph connector over one long-lived connection handle.
///
/// Every operation opens its own session, so `&self` methods may run
/// concurrently; share it behind an `Arc` across tasks.
pub struct Connector {
    backend: Option<Arc<dyn GraphBackend>>,
    database: String,
}

impl Connector {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &ConnectorConfig) -> Result<Self, GraphError> {
        let backend = Neo4jBackend::connect(config).await.map_err(|e| {
            tracing::error!(uri = %config.uri, error = %e, "Failed to connect to Neo4j");
            e
        })?;

        tracing::info!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(Self::with_backend(Arc::new(backend), &config.database))
    }

    /// Wrap an already-open backend bound to `database`.
    pub fn with_backend(backend: Arc<dyn GraphBackend>, database: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            database: database.into(),
        }
    }

    /// Target database of every session.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// Open a session bound to the configured database. The session is
    /// released when dropped.
    pub async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        let backend = self.backend.as_ref().ok_or(GraphError::Closed)?;
        backend.session().await
    }

    /// Release the connection handle. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.backend.take().is_some() {
            tracing::info!(database = %self.database, "Closed graph connection");
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("database", &self.database)
            .field("closed", &self.is_closed())
            .finish()
    }
}
