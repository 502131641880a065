//! cypherlink-graph: Neo4j connector with schema inference and paginated
//! query execution.
//!
//! Every call opens a short-lived session over one long-lived connection.
//! Records leave the connector normalized into portable JSON values.

pub mod bolt;
pub mod client;
pub mod neo4j;
pub mod pagination;
pub mod queries;
pub mod schema;
pub mod session;

pub use client::{Connector, GraphError};
pub use pagination::Page;
pub use queries::QueryPage;
pub use session::{GraphBackend, GraphSession};
