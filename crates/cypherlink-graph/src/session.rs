//! The collaborator boundary: what the connector needs from a database driver.

use async_trait::async_trait;

use cypherlink_core::{Params, Row};

use crate::client::GraphError;

/// An open connection handle able to hand out sessions.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Open a session bound to the backend's database.
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError>;
}

/// A short-lived scope for submitting queries.
///
/// Implementations release their server-side resources on drop, so a
/// session is released on every exit path of the code that owns it.
#[async_trait]
pub trait GraphSession: Send {
    /// Run `query` with `params` and collect every row.
    async fn run(&mut self, query: &str, params: &Params) -> Result<Vec<Row>, GraphError>;
}
