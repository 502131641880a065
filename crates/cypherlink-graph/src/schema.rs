//! Schema inference by sampling the live graph.

use cypherlink_core::{GraphSchema, GraphValue, Params, SchemaBuilder};

use crate::client::{report, Connector, GraphError};

/// Label set and property keys of every node.
pub const LABELS_QUERY: &str = "MATCH (n) \
     RETURN DISTINCT labels(n) AS labels, keys(n) AS properties";

/// Type and endpoint label sets of every directed relationship.
pub const RELATIONSHIPS_QUERY: &str = "MATCH (a)-[r]->(b) \
     RETURN DISTINCT type(r) AS relationship, labels(a) AS source, labels(b) AS target";

impl Connector {
    /// Derive entities and relations from the data currently in the graph.
    ///
    /// Any failure aborts the whole operation; no partial schema is returned.
    pub async fn get_graph_schema(&self) -> Result<GraphSchema, GraphError> {
        self.infer_schema().await.map_err(|e| {
            report("get_graph_schema", self.database(), &e);
            e
        })
    }

    async fn infer_schema(&self) -> Result<GraphSchema, GraphError> {
        let mut session = self.session().await?;
        let params = Params::new();
        let mut builder = SchemaBuilder::new();

        let label_rows = session.run(LABELS_QUERY, &params).await?;
        for row in &label_rows {
            let labels = row.require("labels")?.as_string_list()?;
            let properties = row.require("properties")?.as_string_list()?;
            builder.merge_node(&labels, &properties);
        }

        let rel_rows = session.run(RELATIONSHIPS_QUERY, &params).await?;
        for row in &rel_rows {
            let rel_type = match row.require("relationship")? {
                GraphValue::String(s) => s.as_str(),
                other => {
                    return Err(GraphError::query(format!(
                        "expected relationship type string, got {}",
                        other.kind()
                    )))
                }
            };
            let source = row.require("source")?.as_string_list()?;
            let target = row.require("target")?.as_string_list()?;
            builder.merge_relationship(rel_type, &source, &target);
        }

        let schema = builder.finish();
        tracing::debug!(
            database = %self.database(),
            node_rows = label_rows.len(),
            relationship_rows = rel_rows.len(),
            entities = schema.entities.len(),
            relations = schema.relations.len(),
            "Inferred graph schema"
        );
        Ok(schema)
    }
}
