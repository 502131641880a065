//! Inferred graph schema.
//!
//! There is no static schema to introspect, so the schema is folded from
//! sampled data: node label/key sets and relationship endpoint label sets.
//! [`SchemaBuilder`] is the accumulator; it knows nothing about any driver.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Entities keyed by label, relations keyed by relationship type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub entities: BTreeMap<String, EntitySchema>,
    pub relations: BTreeMap<String, RelationSchema>,
}

/// Everything observed on nodes carrying one label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Union of property keys over all nodes with this label.
    pub attributes: BTreeSet<String>,
    /// Relationship types for which such a node was seen as the source.
    pub relations: BTreeSet<String>,
}

/// Endpoint labels of a relationship type. Only the first label of each
/// endpoint is kept, and the last instance seen wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSchema {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl GraphSchema {
    pub fn entity(&self, label: &str) -> Option<&EntitySchema> {
        self.entities.get(label)
    }

    pub fn relation(&self, rel_type: &str) -> Option<&RelationSchema> {
        self.relations.get(rel_type)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

/// Streaming accumulator for [`GraphSchema`].
///
/// Feed every node observation before any relationship observation: a
/// relationship is only attributed to labels that are already entities.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: GraphSchema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `properties` into the attribute set of `label`, creating the
    /// entity if needed.
    pub fn merge_label<I, S>(&mut self, label: &str, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entity = self.schema.entities.entry(label.to_string()).or_default();
        entity
            .attributes
            .extend(properties.into_iter().map(Into::into));
    }

    /// Record one node: every label gets the node's keys. Unlabelled nodes
    /// contribute nothing.
    pub fn merge_node(&mut self, labels: &[String], properties: &[String]) {
        for label in labels {
            self.merge_label(label, properties.iter().cloned());
        }
    }

    /// Overwrite the endpoint pair of `rel_type`.
    pub fn merge_relation_type(
        &mut self,
        rel_type: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) {
        self.schema.relations.insert(
            rel_type.to_string(),
            RelationSchema {
                source: source.map(str::to_string),
                target: target.map(str::to_string),
            },
        );
    }

    /// Record one relationship instance.
    pub fn merge_relationship(
        &mut self,
        rel_type: &str,
        source_labels: &[String],
        target_labels: &[String],
    ) {
        self.merge_relation_type(
            rel_type,
            source_labels.first().map(String::as_str),
            target_labels.first().map(String::as_str),
        );

        for label in source_labels {
            if let Some(entity) = self.schema.entities.get_mut(label) {
                entity.relations.insert(rel_type.to_string());
            }
        }
    }

    pub fn finish(self) -> GraphSchema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_person_knows_person() {
        let mut builder = SchemaBuilder::new();
        for _ in 0..3 {
            builder.merge_node(&strings(&["Person"]), &strings(&["name", "age"]));
        }
        builder.merge_node(&strings(&["Person"]), &strings(&["name"]));
        builder.merge_relationship("KNOWS", &strings(&["Person"]), &strings(&["Person"]));

        let schema = builder.finish();
        let person = schema.entity("Person").unwrap();
        assert_eq!(person.attributes, set(&["name", "age"]));
        assert_eq!(person.relations, set(&["KNOWS"]));
        assert_eq!(
            schema.relation("KNOWS"),
            Some(&RelationSchema {
                source: Some("Person".to_string()),
                target: Some("Person".to_string()),
            })
        );
    }

    #[test]
    fn test_attributes_only_grow() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&strings(&["City"]), &strings(&["name", "population"]));
        builder.merge_node(&strings(&["City"]), &strings(&["name", "country"]));
        builder.merge_node(&strings(&["City"]), &[]);

        let schema = builder.finish();
        assert_eq!(
            schema.entity("City").unwrap().attributes,
            set(&["name", "population", "country"])
        );
    }

    #[test]
    fn test_multi_label_node_feeds_every_label() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&strings(&["Person", "Actor"]), &strings(&["name"]));
        builder.merge_node(&strings(&["Movie"]), &strings(&["title"]));
        builder.merge_relationship(
            "ACTED_IN",
            &strings(&["Person", "Actor"]),
            &strings(&["Movie"]),
        );

        let schema = builder.finish();
        assert_eq!(schema.entity("Actor").unwrap().attributes, set(&["name"]));
        assert_eq!(schema.entity("Person").unwrap().relations, set(&["ACTED_IN"]));
        assert_eq!(schema.entity("Actor").unwrap().relations, set(&["ACTED_IN"]));
        assert!(schema.entity("Movie").unwrap().relations.is_empty());

        let rel = schema.relation("ACTED_IN").unwrap();
        assert_eq!(rel.source.as_deref(), Some("Person"));
        assert_eq!(rel.target.as_deref(), Some("Movie"));
    }

    #[test]
    fn test_unlabelled_nodes_are_invisible() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&[], &strings(&["orphan"]));
        let schema = builder.finish();
        assert!(schema.entities.is_empty());
        assert!(schema.is_empty());
    }

    #[test]
    fn test_unknown_source_still_recorded_in_relations() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&strings(&["Target"]), &strings(&["id"]));
        builder.merge_relationship("POINTS_TO", &strings(&["Ghost"]), &strings(&["Target"]));
        builder.merge_relationship("DANGLING", &[], &[]);

        let schema = builder.finish();
        assert!(schema.entity("Ghost").is_none());
        assert!(schema.entity("Target").unwrap().relations.is_empty());
        assert_eq!(
            schema.relation("POINTS_TO").unwrap().source.as_deref(),
            Some("Ghost")
        );
        assert_eq!(schema.relation("DANGLING"), Some(&RelationSchema::default()));
    }

    #[test]
    fn test_last_endpoint_pair_wins() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&strings(&["A"]), &[]);
        builder.merge_node(&strings(&["B"]), &[]);
        builder.merge_relationship("LINKS", &strings(&["A"]), &strings(&["B"]));
        builder.merge_relationship("LINKS", &strings(&["B"]), &strings(&["A"]));
        builder.merge_relationship("LINKS", &strings(&["A"]), &strings(&["B"]));

        let schema = builder.finish();
        let rel = schema.relation("LINKS").unwrap();
        assert_eq!(rel.source.as_deref(), Some("A"));
        assert_eq!(rel.target.as_deref(), Some("B"));
        // Repeated attribution is idempotent.
        assert_eq!(schema.entity("A").unwrap().relations, set(&["LINKS"]));
        assert_eq!(schema.entity("B").unwrap().relations, set(&["LINKS"]));
    }

    #[test]
    fn test_schema_serializes_as_nested_maps() {
        let mut builder = SchemaBuilder::new();
        builder.merge_node(&strings(&["Person"]), &strings(&["name", "age"]));
        builder.merge_relationship("KNOWS", &strings(&["Person"]), &strings(&["Person"]));

        let json = serde_json::to_value(builder.finish()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "entities": {
                    "Person": {"attributes": ["age", "name"], "relations": ["KNOWS"]}
                },
                "relations": {
                    "KNOWS": {"source": "Person", "target": "Person"}
                }
            })
        );
    }
}
