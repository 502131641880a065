//! cypherlink-core: Driver-neutral building blocks for the cypherlink graph connector.
//!
//! This crate provides:
//! - Connection configuration
//! - The graph value model and its portable (JSON) normalization
//! - The inferred schema model and its streaming accumulator
//! - Common error types

pub mod config;
pub mod error;
pub mod schema;
pub mod value;

pub use config::{ConnectorConfig, DEFAULT_DATABASE};
pub use error::CoreError;
pub use schema::{EntitySchema, GraphSchema, RelationSchema, SchemaBuilder};
pub use value::{GraphValue, Params, Record, Row};
