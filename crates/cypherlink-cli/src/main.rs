//! CLI entry point for the cypherlink graph connector.
//!
//! Prints JSON to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use cypherlink_core::value::params_from_json;
use cypherlink_core::ConnectorConfig;
use cypherlink_graph::{Connector, Page};

#[derive(Parser)]
#[command(name = "cypherlink")]
#[command(about = "Schema inference and paginated Cypher queries against Neo4j")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: cypherlink).
    #[arg(short, long, default_value = "cypherlink", global = true)]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Infer entities and relations from the data in the graph.
    Schema,
    /// Run a Cypher query.
    Query {
        /// Query text.
        cypher: String,
        /// Parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
        /// Rows to skip.
        #[arg(long, default_value_t = 0)]
        skip: u32,
        /// Maximum rows to return.
        #[arg(long, default_value_t = 100)]
        limit: u32,
        /// Also report the unpaginated row count.
        #[arg(long)]
        total: bool,
        /// Return every row, without pagination.
        #[arg(long, conflicts_with_all = ["skip", "limit", "total"])]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let config = ConnectorConfig::load(&cli.config)?;
    let mut connector = Connector::connect(&config).await?;

    let result = run(&connector, cli.command).await;
    connector.close();
    let output = result?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(connector: &Connector, command: Command) -> anyhow::Result<serde_json::Value> {
    tracing::debug!(database = %connector.database(), "Running command");
    match command {
        Command::Schema => {
            let schema = connector.get_graph_schema().await?;
            Ok(serde_json::to_value(schema)?)
        }
        Command::Query {
            cypher,
            params,
            skip,
            limit,
            total,
            all,
        } => {
            let params = match params {
                Some(raw) => params_from_json(serde_json::from_str(&raw)?)?,
                None => Default::default(),
            };

            if all {
                let records = connector.execute_query(&cypher, params).await?;
                Ok(serde_json::to_value(records)?)
            } else {
                let mut page = Page::new(skip, limit);
                page.get_total = total;
                let result = connector
                    .execute_query_paginated(&cypher, params, page)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
        }
    }
}
