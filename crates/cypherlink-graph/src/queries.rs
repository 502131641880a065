//! Caller-supplied query execution with optional pagination and counting.

use serde::Serialize;

use cypherlink_core::{GraphValue, Params, Record, Row};

use crate::client::{report, Connector, GraphError};
use crate::pagination::{count_query, paginate, Page, TOTAL_COLUMN};

/// One page of normalized records, plus the unpaginated row count when it
/// was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryPage {
    pub total: Option<i64>,
    pub records: Vec<Record>,
}

impl Connector {
    /// Run `cypher` as given and return every record, normalized.
    pub async fn execute_query(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<Vec<Record>, GraphError> {
        self.fetch_records(cypher, &params).await.map_err(|e| {
            report("execute_query", self.database(), &e);
            e
        })
    }

    /// Run `cypher` with a `SKIP`/`LIMIT` window and, if asked, the total
    /// row count of the unpaginated query.
    ///
    /// The window is only injected when the text carries no pagination of
    /// its own. Either both the count and the page succeed, or the call fails.
    pub async fn execute_query_paginated(
        &self,
        cypher: &str,
        params: Params,
        page: Page,
    ) -> Result<QueryPage, GraphError> {
        self.fetch_page(cypher, params, page).await.map_err(|e| {
            report("execute_query_paginated", self.database(), &e);
            e
        })
    }

    async fn fetch_page(
        &self,
        cypher: &str,
        params: Params,
        page: Page,
    ) -> Result<QueryPage, GraphError> {
        let total = if page.get_total {
            Some(self.count_rows(cypher, &params).await?)
        } else {
            None
        };

        let paged = paginate(cypher, params, page);
        let records = self.fetch_records(&paged.text, &paged.params).await?;

        tracing::debug!(
            database = %self.database(),
            skip = page.skip,
            limit = page.limit,
            paginated = paged.paginated,
            total = ?total,
            returned = records.len(),
            "Executed paginated query"
        );
        Ok(QueryPage { total, records })
    }

    /// Count rows of the unpaginated query in a session of its own.
    async fn count_rows(&self, cypher: &str, params: &Params) -> Result<i64, GraphError> {
        let rows = self.run_in_session(&count_query(cypher), params).await?;
        let row = rows
            .first()
            .ok_or_else(|| GraphError::query("count query returned no rows"))?;
        match row.require(TOTAL_COLUMN)? {
            GraphValue::Integer(n) => Ok(*n),
            other => Err(GraphError::query(format!(
                "count query returned {} instead of an integer",
                other.kind()
            ))),
        }
    }

    async fn fetch_records(&self, cypher: &str, params: &Params) -> Result<Vec<Record>, GraphError> {
        let rows = self.run_in_session(cypher, params).await?;
        Ok(rows.into_iter().map(Row::into_record).collect())
    }

    /// Open a session, run one query, and release the session before
    /// returning on every path.
    async fn run_in_session(&self, cypher: &str, params: &Params) -> Result<Vec<Row>, GraphError> {
        let mut session = self.session().await?;
        session.run(cypher, params).await
    }
}
