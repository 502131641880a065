//! Best-effort rewriting of caller queries for pagination and counting.
//!
//! Query text is treated as opaque: it is only appended to or wrapped, never
//! parsed. Detection of existing pagination is a case-insensitive substring
//! check for `LIMIT` / `SKIP`, so a query that merely mentions either word
//! (in a string literal, a property name such as `n.skipped`, ...) is left
//! unpaginated. That is a known limitation and the behavior is kept as is.

use cypherlink_core::{GraphValue, Params};

/// Parameter names injected alongside the pagination suffix.
pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";

/// Column carrying the result of a count query.
pub const TOTAL_COLUMN: &str = "total";

/// Offset/limit window for a paginated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
    /// Also compute the row count of the unpaginated query.
    pub get_total: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            get_total: false,
        }
    }
}

impl Page {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self {
            skip,
            limit,
            get_total: false,
        }
    }

    pub fn with_total(mut self) -> Self {
        self.get_total = true;
        self
    }
}

/// A query ready to submit, with a record of what was added to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedQuery {
    pub text: String,
    pub params: Params,
    /// Whether a `SKIP`/`LIMIT` suffix and its parameters were added.
    pub paginated: bool,
}

/// Whether the caller's text already carries its own pagination.
pub fn has_pagination(cypher: &str) -> bool {
    let upper = cypher.to_uppercase();
    upper.contains("LIMIT") || upper.contains("SKIP")
}

/// Append `SKIP $skip LIMIT $limit` unless the text already paginates.
///
/// Injected parameters overwrite caller keys of the same name.
pub fn paginate(cypher: &str, mut params: Params, page: Page) -> PagedQuery {
    if has_pagination(cypher) {
        return PagedQuery {
            text: cypher.to_string(),
            params,
            paginated: false,
        };
    }

    params.insert(SKIP_PARAM.to_string(), GraphValue::from(page.skip));
    params.insert(LIMIT_PARAM.to_string(), GraphValue::from(page.limit));
    PagedQuery {
        text: format!("{cypher} SKIP ${SKIP_PARAM} LIMIT ${LIMIT_PARAM}"),
        params,
        paginated: true,
    }
}

/// Wrap the caller's text as a subquery whose only output is its row count.
pub fn count_query(cypher: &str) -> String {
    format!("CALL (*) {{ {cypher} }} RETURN count(*) AS {TOTAL_COLUMN}")
}
