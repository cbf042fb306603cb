//! Keyset pagination over bounded server-side result pages.
//!
//! The base query is wrapped in a subquery and re-executed once per page. With a
//! cursor column, page 0 orders by that column and every later page selects only
//! rows past the largest cursor value seen so far (`WHERE col > <last>`), so rows
//! inserted between fetches do not shift page boundaries. Without a cursor column
//! pages fall back to `OFFSET page * size` with no ordering, which is only
//! deterministic for page 0.
//!
//! A page holding fewer rows than the page size is the last one.

use crate::cursor::RowCursor;
use crate::job::{Outcome, RemoteJobClient};
use crate::materializer::ResultMaterializer;
use crate::types::{Backend, Value};
use async_trait::async_trait;
use redash_common::config::DEFAULT_PAGE_SIZE;
use redash_common::models::Dialect;
use redash_error::{ErrorCode, RedashError, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PaginatorOptions {
    pub cursor_column: Option<String>,
    pub page_size: usize,
    pub dialect: Dialect,
    pub backend: Backend,
}

impl Default for PaginatorOptions {
    fn default() -> Self {
        Self {
            cursor_column: None,
            page_size: DEFAULT_PAGE_SIZE,
            dialect: Dialect::default(),
            backend: Backend::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CursorState {
    page: usize,
    last_value: Option<Value>,
    exhausted: bool,
}

pub struct KeysetPaginator {
    client: Arc<RemoteJobClient>,
    base_sql: String,
    options: PaginatorOptions,
    state: CursorState,
    current: ResultMaterializer,
    row: usize,
    fetches: usize,
    failed: bool,
}

impl std::fmt::Debug for KeysetPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysetPaginator")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("row", &self.row)
            .field("fetches", &self.fetches)
            .field("failed", &self.failed)
            .finish()
    }
}

impl KeysetPaginator {
    /// Build the paginator and fetch page 0.
    pub async fn open(
        client: Arc<RemoteJobClient>,
        sql: &str,
        options: PaginatorOptions,
    ) -> Result<Self> {
        if options.page_size == 0 {
            return Err(RedashError::new(
                ErrorCode::InvalidConfig,
                "Page size must be at least 1",
            ));
        }
        let base_sql = sql.trim().trim_end_matches(';').trim_end().to_string();
        let mut paginator = Self {
            client,
            base_sql,
            options,
            state: CursorState::default(),
            current: ResultMaterializer::empty(),
            row: 0,
            fetches: 0,
            failed: false,
        };
        paginator.fetch_page().await?;
        Ok(paginator)
    }

    pub fn page(&self) -> usize {
        self.state.page
    }

    /// Number of pages fetched from the server so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.exhausted
    }

    pub fn last_value(&self) -> Option<&Value> {
        self.state.last_value.as_ref()
    }

    /// SQL for the current page.
    pub fn page_query(&self) -> Result<String> {
        let dialect = self.options.dialect;
        let size = self.options.page_size;
        let wrapped = format!(
            "SELECT * FROM ({}) {}",
            self.base_sql,
            dialect.subquery_alias()
        );

        let column = match &self.options.cursor_column {
            Some(column) => column,
            None => {
                return Ok(format!(
                    "{} {}",
                    wrapped,
                    dialect.page_clause(size, self.state.page * size)
                ))
            }
        };

        let predicate = match (&self.state.last_value, self.state.page) {
            (_, 0) => String::new(),
            (Some(last), _) => match last.to_sql_literal() {
                Some(literal) => format!(" WHERE {} > {}", column, literal),
                None => return Err(null_cursor(column)),
            },
            (None, _) => return Err(null_cursor(column)),
        };

        Ok(format!(
            "{}{} ORDER BY {} ASC {}",
            wrapped,
            predicate,
            column,
            dialect.page_clause(size, 0)
        ))
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let sql = self.page_query()?;
        debug!(target: "paginator", page = self.state.page, sql = %sql, "Fetching page");

        // Every page is executed on the server; the result cache is not consulted.
        let payload = match self.client.submit_and_wait(&sql).await? {
            Outcome::Completed(payload) => payload,
            Outcome::Cancelled => {
                return Err(self.cancelled("while fetching", self.state.page));
            }
        };
        self.fetches += 1;

        let page = ResultMaterializer::new(payload, self.options.backend);
        if let Some(column) = &self.options.cursor_column {
            if let Some(page_max) = page.column_max(column.as_str())? {
                self.state.last_value = Some(page_max);
            } else if !page.is_empty() {
                return Err(null_cursor(column));
            }
        }
        self.state.exhausted = page.len() < self.options.page_size;
        debug!(
            target: "paginator",
            page = self.state.page,
            rows = page.len(),
            exhausted = self.state.exhausted,
            "Page fetched"
        );
        self.current = page;
        Ok(())
    }

    fn cancelled(&self, when: &str, page: usize) -> RedashError {
        info!(target: "paginator", page, "Pagination cancelled");
        RedashError::new(
            ErrorCode::QueryCancelled,
            format!("Pagination was cancelled {} page {}", when, page),
        )
    }

    /// A cancel requested while rows of a fetched page are being read is
    /// consumed here, before the next page is submitted.
    async fn advance_inner(&mut self) -> Result<bool> {
        loop {
            if self.current.advance() {
                self.row += 1;
                return Ok(true);
            }
            if self.state.exhausted {
                return Ok(false);
            }
            if self.client.cancel_handle().take() {
                return Err(self.cancelled("before fetching", self.state.page + 1));
            }
            self.state.page += 1;
            self.fetch_page().await?;
        }
    }
}

fn null_cursor(column: &str) -> RedashError {
    RedashError::new(
        ErrorCode::DecodeFailed,
        format!("Cursor column '{}' holds only null values on a page", column),
    )
    .with_hint("Keyset pagination needs a monotonic, non-null cursor column")
}

#[async_trait]
impl RowCursor for KeysetPaginator {
    async fn advance(&mut self) -> Result<bool> {
        if self.failed {
            return Err(RedashError::new(
                ErrorCode::CursorUnusable,
                "The paginator failed earlier and cannot continue",
            )
            .with_hint("Open a new paginator to restart from the first page"));
        }
        let result = self.advance_inner().await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn row(&self) -> usize {
        self.row
    }

    fn current(&self) -> &ResultMaterializer {
        &self.current
    }
}
