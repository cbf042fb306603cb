use crate::materializer::ResultMaterializer;
use async_trait::async_trait;
use redash_error::Result;

/// Forward-only row cursor.
///
/// Both a single materialized page and a keyset paginator spanning many pages
/// implement this, so callers can iterate either without caring which.
#[async_trait]
pub trait RowCursor: Send {
    /// Move to the next row. `Ok(false)` once the rows are exhausted.
    async fn advance(&mut self) -> Result<bool>;

    /// 1-based number of the current row, 0 before the first `advance`.
    fn row(&self) -> usize;

    /// Page holding the current row; typed getters read through it.
    fn current(&self) -> &ResultMaterializer;
}
