//! Access to the Redash control plane.
//!
//! [`ControlPlane`] is the seam between the execution engine and the server: the
//! engine only ever talks to this trait, [`HttpControlPlane`] implements it over
//! the REST API, and tests substitute in-memory fakes.

pub mod http;
pub mod models;

pub use http::HttpControlPlane;
pub use models::{
    ColumnSpec, DataSource, Job, JobError, JobStatus, Page, QueryHandle, QueryPage, QueryRecord,
    ResultPayload, SessionInfo, Submission, UserPage, UserRecord, UserRef,
};

use async_trait::async_trait;
use redash_error::Result;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Authenticated user and server build information.
    async fn session(&self) -> Result<SessionInfo>;

    async fn data_sources(&self) -> Result<Vec<DataSource>>;

    /// One page (1-based) of the saved-query listing.
    async fn list_queries(&self, page: usize, page_size: usize) -> Result<QueryPage>;

    /// One page (1-based) of the user listing.
    async fn users(&self, page: usize, page_size: usize) -> Result<UserPage>;

    /// Create an empty saved query bound to a data source.
    async fn create_query(&self, name: &str, data_source_id: i64) -> Result<QueryRecord>;

    /// Replace the text of a saved query, returning its new version.
    async fn upsert_query(
        &self,
        query: &QueryHandle,
        data_source_id: i64,
        sql: &str,
    ) -> Result<QueryHandle>;

    /// Request execution of a saved query.
    async fn submit(&self, query_id: i64) -> Result<Submission>;

    async fn job(&self, job_id: &str) -> Result<Job>;

    /// Latest result of a saved query.
    async fn query_result(&self, query_id: i64) -> Result<ResultPayload>;

    async fn result_by_id(&self, result_id: i64) -> Result<ResultPayload>;
}
