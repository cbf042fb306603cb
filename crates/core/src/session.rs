//! Connection-scoped facade over the engine.
//!
//! A [`QuerySession`] owns the resolved identity, one [`RemoteJobClient`] bound to
//! the caller's persistent query and an optional result cache. It exposes the
//! three call shapes used by front ends: [`execute_and_wait`](QuerySession::execute_and_wait),
//! [`open_paginated`](QuerySession::open_paginated) and [`cancel`](QuerySession::cancel).

use crate::cache::{CacheConfig, QueryResultCache};
use crate::identity::{self, IdentityOptions, ResolvedIdentity};
use crate::job::{CancelHandle, Outcome, RemoteJobClient};
use crate::listing::{self, QueryScope, QuerySummary};
use crate::materializer::ResultMaterializer;
use crate::paginator::{KeysetPaginator, PaginatorOptions};
use crate::remote::{
    ControlPlane, DataSource, HttpControlPlane, ResultPayload, UserRecord, UserRef,
};
use crate::types::Backend;
use redash_common::config::{AppConfig, DEFAULT_PAGE_SIZE};
use redash_common::models::Dialect;
use redash_error::{ErrorCode, RedashError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub identity: IdentityOptions,
    pub page_size: usize,
    pub cache_ttl: Duration,
    /// Overrides the dialect derived from the data source type.
    pub dialect: Option<Dialect>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            identity: IdentityOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl: Duration::ZERO,
            dialect: None,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            identity: IdentityOptions {
                data_source: config.connection.data_source.clone(),
                query_name: config.connection.query_name.clone(),
                listing_page_size: config.execution.listing_page_size,
            },
            page_size: config.execution.page_size,
            cache_ttl: Duration::from_secs(config.execution.cache_ttl_secs),
            dialect: config.execution.dialect,
        }
    }
}

pub struct QuerySession {
    control_plane: Arc<dyn ControlPlane>,
    client: Arc<RemoteJobClient>,
    identity: ResolvedIdentity,
    backend: Backend,
    dialect: Dialect,
    page_size: usize,
    listing_page_size: usize,
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("identity", &self.identity)
            .field("dialect", &self.dialect)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl QuerySession {
    /// Connect over HTTP using the application configuration.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        config.validate().map_err(|e| {
            RedashError::new(
                ErrorCode::InvalidConfig,
                format!("Invalid configuration: {}", e),
            )
        })?;
        let control_plane = HttpControlPlane::new(&config.connection)?;
        Self::from_parts(Arc::new(control_plane), SessionOptions::from(config)).await
    }

    /// Build a session over any control plane.
    pub async fn from_parts(
        control_plane: Arc<dyn ControlPlane>,
        options: SessionOptions,
    ) -> Result<Self> {
        let identity = identity::resolve(control_plane.as_ref(), &options.identity).await?;
        let source = &identity.data_source;
        let backend = Backend::from_source_type(&source.source_type);
        let dialect = options
            .dialect
            .unwrap_or_else(|| Dialect::for_data_source_type(&source.source_type));

        let mut client = RemoteJobClient::new(control_plane.clone(), source.id, identity.query);
        let cache_config = CacheConfig::with_ttl(options.cache_ttl);
        if cache_config.enabled() {
            client = client.with_cache(Arc::new(QueryResultCache::new(
                source.name.clone(),
                cache_config,
            )));
        }

        info!(
            target: "identity",
            user_id = identity.user.id,
            data_source = %source.name,
            query_id = identity.query.id,
            dialect = %dialect,
            "Session ready"
        );

        Ok(Self {
            control_plane,
            client: Arc::new(client),
            identity,
            backend,
            dialect,
            page_size: options.page_size,
            listing_page_size: options.identity.listing_page_size,
        })
    }

    /// Execute `sql` and wait for its complete result.
    pub async fn execute_and_wait(&self, sql: &str) -> Result<Outcome<ResultPayload>> {
        self.client.execute_query(sql).await
    }

    /// Open a keyset-paginated cursor over `sql`; the first page is fetched eagerly.
    pub async fn open_paginated(
        &self,
        sql: &str,
        cursor_column: Option<&str>,
        dialect: Dialect,
    ) -> Result<KeysetPaginator> {
        let options = PaginatorOptions {
            cursor_column: cursor_column.map(str::to_string),
            page_size: self.page_size,
            dialect,
            backend: self.backend,
        };
        KeysetPaginator::open(self.client.clone(), sql, options).await
    }

    pub fn cancel(&self) {
        self.client.cancel();
    }

    /// Handle that can cancel from another task while a call is awaited.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.client.cancel_handle()
    }

    /// Wrap a payload with this session's backend type rules.
    pub fn materialize(&self, payload: ResultPayload) -> ResultMaterializer {
        ResultMaterializer::new(payload, self.backend)
    }

    /// Drop expired cache entries; 0 when caching is disabled.
    pub async fn sweep_cache(&self) -> usize {
        match self.client.cache() {
            Some(cache) => cache.sweep().await,
            None => 0,
        }
    }

    /// Saved queries visible to the session user, narrowed by `scope`.
    pub async fn queries(&self, scope: QueryScope) -> Result<Vec<QuerySummary>> {
        listing::queries(
            self.control_plane.as_ref(),
            scope,
            &self.identity.user,
            &self.identity.data_source,
            self.listing_page_size,
        )
        .await
    }

    pub async fn users(&self) -> Result<Vec<UserRecord>> {
        listing::users(self.control_plane.as_ref(), self.listing_page_size).await
    }

    /// Stored result of a saved query, or of a result id (see [`listing::show_query`]).
    pub async fn show_query(&self, id: i64) -> Result<ResultPayload> {
        listing::show_query(self.control_plane.as_ref(), id).await
    }

    /// Name of the data source queries run against.
    pub fn catalog(&self) -> &str {
        &self.identity.data_source.name
    }

    pub fn data_source(&self) -> &DataSource {
        &self.identity.data_source
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn user(&self) -> &UserRef {
        &self.identity.user
    }

    pub fn server_version(&self) -> Option<&str> {
        self.identity.server_version.as_deref()
    }
}
