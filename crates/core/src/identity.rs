//! Resolution of the caller's user, data source and persistent query object.
//!
//! Every execution rewrites the text of one saved query owned by the caller.
//! That query is looked up once per session, by name, among the queries the user
//! owns, and created on first use.

use crate::remote::{ControlPlane, DataSource, QueryHandle, UserRef};
use redash_common::config::{DEFAULT_LISTING_PAGE_SIZE, DEFAULT_QUERY_NAME};
use redash_error::{ErrorCode, ErrorContext, RedashError, Result};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct IdentityOptions {
    /// Data source name; the first listed data source when `None`.
    pub data_source: Option<String>,
    pub query_name: String,
    pub listing_page_size: usize,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            data_source: None,
            query_name: DEFAULT_QUERY_NAME.to_string(),
            listing_page_size: DEFAULT_LISTING_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub user: UserRef,
    pub data_source: DataSource,
    pub query: QueryHandle,
    pub server_version: Option<String>,
}

pub async fn resolve(
    control_plane: &dyn ControlPlane,
    options: &IdentityOptions,
) -> Result<ResolvedIdentity> {
    let session = control_plane.session().await?;
    debug!(target: "identity", user_id = session.user.id, "Session user");

    let sources = control_plane.data_sources().await?;
    let data_source = select_data_source(sources, options.data_source.as_deref())?;
    debug!(
        target: "identity",
        data_source = %data_source.name,
        source_type = %data_source.source_type,
        "Data source selected"
    );

    let query = match find_owned_query(control_plane, session.user.id, options).await? {
        Some(handle) => handle,
        None => {
            let record = control_plane
                .create_query(&options.query_name, data_source.id)
                .await?;
            info!(
                target: "identity",
                query_id = record.id,
                name = %options.query_name,
                "Created persistent query"
            );
            record.handle()
        }
    };

    Ok(ResolvedIdentity {
        server_version: session.server_version().map(str::to_string),
        user: session.user,
        data_source,
        query,
    })
}

fn select_data_source(sources: Vec<DataSource>, requested: Option<&str>) -> Result<DataSource> {
    let names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();
    let selected = match requested {
        Some(name) => sources
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name)),
        None => sources.into_iter().next(),
    };

    selected.ok_or_else(|| {
        let requested = requested.unwrap_or_default().to_string();
        let message = if requested.is_empty() {
            "The server lists no data sources for this user".to_string()
        } else {
            format!("Data source '{}' not found", requested)
        };
        let mut error = RedashError::new(ErrorCode::DataSourceNotFound, message);
        if let Some(closest) = redash_error::find_closest_match(&requested, &names) {
            error = error.with_hint(format!("Did you mean '{}'?", closest));
        }
        error.with_context(ErrorContext::DataSource {
            requested,
            available: names,
        })
    })
}

async fn find_owned_query(
    control_plane: &dyn ControlPlane,
    user_id: i64,
    options: &IdentityOptions,
) -> Result<Option<QueryHandle>> {
    let mut page = 1;
    loop {
        let listing = control_plane
            .list_queries(page, options.listing_page_size)
            .await?;
        let found = listing.results.iter().find(|q| {
            q.owner_id() == Some(user_id) && q.name.eq_ignore_ascii_case(&options.query_name)
        });
        if let Some(query) = found {
            debug!(target: "identity", query_id = query.id, version = query.version, "Found persistent query");
            return Ok(Some(query.handle()));
        }
        if listing.is_last() || listing.results.is_empty() {
            return Ok(None);
        }
        page += 1;
    }
}
