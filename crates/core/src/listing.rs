//! Server-side catalog listings: saved queries, users and stored results.

use crate::remote::{
    ControlPlane, DataSource, Page, QueryRecord, ResultPayload, UserRecord, UserRef,
};
use redash_error::Result;
use serde::Serialize;
use std::future::Future;
use tracing::debug;

/// Which saved queries a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScope {
    /// Queries on the session's data source owned by the session user.
    Mine,
    /// Every query on the session's data source.
    #[default]
    DataSource,
    /// Every visible query, on any data source.
    All,
}

impl QueryScope {
    pub fn includes(
        &self,
        record: &QueryRecord,
        user: &UserRef,
        data_source: &DataSource,
    ) -> bool {
        let on_source = record.data_source_id == Some(data_source.id);
        match self {
            QueryScope::All => true,
            QueryScope::DataSource => on_source,
            QueryScope::Mine => on_source && record.owner_id() == Some(user.id),
        }
    }
}

/// One row of a query listing, with the data source resolved to its name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    pub id: i64,
    pub query_name: String,
    pub query: Option<String>,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub latest_query_data_id: Option<i64>,
    pub runtime: Option<f64>,
    pub updated_at: Option<String>,
    pub data_source: Option<String>,
}

impl QuerySummary {
    fn new(record: QueryRecord, sources: &[DataSource]) -> Self {
        let data_source = record
            .data_source_id
            .and_then(|id| sources.iter().find(|s| s.id == id))
            .map(|s| s.name.clone());
        Self {
            id: record.id,
            user_id: record.owner_id(),
            user_email: record.user.as_ref().and_then(|u| u.email.clone()),
            query_name: record.name,
            query: record.query.map(|q| q.trim().to_string()),
            latest_query_data_id: record.latest_query_data_id,
            runtime: record.runtime,
            updated_at: record.updated_at,
            data_source,
        }
    }
}

/// Read a paged listing from page 1 until `count <= page * page_size` or a page
/// comes back empty.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let listing = fetch(page).await?;
        let last = listing.is_last() || listing.results.is_empty();
        items.extend(listing.results);
        if last {
            debug!(target: "listing", pages = page, items = items.len(), "Listing read");
            return Ok(items);
        }
        page += 1;
    }
}

pub async fn queries(
    control_plane: &dyn ControlPlane,
    scope: QueryScope,
    user: &UserRef,
    data_source: &DataSource,
    page_size: usize,
) -> Result<Vec<QuerySummary>> {
    let records = collect_pages(move |page| control_plane.list_queries(page, page_size)).await?;
    let sources = control_plane.data_sources().await?;
    Ok(records
        .into_iter()
        .filter(|r| scope.includes(r, user, data_source))
        .map(|r| QuerySummary::new(r, &sources))
        .collect())
}

pub async fn users(control_plane: &dyn ControlPlane, page_size: usize) -> Result<Vec<UserRecord>> {
    collect_pages(move |page| control_plane.users(page, page_size)).await
}

/// Latest result of saved query `id`; when that lookup fails, `id` is tried as
/// a result id. The first error is returned when both fail.
pub async fn show_query(control_plane: &dyn ControlPlane, id: i64) -> Result<ResultPayload> {
    match control_plane.query_result(id).await {
        Ok(payload) => Ok(payload),
        Err(first) => {
            debug!(target: "listing", id, error = %first, "No query result, trying result id");
            control_plane.result_by_id(id).await.map_err(|_| first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, owner: i64, data_source_id: i64) -> QueryRecord {
        QueryRecord {
            id,
            name: format!("q{}", id),
            user: Some(UserRef {
                id: owner,
                name: None,
                email: Some(format!("user{}@example.com", owner)),
            }),
            data_source_id: Some(data_source_id),
            query: Some("  SELECT 1\n".into()),
            ..Default::default()
        }
    }

    fn source(id: i64, name: &str) -> DataSource {
        DataSource {
            id,
            name: name.into(),
            source_type: "pg".into(),
            paused: None,
            view_only: None,
        }
    }

    #[test]
    fn test_scope_filters() {
        let me = UserRef {
            id: 7,
            name: None,
            email: None,
        };
        let warehouse = source(1, "warehouse");
        let mine = record(1, 7, 1);
        let colleague = record(2, 8, 1);
        let elsewhere = record(3, 7, 2);

        let pick = |scope: QueryScope| -> Vec<i64> {
            [&mine, &colleague, &elsewhere]
                .into_iter()
                .filter(|r| scope.includes(r, &me, &warehouse))
                .map(|r| r.id)
                .collect()
        };
        assert_eq!(pick(QueryScope::Mine), vec![1]);
        assert_eq!(pick(QueryScope::DataSource), vec![1, 2]);
        assert_eq!(pick(QueryScope::All), vec![1, 2, 3]);
    }

    #[test]
    fn test_summary_resolves_data_source_name() {
        let summary = QuerySummary::new(record(4, 7, 2), &[source(1, "a"), source(2, "ledger")]);
        assert_eq!(summary.data_source.as_deref(), Some("ledger"));
        assert_eq!(summary.query.as_deref(), Some("SELECT 1"));
        assert_eq!(summary.user_email.as_deref(), Some("user7@example.com"));

        let orphan = QuerySummary::new(record(5, 7, 9), &[]);
        assert_eq!(orphan.data_source, None);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_count() {
        let mut requested = Vec::new();
        let items = collect_pages(|page| {
            requested.push(page);
            async move {
                Ok(Page {
                    count: 5,
                    page,
                    page_size: 2,
                    results: vec![page; if page == 3 { 1 } else { 2 }],
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 1, 2, 2, 3]);
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_empty_page() {
        let items: Vec<i64> = collect_pages(|page| async move {
            Ok(Page {
                count: 100,
                page,
                page_size: 10,
                results: Vec::new(),
            })
        })
        .await
        .unwrap();
        assert!(items.is_empty());
    }
}
