//! In-memory control plane for engine tests.
//!
//! Serves one table of `(id integer, name string)` rows and evaluates the small
//! SQL subset the paginator generates: `WHERE id > n`, `ORDER BY id`,
//! `LIMIT/OFFSET` and `OFFSET ... ROWS FETCH NEXT ... ROWS ONLY`.
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redash_core::remote::{
    ColumnSpec, ControlPlane, DataSource, Job, JobError, JobStatus, QueryHandle, QueryPage,
    QueryRecord, ResultPayload, SessionInfo, Submission, UserPage, UserRecord, UserRef,
};
use redash_error::{ErrorCode, RedashError, Result};
use regex::Regex;
use serde_json::{json, Map, Value as Json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

static WHERE_GT: Lazy<Regex> = Lazy::new(|| Regex::new(r"WHERE (\w+) > (-?\d+)").unwrap());
static LIMIT_OFFSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"LIMIT (\d+) OFFSET (\d+)").unwrap());
static OFFSET_FETCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"OFFSET (\d+) ROWS FETCH NEXT (\d+) ROWS ONLY").unwrap());

pub const USER_ID: i64 = 7;

/// How the next submission behaves.
#[derive(Debug, Clone)]
pub enum JobPlan {
    /// The server answers the submission with a stored result.
    Immediate,
    /// Running for `polls` polls, then succeeded.
    Succeed { polls: usize },
    Fail { polls: usize, error: JobError },
    RemoteCancel { polls: usize },
    /// Never finishes.
    Hang,
    /// The first status poll fails at the transport level.
    PollError,
}

#[derive(Debug)]
struct RunningJob {
    id: String,
    plan: JobPlan,
    remaining: usize,
}

#[derive(Debug, Default)]
struct State {
    sql: String,
    version: i64,
    default_plan: Option<JobPlan>,
    plans: VecDeque<JobPlan>,
    job: Option<RunningJob>,
    submitted: Vec<String>,
    polls: usize,
    next_result_id: i64,
    stored: HashMap<i64, ResultPayload>,
    fetched_by_id: usize,
    fail_result_by_id: bool,
    fail_query_result: bool,
    queries: Vec<QueryRecord>,
    users: Vec<UserRecord>,
    created: Vec<String>,
    listed_pages: usize,
}

pub struct FakeControlPlane {
    columns: Vec<ColumnSpec>,
    table: Vec<Map<String, Json>>,
    data_sources: Vec<DataSource>,
    state: Mutex<State>,
}

impl FakeControlPlane {
    /// Table holding ids `1..=rows` in shuffled order.
    pub fn with_rows(rows: i64) -> Self {
        let mut ids: Vec<i64> = (1..=rows).collect();
        // Deterministic shuffle: interleave from both ends.
        let mut shuffled = Vec::with_capacity(ids.len());
        while !ids.is_empty() {
            shuffled.push(ids.remove(ids.len() - 1));
            if !ids.is_empty() {
                shuffled.push(ids.remove(0));
            }
        }
        let table = shuffled
            .into_iter()
            .map(|id| {
                json!({"id": id, "name": format!("row-{}", id)})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();

        Self {
            columns: vec![
                ColumnSpec {
                    name: "id".into(),
                    declared_type: Some("integer".into()),
                    friendly_name: None,
                },
                ColumnSpec {
                    name: "name".into(),
                    declared_type: Some("string".into()),
                    friendly_name: None,
                },
            ],
            table,
            data_sources: vec![
                DataSource {
                    id: 1,
                    name: "warehouse".into(),
                    source_type: "pg".into(),
                    paused: None,
                    view_only: None,
                },
                DataSource {
                    id: 2,
                    name: "ledger".into(),
                    source_type: "oracle".into(),
                    paused: None,
                    view_only: None,
                },
            ],
            state: Mutex::new(State {
                next_result_id: 1000,
                default_plan: Some(JobPlan::Succeed { polls: 1 }),
                ..Default::default()
            }),
        }
    }

    pub fn shared(rows: i64) -> Arc<Self> {
        Arc::new(Self::with_rows(rows))
    }

    pub fn set_default_plan(&self, plan: JobPlan) {
        self.state.lock().unwrap().default_plan = Some(plan);
    }

    /// Plan for the next submission only.
    pub fn push_plan(&self, plan: JobPlan) {
        self.state.lock().unwrap().plans.push_back(plan);
    }

    pub fn fail_result_by_id(&self, fail: bool) {
        self.state.lock().unwrap().fail_result_by_id = fail;
    }

    pub fn fail_query_result(&self, fail: bool) {
        self.state.lock().unwrap().fail_query_result = fail;
    }

    pub fn add_saved_query(&self, id: i64, name: &str, owner: i64, version: i64) {
        self.add_saved_query_on(id, name, owner, version, 1);
    }

    pub fn add_saved_query_on(
        &self,
        id: i64,
        name: &str,
        owner: i64,
        version: i64,
        data_source_id: i64,
    ) {
        self.state.lock().unwrap().queries.push(QueryRecord {
            id,
            name: name.to_string(),
            version,
            user: Some(UserRef {
                id: owner,
                name: None,
                email: Some(format!("user{}@example.com", owner)),
            }),
            data_source_id: Some(data_source_id),
            query: Some(format!("SELECT {}", id)),
            ..Default::default()
        });
    }

    pub fn add_user(&self, id: i64, name: &str) {
        self.state.lock().unwrap().users.push(UserRecord {
            id,
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            ..Default::default()
        });
    }

    /// Store a result under `id` as if an earlier execution had produced it.
    pub fn store_result_as(&self, id: i64) {
        let mut state = self.state.lock().unwrap();
        let payload = ResultPayload {
            id: Some(id),
            columns: self.columns.clone(),
            rows: self.table.clone(),
            runtime: None,
            retrieved_at: None,
        };
        state.stored.insert(id, payload);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn polls(&self) -> usize {
        self.state.lock().unwrap().polls
    }

    pub fn fetched_by_id(&self) -> usize {
        self.state.lock().unwrap().fetched_by_id
    }

    pub fn version(&self) -> i64 {
        self.state.lock().unwrap().version
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn listed_pages(&self) -> usize {
        self.state.lock().unwrap().listed_pages
    }

    fn evaluate(&self, sql: &str) -> Vec<Map<String, Json>> {
        let id_of = |row: &Map<String, Json>| row.get("id").and_then(Json::as_i64).unwrap_or(0);
        let mut rows: Vec<Map<String, Json>> = self.table.clone();

        if let Some(caps) = WHERE_GT.captures(sql) {
            let bound: i64 = caps[2].parse().unwrap();
            rows.retain(|r| id_of(r) > bound);
        }
        if sql.contains("ORDER BY id ASC") {
            rows.sort_by_key(id_of);
        }

        let (limit, offset) = if let Some(caps) = LIMIT_OFFSET.captures(sql) {
            (caps[1].parse().unwrap(), caps[2].parse().unwrap())
        } else if let Some(caps) = OFFSET_FETCH.captures(sql) {
            (caps[2].parse().unwrap(), caps[1].parse().unwrap())
        } else {
            (usize::MAX, 0usize)
        };
        rows.into_iter().skip(offset).take(limit).collect()
    }

    fn store_result(&self, state: &mut State) -> ResultPayload {
        let id = state.next_result_id;
        state.next_result_id += 1;
        let payload = ResultPayload {
            id: Some(id),
            columns: self.columns.clone(),
            rows: self.evaluate(&state.sql),
            runtime: Some(0.01),
            retrieved_at: None,
        };
        state.stored.insert(id, payload.clone());
        payload
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn session(&self) -> Result<SessionInfo> {
        Ok(SessionInfo {
            user: UserRef {
                id: USER_ID,
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
            },
            client_config: None,
        })
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>> {
        Ok(self.data_sources.clone())
    }

    async fn list_queries(&self, page: usize, page_size: usize) -> Result<QueryPage> {
        let mut state = self.state.lock().unwrap();
        state.listed_pages += 1;
        let results = state
            .queries
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();
        Ok(QueryPage {
            count: state.queries.len(),
            page,
            page_size,
            results,
        })
    }

    async fn users(&self, page: usize, page_size: usize) -> Result<UserPage> {
        let state = self.state.lock().unwrap();
        let results = state
            .users
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();
        Ok(UserPage {
            count: state.users.len(),
            page,
            page_size,
            results,
        })
    }

    async fn create_query(&self, name: &str, data_source_id: i64) -> Result<QueryRecord> {
        let mut state = self.state.lock().unwrap();
        state.created.push(name.to_string());
        let record = QueryRecord {
            id: 500 + state.created.len() as i64,
            name: name.to_string(),
            version: 1,
            user: Some(UserRef {
                id: USER_ID,
                name: None,
                email: None,
            }),
            data_source_id: Some(data_source_id),
            query: Some(String::new()),
            ..Default::default()
        };
        state.queries.push(record.clone());
        Ok(record)
    }

    async fn upsert_query(
        &self,
        query: &QueryHandle,
        _data_source_id: i64,
        sql: &str,
    ) -> Result<QueryHandle> {
        let mut state = self.state.lock().unwrap();
        state.sql = sql.to_string();
        state.version = query.version + 1;
        Ok(QueryHandle {
            id: query.id,
            version: state.version,
        })
    }

    async fn submit(&self, _query_id: i64) -> Result<Submission> {
        let mut state = self.state.lock().unwrap();
        let sql = state.sql.clone();
        state.submitted.push(sql);
        let plan = match state.plans.pop_front() {
            Some(plan) => plan,
            None => state
                .default_plan
                .clone()
                .unwrap_or(JobPlan::Succeed { polls: 1 }),
        };

        if let JobPlan::Immediate = plan {
            return Ok(Submission::Ready(self.store_result(&mut state)));
        }

        let id = format!("job-{}", state.submitted.len());
        let remaining = match &plan {
            JobPlan::Succeed { polls }
            | JobPlan::Fail { polls, .. }
            | JobPlan::RemoteCancel { polls } => *polls,
            _ => 0,
        };
        state.job = Some(RunningJob {
            id: id.clone(),
            plan,
            remaining,
        });
        Ok(Submission::Job(Job {
            id,
            status: JobStatus::Pending,
            error: None,
            query_result_id: None,
        }))
    }

    async fn job(&self, job_id: &str) -> Result<Job> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        let job = state
            .job
            .as_mut()
            .filter(|j| j.id == job_id)
            .ok_or_else(|| RedashError::new(ErrorCode::HttpStatus, "unknown job"))?;

        let running = Job {
            id: job.id.clone(),
            status: JobStatus::Running,
            error: None,
            query_result_id: None,
        };
        match job.plan.clone() {
            JobPlan::Hang => return Ok(running),
            JobPlan::PollError => {
                return Err(RedashError::new(
                    ErrorCode::ConnectionFailed,
                    "connection reset by peer",
                ))
            }
            _ => {}
        }

        job.remaining = job.remaining.saturating_sub(1);
        if job.remaining > 0 {
            return Ok(running);
        }
        let (status, error) = match job.plan.clone() {
            JobPlan::Fail { error, .. } => (JobStatus::Failed, Some(error)),
            JobPlan::RemoteCancel { .. } => (JobStatus::Cancelled, None),
            _ => (JobStatus::Succeeded, None),
        };
        Ok(Job {
            status,
            error,
            ..running
        })
    }

    async fn query_result(&self, query_id: i64) -> Result<ResultPayload> {
        let mut state = self.state.lock().unwrap();
        if state.fail_query_result {
            return Err(RedashError::new(
                ErrorCode::HttpStatus,
                format!("/api/queries/{}/results returned 404 Not Found", query_id),
            ));
        }
        Ok(self.store_result(&mut state))
    }

    async fn result_by_id(&self, result_id: i64) -> Result<ResultPayload> {
        let mut state = self.state.lock().unwrap();
        if state.fail_result_by_id {
            return Err(RedashError::new(
                ErrorCode::HttpStatus,
                "/api/query_results returned 404 Not Found",
            ));
        }
        state.fetched_by_id += 1;
        state
            .stored
            .get(&result_id)
            .cloned()
            .ok_or_else(|| RedashError::new(ErrorCode::HttpStatus, "no such result"))
    }
}

/// Ids read from the `id` column of every remaining row.
pub async fn drain_ids(cursor: &mut dyn redash_core::RowCursor) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    while cursor.advance().await? {
        ids.push(cursor.current().get_long("id")?);
    }
    Ok(ids)
}
