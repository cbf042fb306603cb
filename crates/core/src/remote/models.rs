//! Wire models for the Redash REST API.

use redash_error::{ErrorCode, RedashError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Remote job lifecycle, as reported by `GET /api/jobs/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TryFrom<u8> for JobStatus {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(JobStatus::Pending),
            2 => Ok(JobStatus::Running),
            3 => Ok(JobStatus::Succeeded),
            4 => Ok(JobStatus::Failed),
            5 => Ok(JobStatus::Cancelled),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => 1,
            JobStatus::Running => 2,
            JobStatus::Succeeded => 3,
            JobStatus::Failed => 4,
            JobStatus::Cancelled => 5,
        }
    }
}

/// Failure description attached to a job: either a bare message or
/// `{ "message": ..., "code": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobError {
    Message(String),
    Detailed {
        message: String,
        #[serde(default)]
        code: Option<i64>,
    },
}

impl JobError {
    pub fn message(&self) -> &str {
        match self {
            JobError::Message(m) => m,
            JobError::Detailed { message, .. } => message,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            JobError::Message(_) => None,
            JobError::Detailed { code, .. } => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<JobError>,
    #[serde(default)]
    pub query_result_id: Option<i64>,
}

impl Job {
    /// Error describing a failed job. Falls back to a generic message when the
    /// server sent none.
    pub fn failure(&self) -> RedashError {
        match self.error.as_ref().filter(|e| !e.message().trim().is_empty()) {
            Some(error) => {
                RedashError::execution_failed(Some(self.id.clone()), error.code(), error.message())
            }
            None => RedashError::execution_failed(
                Some(self.id.clone()),
                None,
                "Query execution failed and the server did not describe the failure",
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

/// A fetched result set: column metadata plus rows keyed by column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultPayload {
    pub id: Option<i64>,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Map<String, Json>>,
    pub runtime: Option<f64>,
    pub retrieved_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResultBody {
    #[serde(default)]
    id: Option<i64>,
    data: ResultData,
    #[serde(default)]
    runtime: Option<f64>,
    #[serde(default)]
    retrieved_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    rows: Vec<Map<String, Json>>,
}

impl ResultPayload {
    /// Parse a `{"query_result": {...}}` envelope.
    pub fn from_envelope(body: &Json) -> Result<Self> {
        let inner = body.get("query_result").ok_or_else(|| missing_key(body, "query_result"))?;
        Self::from_body(inner)
    }

    pub(crate) fn from_body(body: &Json) -> Result<Self> {
        let parsed: QueryResultBody = serde_json::from_value(body.clone())?;
        Ok(ResultPayload {
            id: parsed.id,
            columns: parsed.data.columns,
            rows: parsed.data.rows,
            runtime: parsed.runtime,
            retrieved_at: parsed.retrieved_at,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Response of `POST /api/queries/{id}/results`.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The server answered from its own result store.
    Ready(ResultPayload),
    /// A job was enqueued.
    Job(Job),
}

impl Submission {
    pub fn from_response(body: &Json) -> Result<Self> {
        if let Some(job) = body.get("job") {
            return Ok(Submission::Job(serde_json::from_value(job.clone())?));
        }
        if body.get("query_result").is_some() {
            return Ok(Submission::Ready(ResultPayload::from_envelope(body)?));
        }
        Err(missing_key(body, "job"))
    }
}

/// Identity and version of the persistent server-side query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHandle {
    pub id: i64,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub data_source_id: Option<i64>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub latest_query_data_id: Option<i64>,
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl QueryRecord {
    pub fn handle(&self) -> QueryHandle {
        QueryHandle {
            id: self.id,
            version: self.version,
        }
    }

    pub fn owner_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// An account as listed by `GET /api/users`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Group ids or group objects, depending on the server version.
    #[serde(default)]
    pub groups: Vec<Json>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub disabled_at: Option<String>,
    #[serde(default)]
    pub auth_type: Option<String>,
}

/// One page (1-based) of a paged listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.count <= self.page * self.page_size
    }
}

pub type QueryPage = Page<QueryRecord>;
pub type UserPage = Page<UserRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: UserRef,
    #[serde(default)]
    pub client_config: Option<ClientConfig>,
}

impl SessionInfo {
    pub fn server_version(&self) -> Option<&str> {
        self.client_config.as_ref()?.version.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub paused: Option<i64>,
    #[serde(default)]
    pub view_only: Option<bool>,
}

fn missing_key(body: &Json, key: &str) -> RedashError {
    let message = body
        .get("message")
        .and_then(Json::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Response has no '{}' member", key));
    RedashError::new(ErrorCode::InvalidResponse, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_with_string_error() {
        let job: Job = serde_json::from_value(json!({
            "id": "abc", "status": 4, "error": "relation \"foo\" does not exist",
            "query_result_id": null, "updated_at": 0
        }))
        .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let err = job.failure();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
        assert_eq!(err.message, "relation \"foo\" does not exist");
    }

    #[test]
    fn test_job_with_structured_error() {
        let job: Job = serde_json::from_value(json!({
            "id": "abc", "status": 4, "error": {"message": "timeout", "code": 42}
        }))
        .unwrap();
        assert_eq!(job.error.as_ref().and_then(JobError::code), Some(42));
        assert_eq!(job.failure().message, "timeout");
    }

    #[test]
    fn test_job_with_empty_error_gets_generic_message() {
        let job: Job =
            serde_json::from_value(json!({"id": "abc", "status": 4, "error": ""})).unwrap();
        assert!(job.failure().message.contains("did not describe"));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_value::<Job>(json!({"id": "x", "status": 9})).is_err());
    }

    #[test]
    fn test_submission_variants() {
        let pending = Submission::from_response(&json!({"job": {"id": "j1", "status": 1}})).unwrap();
        assert!(matches!(pending, Submission::Job(ref j) if j.id == "j1"));

        let ready = Submission::from_response(&json!({"query_result": {
            "id": 7,
            "data": {"columns": [{"name": "n", "type": "integer"}], "rows": [{"n": 1}]}
        }}))
        .unwrap();
        match ready {
            Submission::Ready(payload) => {
                assert_eq!(payload.id, Some(7));
                assert_eq!(payload.row_count(), 1);
                assert_eq!(payload.columns[0].declared_type.as_deref(), Some("integer"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = Submission::from_response(&json!({"message": "Query is archived"})).unwrap_err();
        assert_eq!(err.message, "Query is archived");
    }

    #[test]
    fn test_query_page_termination() {
        let page = QueryPage {
            count: 500,
            page: 2,
            page_size: 250,
            results: vec![],
        };
        assert!(page.is_last());
        let page = QueryPage { page: 1, ..page };
        assert!(!page.is_last());
    }

    #[test]
    fn test_user_page_decodes_group_shapes() {
        let page: UserPage = serde_json::from_value(json!({
            "count": 2, "page": 1, "page_size": 25,
            "results": [
                {"id": 1, "name": "Ada", "email": "ada@example.com", "groups": [1, 2],
                 "is_disabled": false, "auth_type": "password"},
                {"id": 2, "name": "Grace", "groups": [{"id": 1, "name": "admin"}],
                 "is_disabled": true, "disabled_at": "2024-03-01T10:00:00"}
            ]
        }))
        .unwrap();
        assert!(page.is_last());
        assert_eq!(page.results[0].groups, vec![json!(1), json!(2)]);
        assert!(page.results[1].is_disabled);
        assert_eq!(page.results[1].email, None);
    }
}
