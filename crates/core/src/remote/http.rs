//! `ControlPlane` over the Redash REST API.

use super::models::{
    DataSource, Job, QueryHandle, QueryPage, QueryRecord, ResultPayload, SessionInfo, Submission,
    UserPage,
};
use super::ControlPlane;
use async_trait::async_trait;
use redash_common::config::ConnectionSettings;
use redash_error::{ErrorCode, ErrorContext, RedashError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::{json, Value as Json};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_USER_AGENT: &str = concat!("redash-query/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: reqwest::Client,
    base_url: String,
}

impl HttpControlPlane {
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let token = settings.token.as_ref().map(|t| t.expose_secret().to_string());
        Self::build(
            settings.base_url(),
            token.as_deref(),
            settings.user_agent.as_deref(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    /// Client against an explicit base URL (`http://host:port`).
    pub fn with_base_url(base_url: impl Into<String>, token: Option<&str>) -> Result<Self> {
        Self::build(base_url.into(), token, None, Duration::from_secs(60))
    }

    fn build(
        base_url: String,
        token: Option<&str>,
        user_agent: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Key {}", token)).map_err(|_| {
                RedashError::new(
                    ErrorCode::InvalidConfig,
                    "API token contains characters not allowed in an HTTP header",
                )
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        let agent = HeaderValue::from_str(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RedashError::new(
                    ErrorCode::ConnectionFailed,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Json>) -> Result<Json> {
        let url = format!("{}{}", self.base_url, path);
        debug!(target: "transport", %method, path, "request");

        let mut builder = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let transport = |status: Option<u16>| ErrorContext::Transport {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };

        let response = builder.send().await.map_err(|e| {
            RedashError::new(
                ErrorCode::ConnectionFailed,
                format!("Request to {} failed: {}", path, e),
            )
            .with_context(transport(None))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            RedashError::new(
                ErrorCode::InvalidResponse,
                format!("Failed to read response body of {}: {}", path, e),
            )
            .with_context(transport(Some(status.as_u16())))
        })?;
        debug!(target: "transport", %method, path, status = status.as_u16(), "response");

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                RedashError::new(
                    ErrorCode::InvalidResponse,
                    format!("Response of {} is not valid JSON: {}", path, e),
                )
                .with_context(transport(Some(status.as_u16())))
            });
        }

        let detail = serde_json::from_str::<Json>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(Json::as_str).map(str::to_string))
            .unwrap_or_else(|| text.trim().to_string());

        let error = match status {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::PERMANENT_REDIRECT => {
                RedashError::new(
                    ErrorCode::Redirected,
                    format!("{} was redirected ({})", path, status),
                )
                .with_hint("Check the host and the ssl setting of the connection")
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RedashError::new(
                ErrorCode::AuthenticationFailed,
                format!("{} rejected the credentials ({}): {}", path, status, detail),
            )
            .with_hint("Check the API key of the connection"),
            _ => RedashError::new(
                ErrorCode::HttpStatus,
                format!("{} returned {}: {}", path, status, detail),
            ),
        };
        Err(error.with_context(transport(Some(status.as_u16()))))
    }

    async fn get(&self, path: &str) -> Result<Json> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Json) -> Result<Json> {
        self.request(Method::POST, path, Some(body)).await
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn session(&self) -> Result<SessionInfo> {
        let body = self.get("/api/session").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>> {
        let body = self.get("/api/data_sources").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn list_queries(&self, page: usize, page_size: usize) -> Result<QueryPage> {
        let path = format!("/api/queries?page_size={}&page={}", page_size, page);
        let body = self.get(&path).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn users(&self, page: usize, page_size: usize) -> Result<UserPage> {
        let path = format!("/api/users?page_size={}&page={}", page_size, page);
        let body = self.get(&path).await?;
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_query(&self, name: &str, data_source_id: i64) -> Result<QueryRecord> {
        let body = json!({
            "schedule": null,
            "name": name,
            "data_source_id": data_source_id,
            "options": { "apply_auto_limit": false, "parameters": [] },
            "query": "",
            "tags": []
        });
        let response = self.post("/api/queries", &body).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn upsert_query(
        &self,
        query: &QueryHandle,
        data_source_id: i64,
        sql: &str,
    ) -> Result<QueryHandle> {
        let body = json!({
            "id": query.id,
            "data_source_id": data_source_id,
            "query": sql,
            "latest_query_data_id": null,
            "is_draft": true,
            "version": query.version
        });
        let response = self.post(&format!("/api/queries/{}", query.id), &body).await?;
        let version = response
            .get("version")
            .and_then(Json::as_i64)
            .unwrap_or(query.version);
        Ok(QueryHandle {
            id: query.id,
            version,
        })
    }

    async fn submit(&self, query_id: i64) -> Result<Submission> {
        let body = json!({
            "id": query_id,
            "parameters": {},
            "apply_auto_limit": false,
            "max_age": 0
        });
        let response = self
            .post(&format!("/api/queries/{}/results", query_id), &body)
            .await?;
        Submission::from_response(&response)
    }

    async fn job(&self, job_id: &str) -> Result<Job> {
        let response = self.get(&format!("/api/jobs/{}", job_id)).await?;
        match response.get("job") {
            Some(job) => Ok(serde_json::from_value(job.clone())?),
            None => {
                let message = response
                    .get("message")
                    .and_then(Json::as_str)
                    .unwrap_or("Job status response has no 'job' member");
                Err(RedashError::execution_failed(
                    Some(job_id.to_string()),
                    None,
                    message,
                ))
            }
        }
    }

    async fn query_result(&self, query_id: i64) -> Result<ResultPayload> {
        let body = self.get(&format!("/api/queries/{}/results", query_id)).await?;
        ResultPayload::from_envelope(&body)
    }

    async fn result_by_id(&self, result_id: i64) -> Result<ResultPayload> {
        let body = self.get(&format!("/api/query_results/{}", result_id)).await?;
        ResultPayload::from_envelope(&body)
    }
}
