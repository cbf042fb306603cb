pub use crate::models::Dialect;
use crate::models::{deserialize_secret, serialize_secret};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Default constants
pub const DEFAULT_QUERY_NAME: &str = "redash-query";
pub const DEFAULT_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_LISTING_PAGE_SIZE: usize = 250;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 0;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const ENV_PREFIX: &str = "REDASH";

#[derive(Debug, Serialize, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    #[validate(nested)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ConnectionSettings {
    /// Host of the Redash server, optionally with port (`redash.example.com:5000`)
    /// or a full `http(s)://` base URL.
    #[serde(default)]
    #[validate(custom(function = "validate_host"))]
    pub host: String,

    /// User API key, sent as `Authorization: Key <token>`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub token: Option<SecretString>,

    #[serde(default = "default_ssl")]
    pub ssl: bool,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Data source (catalog) name; the first listed data source when absent.
    #[serde(default)]
    pub data_source: Option<String>,

    /// Name of the persistent server-side query object reused for every execution.
    #[serde(default = "default_query_name")]
    #[validate(length(min = 1))]
    pub query_name: String,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: None,
            ssl: default_ssl(),
            user_agent: None,
            data_source: None,
            query_name: default_query_name(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ConnectionSettings {
    /// Base URL derived from `host` and `ssl`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if self.ssl {
            format!("https://{}", host)
        } else {
            format!("http://{}", host)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ExecutionSettings {
    /// Rows per paginator page.
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub page_size: usize,

    /// Page size used when walking server-side listings (queries, users).
    #[serde(default = "default_listing_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub listing_page_size: usize,

    /// Result cache freshness window; 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Overrides the dialect derived from the data source type.
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            listing_page_size: default_listing_page_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            dialect: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_ssl() -> bool {
    true
}

fn default_query_name() -> String {
    DEFAULT_QUERY_NAME.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_listing_page_size() -> usize {
    DEFAULT_LISTING_PAGE_SIZE
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn validate_host(host: &str) -> Result<(), validator::ValidationError> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(validator::ValidationError::new("host_required"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    match url::Url::parse(&candidate) {
        Ok(u) if u.host_str().is_some() => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_host")),
    }
}

impl AppConfig {
    /// Load from an optional file, then overlay `REDASH_*` environment variables
    /// (`REDASH_CONNECTION__HOST` maps to `connection.host`), and validate.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(path)?.validated()
    }

    /// Same layering as [`from_file`](Self::from_file) without validation, for
    /// callers that apply their own overrides first.
    pub fn load(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        cfg.try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;
        Ok(self)
    }
}
