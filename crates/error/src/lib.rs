//! # redash-error
//!
//! Unified error type for the redash-query engine.
//!
//! Every failure carries:
//! - A stable numeric code (RDQ-XXXX) grouped into categories
//! - Structured JSON context (column and raw value, job id, HTTP status)
//! - An optional hint for the caller

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::find_closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The error type returned by every fallible operation of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedashError {
    /// Numeric error code (e.g., "RDQ-3001")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl RedashError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// A remote job terminated in a failure state.
    pub fn execution_failed(
        job_id: Option<String>,
        remote_code: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCode::ExecutionFailed, message)
            .with_context(ErrorContext::Execution { job_id, remote_code })
    }

    /// A value could not be coerced to its column's type.
    pub fn decode(
        column: impl Into<String>,
        raw_value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let column = column.into();
        let raw_value = raw_value.into();
        let expected = expected.into();
        Self::new(
            ErrorCode::DecodeFailed,
            format!(
                "Cannot decode value '{}' of column '{}' as {}",
                raw_value, column, expected
            ),
        )
        .with_context(ErrorContext::Decode {
            column,
            raw_value,
            expected,
        })
    }

    /// A column label or position did not resolve.
    pub fn column_not_found(column: impl Into<String>, available: Vec<String>) -> Self {
        let column = column.into();
        let hint = find_closest_match(&column, &available);
        let mut error = Self::new(
            ErrorCode::ColumnNotFound,
            format!("Column '{}' not found", column),
        )
        .with_context(ErrorContext::ColumnNotFound {
            column,
            available,
        });
        if let Some(closest) = hint {
            error = error.with_hint(format!("Did you mean '{}'?", closest));
        }
        error
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Serialize to JSON for machine consumers
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize RedashError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for RedashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for RedashError {}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RedashError>;
