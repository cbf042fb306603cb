//! # Error Contexts
//!
//! Structured metadata attached to errors so callers can react programmatically.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for transport failures (RDQ-1xxx)
    Transport {
        method: String,
        path: String,
        status: Option<u16>,
    },

    /// Context for RDQ-2001/2002
    Execution {
        job_id: Option<String>,
        remote_code: Option<i64>,
    },

    /// Context for RDQ-3001 (DecodeFailed)
    Decode {
        column: String,
        raw_value: String,
        expected: String,
    },

    /// Context for RDQ-3002 (ColumnNotFound)
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// Context for RDQ-4002 (DataSourceNotFound)
    DataSource {
        requested: String,
        available: Vec<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
