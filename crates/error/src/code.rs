use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following RDQ-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Transport errors (network, HTTP status)
/// - **2000-2999**: Execution errors (remote job failure, cancellation)
/// - **3000-3999**: Decode errors (value coercion, payload shape)
/// - **4000-4999**: Configuration and identity errors
/// - **5000-5999**: Internal errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Transport Errors (1000-1999) ===
    /// RDQ-1001: Connection could not be established or was dropped
    ConnectionFailed = 1001,
    /// RDQ-1002: Server answered with a non-success HTTP status
    HttpStatus = 1002,
    /// RDQ-1003: Server answered with a permanent redirect
    Redirected = 1003,
    /// RDQ-1004: Response body could not be read
    InvalidResponse = 1004,

    // === Execution Errors (2000-2999) ===
    /// RDQ-2001: Remote job reported failure
    ExecutionFailed = 2001,
    /// RDQ-2002: Remote job was cancelled on the server side
    RemoteJobCancelled = 2002,
    /// RDQ-2003: Cooperative cancel observed while a cursor was fetching
    QueryCancelled = 2003,
    /// RDQ-2004: Cursor failed earlier and cannot resume
    CursorUnusable = 2004,

    // === Decode Errors (3000-3999) ===
    /// RDQ-3001: Value could not be coerced to its column type
    DecodeFailed = 3001,
    /// RDQ-3002: Column label or position not present in the result
    ColumnNotFound = 3002,
    /// RDQ-3003: Response JSON did not have the expected shape
    MalformedPayload = 3003,

    // === Configuration Errors (4000-4999) ===
    /// RDQ-4001: Configuration failed to load or validate
    InvalidConfig = 4001,
    /// RDQ-4002: Requested data source is not visible to the caller
    DataSourceNotFound = 4002,
    /// RDQ-4003: API key rejected
    AuthenticationFailed = 4003,

    // === Internal Errors (5000-5999) ===
    /// RDQ-5001: Unexpected internal state
    Internal = 5001,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "RDQ-3001")
    pub fn as_str(&self) -> String {
        format!("RDQ-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Transport,
            2000..=2999 => ErrorCategory::Execution,
            3000..=3999 => ErrorCategory::Decode,
            4000..=4999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("RDQ-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::ConnectionFailed),
            1002 => Ok(Self::HttpStatus),
            1003 => Ok(Self::Redirected),
            1004 => Ok(Self::InvalidResponse),
            2001 => Ok(Self::ExecutionFailed),
            2002 => Ok(Self::RemoteJobCancelled),
            2003 => Ok(Self::QueryCancelled),
            2004 => Ok(Self::CursorUnusable),
            3001 => Ok(Self::DecodeFailed),
            3002 => Ok(Self::ColumnNotFound),
            3003 => Ok(Self::MalformedPayload),
            4001 => Ok(Self::InvalidConfig),
            4002 => Ok(Self::DataSourceNotFound),
            4003 => Ok(Self::AuthenticationFailed),
            5001 => Ok(Self::Internal),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category.
///
/// Lets callers tell a malformed-data problem from a remote-side execution problem
/// without matching individual codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Transport,
    Execution,
    Decode,
    Config,
    Internal,
}
