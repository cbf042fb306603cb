//! Structured exit codes for machine-readable error handling.
//!
//! Scripts can tell a bad query from an unreachable server from a user abort.

use redash_error::{ErrorCategory, ErrorCode, RedashError};

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// Configuration error (missing host, invalid file, unknown data source)
pub const CONFIG_ERROR: i32 = 3;

/// Transport error (server unreachable, HTTP failure, malformed response)
pub const CONNECTION_ERROR: i32 = 4;

/// The remote job failed
pub const EXECUTION_ERROR: i32 = 5;

/// A value could not be decoded
pub const DECODE_ERROR: i32 = 6;

/// Authentication rejected
pub const PERMISSION_ERROR: i32 = 7;

/// Interrupted by the user (128 + SIGINT)
pub const CANCELLED: i32 = 130;

pub fn for_error(error: &RedashError) -> i32 {
    match error.code {
        ErrorCode::AuthenticationFailed => return PERMISSION_ERROR,
        ErrorCode::QueryCancelled => return CANCELLED,
        _ => {}
    }
    match error.category() {
        ErrorCategory::Transport => CONNECTION_ERROR,
        ErrorCategory::Execution => EXECUTION_ERROR,
        ErrorCategory::Decode => DECODE_ERROR,
        ErrorCategory::Config => CONFIG_ERROR,
        ErrorCategory::Internal => GENERAL_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Exit code for any error surfaced by a command.
pub fn map_error(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<RedashError>() {
        Some(redash) => for_error(redash),
        None if error.to_string().to_lowercase().contains("config") => CONFIG_ERROR,
        None => GENERAL_ERROR,
    }
}
