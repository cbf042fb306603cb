use redash_error::{ErrorCode, ErrorContext, RedashError};
use serde_json::Value;

#[test]
fn test_json_serialization() {
    let error = RedashError::new(ErrorCode::ColumnNotFound, "Column 'amout' not found")
        .with_context(ErrorContext::ColumnNotFound {
            column: "amout".to_string(),
            available: vec!["amount".to_string(), "id".to_string()],
        })
        .with_hint("Did you mean 'amount'?");

    let json = error.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "RDQ-3002");
    assert_eq!(v["message"], "Column 'amout' not found");
    assert_eq!(v["hint"], "Did you mean 'amount'?");
    assert_eq!(v["context"]["type"], "column_not_found");
    assert_eq!(v["context"]["column"], "amout");
}

#[test]
fn test_roundtrip_preserves_code() {
    let error = RedashError::execution_failed(Some("job-1".into()), None, "division by zero");
    let back: RedashError = serde_json::from_str(&error.to_json()).expect("deserialize");
    assert_eq!(back.code, ErrorCode::ExecutionFailed);
    assert_eq!(back.message, "division by zero");
}

#[test]
fn test_error_code_parsing() {
    let code: ErrorCode = "RDQ-1003".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::Redirected);
}
