//! Column type model and value coercion.
//!
//! Redash reports a loose type name per column (`"integer"`, `"datetime"`, ...) and
//! ships every value as JSON, usually as a string. This module maps declared type
//! names onto [`ColumnType`], coerces raw JSON values into typed [`Value`]s and
//! renders values back as SQL literals for keyset predicates.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use redash_error::RedashError;
use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static SNIFF_TIMESTAMP_MILLIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}$").unwrap());
static SNIFF_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$").unwrap());
static SNIFF_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static SNIFF_TIME_MILLIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}\.\d{3}$").unwrap());
static SNIFF_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap());
static SNIFF_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9.\-]+$").unwrap());

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

/// Logical type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Integer,
    Decimal,
    Boolean,
    /// No usable declared type; values are sniffed one by one.
    Object,
    String,
}

/// Backend family behind a data source, for backend-specific type quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Generic,
    Oracle,
}

impl Backend {
    pub fn from_source_type(source_type: &str) -> Self {
        if source_type.eq_ignore_ascii_case("oracle") {
            Backend::Oracle
        } else {
            Backend::Generic
        }
    }
}

impl ColumnType {
    /// Map a declared type name. Lookup is case-insensitive, unknown names fall
    /// back to `String` and a missing declaration yields `Object`.
    pub fn from_declared(declared: Option<&str>, backend: Backend) -> Self {
        let name = match declared {
            Some(name) if !name.trim().is_empty() => name.trim().to_ascii_lowercase(),
            _ => return ColumnType::Object,
        };

        // Oracle NUMBER columns are reported as float or integer regardless of scale.
        if backend == Backend::Oracle && matches!(name.as_str(), "float" | "integer") {
            return ColumnType::Decimal;
        }

        match name.as_str() {
            "datetime" | "timestamp" | "timestamp without time zone" => ColumnType::Timestamp,
            "datetimetz" | "timestamptz" | "timestamp with time zone" => ColumnType::TimestampTz,
            "date" => ColumnType::Date,
            "time" | "time without time zone" => ColumnType::Time,
            "timetz" | "time with time zone" => ColumnType::TimeTz,
            "integer" | "int" | "long" | "bigint" | "smallint" | "tinyint" => ColumnType::Integer,
            "float" | "double" | "real" | "decimal" | "numeric" | "number" => ColumnType::Decimal,
            "boolean" | "bool" => ColumnType::Boolean,
            "json" | "object" => ColumnType::Object,
            _ => ColumnType::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamp with time zone",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::TimeTz => "time with time zone",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Object => "object",
            ColumnType::String => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Nested JSON (arrays, objects) passed through untouched.
    Json(Json),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("'{raw}' is not a valid {expected}")]
pub struct CoerceError {
    pub raw: String,
    pub expected: &'static str,
}

impl CoerceError {
    fn new(raw: impl Into<String>, expected: &'static str) -> Self {
        Self {
            raw: raw.into(),
            expected,
        }
    }

    pub fn into_redash_error(self, column: &str) -> RedashError {
        RedashError::decode(column, self.raw, self.expected)
    }
}

/// String form of a raw JSON value as the server sent it.
pub fn raw_text(raw: &Json) -> String {
    match raw {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a raw JSON value according to its column type.
pub fn coerce(column_type: ColumnType, raw: &Json) -> Result<Value, CoerceError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match column_type {
        ColumnType::Object => Ok(sniff(raw)),
        ColumnType::String => Ok(Value::String(raw_text(raw))),
        ColumnType::Boolean => coerce_boolean(raw),
        ColumnType::Integer => coerce_integer(raw),
        ColumnType::Decimal => coerce_decimal(raw),
        ColumnType::Timestamp => {
            parse_timestamp(raw_text(raw).trim()).map(Value::Timestamp).ok_or_else(|| {
                CoerceError::new(raw_text(raw), ColumnType::Timestamp.name())
            })
        }
        ColumnType::TimestampTz => parse_timestamp_tz(raw_text(raw).trim())
            .map(Value::TimestampTz)
            .ok_or_else(|| CoerceError::new(raw_text(raw), ColumnType::TimestampTz.name())),
        ColumnType::Date => parse_date(raw_text(raw).trim())
            .map(Value::Date)
            .ok_or_else(|| CoerceError::new(raw_text(raw), ColumnType::Date.name())),
        ColumnType::Time | ColumnType::TimeTz => parse_time(raw_text(raw).trim())
            .map(Value::Time)
            .ok_or_else(|| CoerceError::new(raw_text(raw), column_type.name())),
    }
}

/// Infer a value for an untyped column. Native JSON numbers and booleans keep
/// their type; strings are matched against fixed temporal and numeric shapes,
/// and anything else stays a string.
pub fn sniff(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => sniff_str(s),
        other => Value::Json(other.clone()),
    }
}

fn sniff_str(raw: &str) -> Value {
    let s = raw.trim();
    let parsed = if SNIFF_TIMESTAMP_MILLIS.is_match(s) {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f")
            .ok()
            .map(Value::Timestamp)
    } else if SNIFF_TIMESTAMP.is_match(s) {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(Value::Timestamp)
    } else if SNIFF_DATE.is_match(s) {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date)
    } else if SNIFF_TIME_MILLIS.is_match(s) {
        NaiveTime::parse_from_str(s, "%H:%M:%S%.3f").ok().map(Value::Time)
    } else if SNIFF_TIME.is_match(s) {
        NaiveTime::parse_from_str(s, "%H:%M:%S").ok().map(Value::Time)
    } else if SNIFF_NUMBER.is_match(s) {
        s.parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| s.parse::<f64>().map(Value::Float))
            .ok()
    } else {
        None
    };

    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn coerce_boolean(raw: &Json) -> Result<Value, CoerceError> {
    match raw {
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => Ok(Value::Boolean(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        Json::String(s) => parse_bool(s)
            .map(Value::Boolean)
            .ok_or_else(|| CoerceError::new(s.as_str(), ColumnType::Boolean.name())),
        other => Err(CoerceError::new(other.to_string(), ColumnType::Boolean.name())),
    }
}

fn coerce_integer(raw: &Json) -> Result<Value, CoerceError> {
    let expected = ColumnType::Integer.name();
    match raw {
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| CoerceError::new(n.to_string(), expected)),
        },
        Json::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        Json::String(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .map(Value::Integer)
                .or_else(|_| t.parse::<f64>().map(Value::Float))
                .map_err(|_| CoerceError::new(s.as_str(), expected))
        }
        other => Err(CoerceError::new(other.to_string(), expected)),
    }
}

fn coerce_decimal(raw: &Json) -> Result<Value, CoerceError> {
    let text = match raw {
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.trim().to_string(),
        Json::Bool(b) => return Ok(Value::Decimal(Decimal::from(i64::from(*b)))),
        other => return Err(CoerceError::new(other.to_string(), ColumnType::Decimal.name())),
    };
    parse_decimal(&text)
        .map(Value::Decimal)
        .ok_or_else(|| CoerceError::new(raw_text(raw), ColumnType::Decimal.name()))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(Decimal::from_f64))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_timestamp_with_offset(s).map(|dt| dt.naive_local()))
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_timestamp_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        OFFSET_TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    })
}

pub(crate) fn parse_timestamp_tz(s: &str) -> Option<DateTime<FixedOffset>> {
    parse_timestamp_with_offset(s).or_else(|| {
        // No offset on the wire: the server renders these in UTC.
        parse_timestamp(s).map(|naive| naive.and_utc().fixed_offset())
    })
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parses `HH:MM:SS[.fff]`, dropping a trailing zone designator (`Z`, `+hh:mm`).
pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    let local = s.split(['+', '-', 'Z']).next().unwrap_or(s).trim();
    NaiveTime::parse_from_str(local, "%H:%M:%S%.f").ok()
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::Decimal(d) => d.trunc().to_i64(),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::String(s) => {
                let t = s.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Float(f) => Decimal::from_f64(*f),
            Value::Decimal(d) => Some(*d),
            Value::Boolean(b) => Some(Decimal::from(i64::from(*b))),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Decimal(d) => Some(!d.is_zero()),
            Value::String(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn to_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::TimestampTz(ts) => Some(ts.naive_local()),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::String(s) => parse_timestamp(s.trim()),
            _ => None,
        }
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            Value::TimestampTz(ts) => Some(ts.naive_local().date()),
            Value::String(s) => parse_date(s.trim()).or_else(|| parse_timestamp(s.trim()).map(|t| t.date())),
            _ => None,
        }
    }

    pub fn to_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Timestamp(ts) => Some(ts.time()),
            Value::TimestampTz(ts) => Some(ts.naive_local().time()),
            Value::String(s) => {
                parse_time(s.trim()).or_else(|| parse_timestamp(s.trim()).map(|t| t.time()))
            }
            _ => None,
        }
    }

    /// Ordering between comparable values; numbers compare across variants.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::TimestampTz(a), Value::TimestampTz(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Decimal(_), Value::Integer(_) | Value::Decimal(_)) => {
                Some(self.to_decimal()?.cmp(&other.to_decimal()?))
            }
            (
                Value::Integer(_) | Value::Float(_) | Value::Decimal(_),
                Value::Integer(_) | Value::Float(_) | Value::Decimal(_),
            ) => self.to_f64()?.partial_cmp(&other.to_f64()?),
            _ => None,
        }
    }

    /// Render as a SQL literal usable in a `WHERE col > <literal>` predicate.
    /// `None` for SQL NULL.
    pub fn to_sql_literal(&self) -> Option<String> {
        let literal = match self {
            Value::Null => return None,
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::String(s) => quote(s),
            Value::Json(j) => quote(&j.to_string()),
            Value::Date(d) => format!("date'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("time'{}'", t.format("%H:%M:%S%.3f")),
            Value::Timestamp(ts) => format!("timestamp'{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
            Value::TimestampTz(ts) => {
                format!("timestamp'{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f%:z"))
            }
        };
        Some(literal)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Json(j) => write!(f, "{}", j),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) if t.nanosecond() == 0 => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.3f")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
            Value::TimestampTz(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f%:z")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_declared_type_lookup_is_case_insensitive() {
        let g = Backend::Generic;
        assert_eq!(ColumnType::from_declared(Some("DATETIME"), g), ColumnType::Timestamp);
        assert_eq!(ColumnType::from_declared(Some("Integer"), g), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared(Some("float"), g), ColumnType::Decimal);
        assert_eq!(ColumnType::from_declared(Some("boolean"), g), ColumnType::Boolean);
        assert_eq!(ColumnType::from_declared(Some("date"), g), ColumnType::Date);
        assert_eq!(ColumnType::from_declared(Some("geometry"), g), ColumnType::String);
        assert_eq!(ColumnType::from_declared(None, g), ColumnType::Object);
        assert_eq!(ColumnType::from_declared(Some(""), g), ColumnType::Object);
    }

    #[test]
    fn test_oracle_numbers_map_to_decimal() {
        assert_eq!(
            ColumnType::from_declared(Some("integer"), Backend::Oracle),
            ColumnType::Decimal
        );
        assert_eq!(
            ColumnType::from_declared(Some("INTEGER"), Backend::Generic),
            ColumnType::Integer
        );
        assert_eq!(Backend::from_source_type("Oracle"), Backend::Oracle);
        assert_eq!(Backend::from_source_type("pg"), Backend::Generic);
    }

    #[test]
    fn test_sniff_temporal_shapes() {
        assert_eq!(
            sniff(&json!("2024-03-01T10:20:30.123")),
            Value::Timestamp(ts("2024-03-01 10:20:30.123"))
        );
        assert_eq!(
            sniff(&json!("2024-03-01T10:20:30")),
            Value::Timestamp(ts("2024-03-01 10:20:30"))
        );
        assert_eq!(
            sniff(&json!(" 2024-03-01 ")),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(
            sniff(&json!("10:20:30.500")),
            Value::Time(NaiveTime::from_hms_milli_opt(10, 20, 30, 500).unwrap())
        );
        assert_eq!(
            sniff(&json!("10:20:30")),
            Value::Time(NaiveTime::from_hms_opt(10, 20, 30).unwrap())
        );
    }

    #[test]
    fn test_sniff_numbers_and_fallbacks() {
        assert_eq!(sniff(&json!("42")), Value::Integer(42));
        assert_eq!(sniff(&json!("-1.5")), Value::Float(-1.5));
        assert_eq!(sniff(&json!("1.2.3")), Value::String("1.2.3".into()));
        assert_eq!(sniff(&json!("hello")), Value::String("hello".into()));
        assert_eq!(sniff(&json!(7)), Value::Integer(7));
        assert_eq!(sniff(&json!(2.5)), Value::Float(2.5));
        assert_eq!(sniff(&json!(true)), Value::Boolean(true));
        assert_eq!(sniff(&json!(null)), Value::Null);
        // Lengths that match no temporal shape stay strings.
        assert_eq!(
            sniff(&json!("2024-03-01T10:20")),
            Value::String("2024-03-01T10:20".into())
        );
    }

    #[test]
    fn test_coerce_declared_types() {
        assert_eq!(
            coerce(ColumnType::Timestamp, &json!("2024-03-01 10:20:30")).unwrap(),
            Value::Timestamp(ts("2024-03-01 10:20:30"))
        );
        assert_eq!(
            coerce(ColumnType::Timestamp, &json!("2024-03-01T10:20:30.250000+00:00")).unwrap(),
            Value::Timestamp(ts("2024-03-01 10:20:30.250"))
        );
        assert_eq!(
            coerce(ColumnType::Integer, &json!("12")).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            coerce(ColumnType::Decimal, &json!(1.25)).unwrap(),
            Value::Decimal(Decimal::new(125, 2))
        );
        assert_eq!(
            coerce(ColumnType::Boolean, &json!("false")).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            coerce(ColumnType::String, &json!(12)).unwrap(),
            Value::String("12".into())
        );
        assert_eq!(
            coerce(ColumnType::TimeTz, &json!("08:15:00+02:00")).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(8, 15, 0).unwrap())
        );
        assert_eq!(coerce(ColumnType::Date, &json!(null)).unwrap(), Value::Null);
    }

    #[test]
    fn test_malformed_timestamp_is_a_coerce_error() {
        let err = coerce(ColumnType::Timestamp, &json!("last tuesday")).unwrap_err();
        assert_eq!(err.raw, "last tuesday");
        assert_eq!(err.expected, "timestamp");

        let redash = err.into_redash_error("created_at");
        assert_eq!(redash.code, redash_error::ErrorCode::DecodeFailed);
        assert!(redash.message.contains("created_at"));
        assert!(redash.message.contains("last tuesday"));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(Value::Integer(5).to_sql_literal().unwrap(), "5");
        assert_eq!(Value::Boolean(true).to_sql_literal().unwrap(), "true");
        assert_eq!(
            Value::String("O'Brien".into()).to_sql_literal().unwrap(),
            "'O''Brien'"
        );
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
                .to_sql_literal()
                .unwrap(),
            "date'2024-01-02'"
        );
        assert_eq!(
            Value::Time(NaiveTime::from_hms_milli_opt(3, 4, 5, 60).unwrap())
                .to_sql_literal()
                .unwrap(),
            "time'03:04:05.060'"
        );
        assert_eq!(
            Value::Timestamp(ts("2024-01-02 03:04:05"))
                .to_sql_literal()
                .unwrap(),
            "timestamp'2024-01-02 03:04:05.000'"
        );
        assert_eq!(Value::Null.to_sql_literal(), None);
    }

    #[test]
    fn test_compare_across_numeric_variants() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Decimal(Decimal::new(15, 1))),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Float(1.0).compare(&Value::Integer(1)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::String("a".into()).compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::String(" 17 ".into()).to_i64(), Some(17));
        assert_eq!(Value::Decimal(Decimal::new(199, 2)).to_i64(), Some(1));
        assert_eq!(Value::Integer(0).to_bool(), Some(false));
        assert_eq!(
            Value::String("2024-03-01".into()).to_timestamp(),
            Some(ts("2024-03-01 00:00:00"))
        );
        assert_eq!(Value::Timestamp(ts("2024-03-01 10:00:00")).to_f64(), None);
    }
}
