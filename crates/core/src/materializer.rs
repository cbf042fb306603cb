//! Typed, forward-only access to one result payload.
//!
//! Column types are resolved once at construction. Getters coerce the raw JSON
//! value of the current row on every call; untyped columns are sniffed per value.
//!
//! Null handling follows the driver contract callers rely on: numeric and
//! boolean getters return a sentinel (`-1`, `-1.0`, `false`) for a null value,
//! reference-like getters return `None`, and [`was_null`](ResultMaterializer::was_null)
//! reports whether the last value read was null.

use crate::cursor::RowCursor;
use crate::remote::ResultPayload;
use crate::types::{coerce, raw_text, Backend, ColumnType, Value};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use redash_error::{ErrorCode, RedashError, Result};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub name: String,
    pub declared_type: Option<String>,
    pub column_type: ColumnType,
}

/// A column addressed by label or by 1-based position.
pub trait ColumnRef {
    /// 0-based index into the resolved columns.
    fn resolve(&self, columns: &[ResolvedColumn]) -> Result<usize>;
}

impl ColumnRef for &str {
    fn resolve(&self, columns: &[ResolvedColumn]) -> Result<usize> {
        columns
            .iter()
            .position(|c| c.name == *self)
            .or_else(|| columns.iter().position(|c| c.name.eq_ignore_ascii_case(self)))
            .ok_or_else(|| {
                RedashError::column_not_found(
                    *self,
                    columns.iter().map(|c| c.name.clone()).collect(),
                )
            })
    }
}

impl ColumnRef for String {
    fn resolve(&self, columns: &[ResolvedColumn]) -> Result<usize> {
        self.as_str().resolve(columns)
    }
}

impl ColumnRef for &String {
    fn resolve(&self, columns: &[ResolvedColumn]) -> Result<usize> {
        self.as_str().resolve(columns)
    }
}

impl ColumnRef for usize {
    fn resolve(&self, columns: &[ResolvedColumn]) -> Result<usize> {
        if *self >= 1 && *self <= columns.len() {
            Ok(*self - 1)
        } else {
            Err(RedashError::new(
                ErrorCode::ColumnNotFound,
                format!(
                    "Column position {} is out of range (1..={})",
                    self,
                    columns.len()
                ),
            ))
        }
    }
}

#[derive(Debug)]
pub struct ResultMaterializer {
    payload: ResultPayload,
    columns: Vec<ResolvedColumn>,
    /// 1-based index of the current row; 0 before the first advance.
    position: usize,
    exhausted: bool,
    last_was_null: AtomicBool,
}

impl ResultMaterializer {
    pub fn new(payload: ResultPayload, backend: Backend) -> Self {
        let columns = payload
            .columns
            .iter()
            .map(|spec| ResolvedColumn {
                name: spec.name.clone(),
                declared_type: spec.declared_type.clone(),
                column_type: ColumnType::from_declared(spec.declared_type.as_deref(), backend),
            })
            .collect();
        Self {
            payload,
            columns,
            position: 0,
            exhausted: false,
            last_was_null: AtomicBool::new(false),
        }
    }

    /// Materializer over no columns and no rows.
    pub fn empty() -> Self {
        Self::new(ResultPayload::default(), Backend::Generic)
    }

    pub fn len(&self) -> usize {
        self.payload.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.rows.is_empty()
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn payload(&self) -> &ResultPayload {
        &self.payload
    }

    pub fn into_payload(self) -> ResultPayload {
        self.payload
    }

    /// 1-based position of a column label.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        label.resolve(&self.columns).map(|i| i + 1)
    }

    pub fn column_name(&self, position: usize) -> Result<&str> {
        let idx = position.resolve(&self.columns)?;
        Ok(&self.columns[idx].name)
    }

    pub fn column_type(&self, column: impl ColumnRef) -> Result<ColumnType> {
        let idx = column.resolve(&self.columns)?;
        Ok(self.columns[idx].column_type)
    }

    pub fn advance(&mut self) -> bool {
        if self.position < self.payload.rows.len() {
            self.position += 1;
            self.exhausted = false;
            true
        } else {
            self.exhausted = true;
            false
        }
    }

    /// Back to before the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
        self.exhausted = false;
        self.last_was_null.store(false, Ordering::Relaxed);
    }

    pub fn row(&self) -> usize {
        self.position
    }

    pub fn was_null(&self) -> bool {
        self.last_was_null.load(Ordering::Relaxed)
    }

    /// Raw value of a column on the current row; absent keys read as null.
    fn raw(&self, column: impl ColumnRef) -> Result<(&ResolvedColumn, Option<&Json>)> {
        let idx = column.resolve(&self.columns)?;
        if self.position == 0 || self.exhausted {
            return Err(RedashError::new(
                ErrorCode::Internal,
                "The cursor is not positioned on a row",
            )
            .with_hint("Call advance() and check that it returned true"));
        }
        let col = &self.columns[idx];
        let raw = self.payload.rows[self.position - 1]
            .get(&col.name)
            .filter(|v| !v.is_null());
        self.last_was_null.store(raw.is_none(), Ordering::Relaxed);
        Ok((col, raw))
    }

    fn typed(&self, column: impl ColumnRef) -> Result<Option<(&ResolvedColumn, &Json, Value)>> {
        match self.raw(column)? {
            (_, None) => Ok(None),
            (col, Some(raw)) => {
                let value = coerce(col.column_type, raw)
                    .map_err(|e| e.into_redash_error(&col.name))?;
                Ok(Some((col, raw, value)))
            }
        }
    }

    fn convert<T>(
        &self,
        column: impl ColumnRef,
        expected: &str,
        f: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.typed(column)? {
            None => Ok(None),
            Some((col, raw, value)) => f(&value)
                .map(Some)
                .ok_or_else(|| RedashError::decode(&col.name, raw_text(raw), expected)),
        }
    }

    /// Coerced value; `None` for null.
    pub fn get_object(&self, column: impl ColumnRef) -> Result<Option<Value>> {
        Ok(self.typed(column)?.map(|(_, _, value)| value))
    }

    /// The value as the server sent it, without coercion.
    pub fn get_string(&self, column: impl ColumnRef) -> Result<Option<String>> {
        Ok(self.raw(column)?.1.map(raw_text))
    }

    pub fn get_long(&self, column: impl ColumnRef) -> Result<i64> {
        Ok(self.convert(column, "integer", Value::to_i64)?.unwrap_or(-1))
    }

    pub fn get_int(&self, column: impl ColumnRef) -> Result<i32> {
        Ok(self
            .convert(column, "32-bit integer", |v| {
                v.to_i64().and_then(|i| i32::try_from(i).ok())
            })?
            .unwrap_or(-1))
    }

    pub fn get_double(&self, column: impl ColumnRef) -> Result<f64> {
        Ok(self.convert(column, "double", Value::to_f64)?.unwrap_or(-1.0))
    }

    pub fn get_big_decimal(&self, column: impl ColumnRef) -> Result<Option<Decimal>> {
        self.convert(column, "decimal", Value::to_decimal)
    }

    pub fn get_boolean(&self, column: impl ColumnRef) -> Result<bool> {
        Ok(self.convert(column, "boolean", Value::to_bool)?.unwrap_or(false))
    }

    pub fn get_timestamp(&self, column: impl ColumnRef) -> Result<Option<NaiveDateTime>> {
        self.convert(column, "timestamp", Value::to_timestamp)
    }

    pub fn get_date(&self, column: impl ColumnRef) -> Result<Option<NaiveDate>> {
        self.convert(column, "date", Value::to_date)
    }

    pub fn get_time(&self, column: impl ColumnRef) -> Result<Option<NaiveTime>> {
        self.convert(column, "time", Value::to_time)
    }

    /// All coerced values of the current row, in column order.
    pub fn values(&self) -> Result<Vec<Value>> {
        (1..=self.columns.len())
            .map(|pos| Ok(self.get_object(pos)?.unwrap_or(Value::Null)))
            .collect()
    }

    /// Largest non-null value of a column over every row of the payload.
    pub fn column_max(&self, column: impl ColumnRef) -> Result<Option<Value>> {
        let col = &self.columns[column.resolve(&self.columns)?];
        let mut max: Option<Value> = None;
        for row in &self.payload.rows {
            let raw = match row.get(&col.name) {
                Some(raw) if !raw.is_null() => raw,
                _ => continue,
            };
            let value = coerce(col.column_type, raw).map_err(|e| e.into_redash_error(&col.name))?;
            max = match max {
                None => Some(value),
                Some(current) => match value.compare(&current) {
                    Some(CmpOrdering::Greater) => Some(value),
                    Some(_) => Some(current),
                    None => {
                        return Err(RedashError::decode(
                            &col.name,
                            raw_text(raw),
                            format!("a value comparable with {}", current),
                        ))
                    }
                },
            };
        }
        Ok(max)
    }
}

#[async_trait]
impl RowCursor for ResultMaterializer {
    async fn advance(&mut self) -> Result<bool> {
        Ok(ResultMaterializer::advance(self))
    }

    fn row(&self) -> usize {
        self.position
    }

    fn current(&self) -> &ResultMaterializer {
        self
    }
}
