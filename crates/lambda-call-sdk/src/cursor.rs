// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Forward-only, read-only cursor over decoded tabular rows.
//!
//! Column set and order come from the first row's key order. There is no
//! declared schema: each column's kind is inferred from the first non-null
//! value observed in that column across all rows, defaulting to `Other`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::coerce;
use crate::error::{CallError, Result};
use crate::types::ValueKind;

/// Wire column name used for single-value results.
pub const SINGLE_VALUE_COLUMN: &str = "result";

#[derive(Debug, Clone)]
struct Column {
    name: String,
    kind: ValueKind,
}

/// Tabular result cursor.
///
/// Starts positioned before the first row; `next()` advances and returns
/// whether a row is available. Not writable, not scrollable.
#[derive(Debug, Clone)]
pub struct TabularCursor {
    rows: Vec<Map<String, Value>>,
    columns: Vec<Column>,
    /// 0 = before first row.
    position: usize,
    last_read_was_null: bool,
}

impl TabularCursor {
    /// Build a cursor over decoded rows.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let columns = match rows.first() {
            Some(first) => first
                .keys()
                .map(|name| Column {
                    name: name.clone(),
                    kind: infer_kind(&rows, name),
                })
                .collect(),
            None => Vec::new(),
        };
        Self {
            rows,
            columns,
            position: 0,
            last_read_was_null: false,
        }
    }

    /// Build a one-row, one-column cursor wrapping a single result value.
    pub fn single_value(value: Value) -> Self {
        let mut row = Map::new();
        row.insert(SINGLE_VALUE_COLUMN.to_string(), value);
        Self::from_rows(vec![row])
    }

    /// Advance to the next row; false once past the last row.
    pub fn next(&mut self) -> bool {
        if self.position < self.rows.len() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Total number of rows in this result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn current_row(&self) -> Result<&Map<String, Value>> {
        if self.position == 0 {
            return Err(CallError::State(
                "cursor is positioned before the first row".to_string(),
            ));
        }
        self.rows.get(self.position - 1).ok_or_else(|| {
            CallError::State("cursor is positioned after the last row".to_string())
        })
    }

    // =========================================================================
    // Column access
    // =========================================================================

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Resolve a column label to its 1-based index.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| i + 1)
            .ok_or_else(|| CallError::State(format!("unknown column: {name}")))
    }

    fn column(&self, index: usize) -> Result<&Column> {
        if index < 1 || index > self.columns.len() {
            return Err(CallError::Range {
                index,
                count: self.columns.len(),
            });
        }
        Ok(&self.columns[index - 1])
    }

    /// Read the raw value at a 1-based column index, recording the
    /// null-check flag.
    pub fn get_value(&mut self, index: usize) -> Result<Value> {
        let name = self.column(index)?.name.clone();
        let row = self.current_row()?;
        let value = row.get(&name).cloned().unwrap_or(Value::Null);
        self.last_read_was_null = value.is_null();
        Ok(value)
    }

    /// Read the raw value by column label.
    pub fn get_value_by_name(&mut self, name: &str) -> Result<Value> {
        let index = self.column_index(name)?;
        self.get_value(index)
    }

    /// Whether the most recent read was null.
    pub fn was_null(&self) -> bool {
        self.last_read_was_null
    }

    pub fn get_string(&mut self, index: usize) -> Result<Option<String>> {
        let value = self.get_value(index)?;
        Ok(coerce::as_string(&value))
    }

    pub fn get_i64(&mut self, index: usize) -> Result<i64> {
        let value = self.get_value(index)?;
        coerce::as_i64(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_i32(&mut self, index: usize) -> Result<i32> {
        let value = self.get_i64(index)?;
        i32::try_from(value)
            .map_err(|_| self.read_error(index, format!("{value} does not fit in a 32-bit integer")))
    }

    pub fn get_f64(&mut self, index: usize) -> Result<f64> {
        let value = self.get_value(index)?;
        coerce::as_f64(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_bool(&mut self, index: usize) -> Result<bool> {
        let value = self.get_value(index)?;
        coerce::as_bool(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_bytes(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        let value = self.get_value(index)?;
        coerce::as_bytes(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_date(&mut self, index: usize) -> Result<Option<NaiveDate>> {
        let value = self.get_value(index)?;
        coerce::as_date(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_time(&mut self, index: usize) -> Result<Option<NaiveTime>> {
        let value = self.get_value(index)?;
        coerce::as_time(&value).map_err(|m| self.read_error(index, m))
    }

    pub fn get_timestamp(&mut self, index: usize) -> Result<Option<NaiveDateTime>> {
        let value = self.get_value(index)?;
        coerce::as_timestamp(&value).map_err(|m| self.read_error(index, m))
    }

    fn read_error(&self, index: usize, message: String) -> CallError {
        let name = self
            .columns
            .get(index - 1)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        CallError::State(format!("column {name}: {message}"))
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Column label for a 1-based index.
    pub fn column_name(&self, index: usize) -> Result<&str> {
        Ok(&self.column(index)?.name)
    }

    /// Inferred value kind for a 1-based column index.
    pub fn column_kind(&self, index: usize) -> Result<ValueKind> {
        Ok(self.column(index)?.kind)
    }

    /// Conventional display size for the column's inferred kind.
    pub fn column_display_size(&self, index: usize) -> Result<usize> {
        Ok(self.column(index)?.kind.display_size())
    }

    // No declared schema exists, so the remaining metadata is fixed.

    pub fn is_nullable(&self, index: usize) -> Result<bool> {
        self.column(index)?;
        Ok(true)
    }

    pub fn is_read_only(&self, index: usize) -> Result<bool> {
        self.column(index)?;
        Ok(true)
    }

    pub fn is_auto_increment(&self, index: usize) -> Result<bool> {
        self.column(index)?;
        Ok(false)
    }

    pub fn is_case_sensitive(&self, index: usize) -> Result<bool> {
        self.column(index)?;
        Ok(true)
    }

    pub fn is_searchable(&self, index: usize) -> Result<bool> {
        self.column(index)?;
        Ok(false)
    }

    pub fn precision(&self, index: usize) -> Result<u32> {
        self.column(index)?;
        Ok(0)
    }

    pub fn scale(&self, index: usize) -> Result<u32> {
        self.column(index)?;
        Ok(0)
    }

    /// No lineage is tracked for remote function results.
    pub fn catalog_name(&self, index: usize) -> Result<&str> {
        self.column(index)?;
        Ok("")
    }

    pub fn schema_name(&self, index: usize) -> Result<&str> {
        self.column(index)?;
        Ok("")
    }

    pub fn table_name(&self, index: usize) -> Result<&str> {
        self.column(index)?;
        Ok("")
    }
}

/// Kind of the first non-null value in the column, `Other` if none.
fn infer_kind(rows: &[Map<String, Value>], name: &str) -> ValueKind {
    rows.iter()
        .filter_map(|row| row.get(name))
        .find(|v| !v.is_null())
        .map(ValueKind::of)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallErrorKind;
    use serde_json::json;

    fn rows(body: &str) -> Vec<Map<String, Value>> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_column_order_from_first_row() {
        let cursor = TabularCursor::from_rows(rows(r#"[{"zeta":1,"alpha":"x"}]"#));
        assert_eq!(cursor.column_count(), 2);
        assert_eq!(cursor.column_name(1).unwrap(), "zeta");
        assert_eq!(cursor.column_name(2).unwrap(), "alpha");
    }

    #[test]
    fn test_kind_inferred_from_first_non_null() {
        let cursor = TabularCursor::from_rows(rows(
            r#"[{"a":null,"b":null},{"a":1.5,"b":null}]"#,
        ));
        assert_eq!(cursor.column_kind(1).unwrap(), ValueKind::Real);
        // Never non-null: defaults to Other.
        assert_eq!(cursor.column_kind(2).unwrap(), ValueKind::Other);
    }

    #[test]
    fn test_forward_iteration() {
        let mut cursor = TabularCursor::from_rows(rows(r#"[{"a":1},{"a":2}]"#));
        assert_eq!(cursor.row_count(), 2);
        assert!(cursor.next());
        assert_eq!(cursor.get_i64(1).unwrap(), 1);
        assert!(cursor.next());
        assert_eq!(cursor.get_i64(1).unwrap(), 2);
        assert!(!cursor.next());
    }

    #[test]
    fn test_read_before_first_row_is_state_error() {
        let mut cursor = TabularCursor::from_rows(rows(r#"[{"a":1}]"#));
        assert_eq!(cursor.get_i64(1).unwrap_err().kind(), CallErrorKind::State);
    }

    #[test]
    fn test_read_by_name_and_was_null() {
        let mut cursor = TabularCursor::from_rows(rows(r#"[{"a":null,"b":"x"}]"#));
        cursor.next();
        assert_eq!(cursor.get_value_by_name("a").unwrap(), Value::Null);
        assert!(cursor.was_null());
        assert_eq!(cursor.get_value_by_name("b").unwrap(), json!("x"));
        assert!(!cursor.was_null());
        assert!(cursor.get_value_by_name("missing").is_err());
    }

    #[test]
    fn test_single_value_cursor() {
        let mut cursor = TabularCursor::single_value(json!("X"));
        assert_eq!(cursor.column_count(), 1);
        assert_eq!(cursor.column_name(1).unwrap(), SINGLE_VALUE_COLUMN);
        assert!(cursor.next());
        assert_eq!(cursor.get_string(1).unwrap().as_deref(), Some("X"));
        assert!(!cursor.next());
    }

    #[test]
    fn test_metadata_defaults() {
        let cursor = TabularCursor::from_rows(rows(r#"[{"a":1}]"#));
        assert!(cursor.is_nullable(1).unwrap());
        assert!(cursor.is_read_only(1).unwrap());
        assert!(!cursor.is_auto_increment(1).unwrap());
        assert!(cursor.is_case_sensitive(1).unwrap());
        assert!(!cursor.is_searchable(1).unwrap());
        assert_eq!(cursor.precision(1).unwrap(), 0);
        assert_eq!(cursor.scale(1).unwrap(), 0);
        assert_eq!(cursor.catalog_name(1).unwrap(), "");
        assert_eq!(cursor.schema_name(1).unwrap(), "");
        assert_eq!(cursor.table_name(1).unwrap(), "");
        assert_eq!(cursor.column_display_size(1).unwrap(), 11);
    }

    #[test]
    fn test_column_index_range() {
        let cursor = TabularCursor::from_rows(rows(r#"[{"a":1}]"#));
        assert_eq!(
            cursor.column_name(2).unwrap_err().kind(),
            CallErrorKind::Range
        );
        assert_eq!(
            cursor.column_name(0).unwrap_err().kind(),
            CallErrorKind::Range
        );
    }
}
