//! Row-change notifications from the realtime backend.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Kind of row change carried by a notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row change: the row before (`old`) and after (`new`) the write.
///
/// For updates the backend may only send the primary key in `old`, so
/// consumers should make decisions from `new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange<T = JsonValue> {
    pub schema: String,
    pub table: String,
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_timestamp: Option<String>,
    pub old: T,
    pub new: T,
}

impl RowChange<JsonValue> {
    /// Build an `UPDATE` notification for `public.<table>`.
    pub fn update(table: impl Into<String>, old: JsonValue, new: JsonValue) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            event_type: ChangeKind::Update,
            commit_timestamp: None,
            old,
            new,
        }
    }

    /// The row image a column filter is evaluated against.
    fn filter_image(&self) -> &JsonValue {
        match self.event_type {
            ChangeKind::Delete => &self.old,
            ChangeKind::Insert | ChangeKind::Update => &self.new,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("filter must look like `column=op.value`: {0}")]
    Malformed(String),
    #[error("unsupported filter operator `{0}` (only `eq` is supported)")]
    UnsupportedOperator(String),
}

/// Equality filter on one column, written `column=eq.value` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

impl ColumnFilter {
    pub fn equals(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Whether `row[column]` equals the filter value.
    ///
    /// Strings compare verbatim; numbers and booleans compare by their JSON
    /// rendering. Missing columns never match.
    pub fn matches(&self, row: &JsonValue) -> bool {
        match row.get(&self.column) {
            Some(JsonValue::String(s)) => *s == self.value,
            Some(v @ (JsonValue::Number(_) | JsonValue::Bool(_))) => v.to_string() == self.value,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

impl FromStr for ColumnFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, rest) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::Malformed(s.to_string()))?;
        let (op, value) = rest
            .split_once('.')
            .ok_or_else(|| FilterParseError::Malformed(s.to_string()))?;

        if column.is_empty() || value.is_empty() {
            return Err(FilterParseError::Malformed(s.to_string()));
        }
        if op != "eq" {
            return Err(FilterParseError::UnsupportedOperator(op.to_string()));
        }

        Ok(Self::equals(column, value))
    }
}

/// Which row changes a subscription wants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
    pub event: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ColumnFilter>,
}

impl ChangeFilter {
    /// `UPDATE` events on `public.<table>`.
    pub fn updates(table: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            event: ChangeKind::Update,
            filter: None,
        }
    }

    pub fn with_column_eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter = Some(ColumnFilter::equals(column, value));
        self
    }

    pub fn matches(&self, change: &RowChange<JsonValue>) -> bool {
        if change.schema != self.schema
            || change.table != self.table
            || change.event_type != self.event
        {
            return false;
        }

        match &self.filter {
            Some(f) => f.matches(change.filter_image()),
            None => true,
        }
    }
}

impl fmt::Display for ChangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.event, self.schema, self.table)?;
        if let Some(filter) = &self.filter {
            write!(f, ":{filter}")?;
        }
        Ok(())
    }
}
