//! UI-agnostic chat state types
//!
//! These are shared between the terminal UI and the one-shot CLI and don't
//! depend on any rendering framework. The chart and table payloads keep the
//! exact shape the analysis backend sends.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of tabular data, column name to cell value.
///
/// Column order is the order the backend sent, so "the columns of the first
/// record" is well defined.
pub type RowRecord = IndexMap<String, CellValue>;

/// The author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// A chat message in the analysis conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<Vec<RowRecord>>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            chart_data: None,
            table_data: None,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
            chart_data: None,
            table_data: None,
        }
    }

    /// True when this message carries a chart or table worth showing.
    pub fn has_data(&self) -> bool {
        let has_chart = self
            .chart_data
            .as_ref()
            .is_some_and(|c| !c.labels.is_empty());
        let has_table = self.table_data.as_ref().is_some_and(|t| !t.is_empty());
        has_chart || has_table
    }
}

/// Labelled series for the price-trend line chart.
///
/// `labels` and `values` are expected to be the same length but nothing
/// enforces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
}

/// A single table cell. The backend mostly sends strings or numbers, but
/// spreadsheet exports can also carry booleans and empty (`null`) cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value.into())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}
