//! Table projection: turns the backend's row records into a bounded preview.

use thiserror::Error;

use crate::state::{CellValue, RowRecord};

/// Rows shown in a preview; the rest are only counted.
pub const MAX_TABLE_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Number of records received, including those beyond the preview.
    pub total_rows: usize,
}

impl TableView {
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableShapeError {
    #[error("row {row} has columns {found:?}, expected {expected:?}")]
    MismatchedColumns {
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Project records onto a table. `Ok(None)` for no records.
///
/// Headers come from the first record. Every record must carry exactly that
/// key set; cells are looked up by key so differing key order is fine.
pub fn project_table(records: &[RowRecord]) -> Result<Option<TableView>, TableShapeError> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let headers: Vec<String> = first.keys().cloned().collect();

    for (row, record) in records.iter().enumerate().skip(1) {
        let same_keys =
            record.len() == headers.len() && headers.iter().all(|h| record.contains_key(h));
        if !same_keys {
            return Err(TableShapeError::MismatchedColumns {
                row,
                expected: headers,
                found: record.keys().cloned().collect(),
            });
        }
    }

    let rows = records
        .iter()
        .take(MAX_TABLE_ROWS)
        .map(|record| headers.iter().map(|h| record[h.as_str()].clone()).collect())
        .collect();

    Ok(Some(TableView {
        headers,
        rows,
        total_rows: records.len(),
    }))
}
