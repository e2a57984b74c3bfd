//! SQL value types produced by a row scan.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// A single field value as read from a table.
///
/// Drivers decode into the most specific variant they can and fall back to
/// [`SqlValue::Text`] or [`SqlValue::Bytes`] for anything else, so no value
/// is ever dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value (`TINYINT(1)` / `BOOLEAN`).
    Bool(bool),

    /// Signed integer of any width.
    Int(i64),

    /// Unsigned integer of any width.
    UInt(u64),

    /// Single precision float.
    Float(f32),

    /// Double precision float.
    Double(f64),

    /// Exact decimal; keeps the column scale.
    Decimal(Decimal),

    /// Character data.
    Text(String),

    /// Binary data, possibly not valid UTF-8.
    Bytes(Vec<u8>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time of day.
    Time(NaiveTime),

    /// Date and time without timezone (`DATETIME`, `TIMESTAMP`).
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Build a value from raw bytes, preferring text when they are valid UTF-8.
    #[must_use]
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s),
            Err(e) => SqlValue::Bytes(e.into_bytes()),
        }
    }
}

/// A chunk of rows from one table scan.
///
/// Column names are shared between all batches of a scan and are listed in
/// the order the server reported them.
#[derive(Debug, Clone)]
pub struct RowBatch {
    /// Column names in reported order.
    pub columns: Arc<[String]>,
    /// Rows; each row has one value per column.
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowBatch {
    /// Number of rows in this batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_prefers_text() {
        assert_eq!(
            SqlValue::from_raw(b"hello".to_vec()),
            SqlValue::Text("hello".to_string())
        );
        assert_eq!(
            SqlValue::from_raw(vec![0xff, 0x00]),
            SqlValue::Bytes(vec![0xff, 0x00])
        );
    }
}
