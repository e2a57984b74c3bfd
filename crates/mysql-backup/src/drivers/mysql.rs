//! MySQL/MariaDB source implementation.
//!
//! Implements [`SchemaSource`] over a single-connection SQLx pool.
//! Introspection and table scans go through the text protocol
//! (`sqlx::raw_sql`), so every field arrives exactly as the server renders
//! it; values are then decoded by column type with a raw-bytes fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::identifier::{qualify_mysql, quote_mysql};
use crate::core::traits::{ObjectKind, RoutineKind, SchemaSource};
use crate::core::value::{RowBatch, SqlValue};
use crate::dump::data::SESSION_TIME_ZONE;
use crate::error::{BackupError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Row batches buffered between the scan task and the dump writer.
const READ_AHEAD_BATCHES: usize = 4;

/// MySQL/MariaDB source.
pub struct MysqlSource {
    pool: MySqlPool,
    database: String,
}

impl MysqlSource {
    /// Connect using the given parameters.
    ///
    /// The pool holds exactly one connection: the dump runs one query at a
    /// time.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred)
            .timezone(Some(SESSION_TIME_ZONE.to_string()));

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| BackupError::connection(e, "connecting to MySQL"))?;

        info!("Connected to MySQL: {}", config.display_url());

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    /// Run a text-protocol statement and return all rows.
    async fn fetch_all(&self, sql: &str, object: &str) -> Result<Vec<MySqlRow>> {
        debug!("{}", sql);
        sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackupError::introspection(object, e))
    }

    /// Create text from the single row returned by a `SHOW CREATE` statement.
    async fn show_create_text<I>(&self, sql: &str, object: &str, column: I) -> Result<String>
    where
        I: sqlx::ColumnIndex<MySqlRow> + std::fmt::Display + Copy + Send,
    {
        let rows = self.fetch_all(sql, object).await?;
        let row = rows
            .first()
            .ok_or_else(|| BackupError::introspection(object, "SHOW CREATE returned no rows"))?;
        text_column(row, column, object)?.ok_or_else(|| {
            BackupError::introspection(
                object,
                format!("'{}' is NULL (insufficient privileges?)", column),
            )
        })
    }

    async fn scan_table(
        pool: MySqlPool,
        table: String,
        sql: String,
        batch_size: usize,
        tx: mpsc::Sender<Result<RowBatch>>,
    ) -> Result<()> {
        let mut rows = sqlx::raw_sql(&sql).fetch(&pool);
        let mut columns: Option<Arc<[String]>> = None;
        let mut pending: Vec<Vec<SqlValue>> = Vec::with_capacity(batch_size);

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| BackupError::introspection(&table, e))?
        {
            let cols = columns.get_or_insert_with(|| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>()
                    .into()
            });

            let values = (0..cols.len())
                .map(|idx| decode_value(&row, idx))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| BackupError::introspection(&table, e))?;
            pending.push(values);

            if pending.len() >= batch_size {
                let batch = RowBatch {
                    columns: cols.clone(),
                    rows: std::mem::replace(&mut pending, Vec::with_capacity(batch_size)),
                };
                if tx.send(Ok(batch)).await.is_err() {
                    return Ok(()); // Receiver dropped
                }
            }
        }

        if let Some(columns) = columns {
            if !pending.is_empty() {
                let _ = tx.send(Ok(RowBatch { columns, rows: pending })).await;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SchemaSource for MysqlSource {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_objects(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let sql = format!(
            "SHOW FULL TABLES FROM {} WHERE Table_type = '{}'",
            quote_mysql(&self.database)?,
            kind.table_type()
        );
        let rows = self.fetch_all(&sql, &self.database).await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text_column(row, 0usize, &self.database)?
                .ok_or_else(|| BackupError::introspection(&self.database, "NULL table name"))?;
            names.push(name);
        }

        debug!("Found {} {} object(s)", names.len(), kind);
        Ok(names)
    }

    async fn show_create(&self, kind: ObjectKind, name: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE {} {}",
            kind.keyword(),
            qualify_mysql(&self.database, name)?
        );
        // Columns: Table | Create Table, View | Create View | ...
        self.show_create_text(&sql, name, 1usize).await
    }

    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(ROUTINE_NAME AS CHAR(255)) AS ROUTINE_NAME
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = ?
            ORDER BY ROUTINE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .bind(kind.keyword())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackupError::introspection(&self.database, e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("ROUTINE_NAME")
                    .map_err(|e| BackupError::introspection(&self.database, e))
            })
            .collect()
    }

    async fn show_create_routine(&self, kind: RoutineKind, name: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE {} {}",
            kind.keyword(),
            qualify_mysql(&self.database, name)?
        );
        self.show_create_text(&sql, name, kind.create_column()).await
    }

    fn read_table(&self, table: &str, batch_size: usize) -> mpsc::Receiver<Result<RowBatch>> {
        let (tx, rx) = mpsc::channel(READ_AHEAD_BATCHES);
        let pool = self.pool.clone();
        let table = table.to_string();
        let batch_size = batch_size.max(1);

        tokio::spawn(async move {
            let result = match quote_mysql(&table) {
                Ok(quoted) => {
                    let sql = format!("SELECT * FROM {}", quoted);
                    Self::scan_table(pool, table, sql, batch_size, tx.clone()).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }

    async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BackupError::connection(e, "testing MySQL connection"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Read a column as text regardless of its declared type.
///
/// Text-protocol values are length-prefixed strings, so the raw bytes are
/// the server's rendering of the value.
fn text_column<I>(row: &MySqlRow, index: I, object: &str) -> Result<Option<String>>
where
    I: sqlx::ColumnIndex<MySqlRow>,
{
    let raw: Option<Vec<u8>> = row
        .try_get_unchecked(index)
        .map_err(|e| BackupError::introspection(object, e))?;
    raw.map(|bytes| {
        String::from_utf8(bytes)
            .map_err(|e| BackupError::introspection(object, format!("invalid UTF-8: {}", e)))
    })
    .transpose()
}

/// Decode one field of a text-protocol row.
fn decode_value(row: &MySqlRow, idx: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw: Option<Vec<u8>> = row.try_get_unchecked(idx)?;
    Ok(match raw {
        None => SqlValue::Null,
        Some(bytes) => typed_value(row.column(idx).type_info().name(), bytes),
    })
}

/// Convert the server's text rendering into a typed value.
///
/// Anything that does not parse cleanly (zero dates, out-of-range
/// decimals, spatial types, ...) is kept verbatim.
fn typed_value(type_name: &str, raw: Vec<u8>) -> SqlValue {
    let parsed = std::str::from_utf8(&raw)
        .ok()
        .and_then(|text| match type_name {
            "BOOLEAN" => match text {
                "0" => Some(SqlValue::Bool(false)),
                "1" => Some(SqlValue::Bool(true)),
                _ => None,
            },
            t if t.ends_with(" UNSIGNED") => text.parse::<u64>().ok().map(SqlValue::UInt),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                text.parse::<i64>().ok().map(SqlValue::Int)
            }
            "FLOAT" => text.parse::<f32>().ok().map(SqlValue::Float),
            "DOUBLE" => text.parse::<f64>().ok().map(SqlValue::Double),
            "DECIMAL" => Decimal::from_str_exact(text).ok().map(SqlValue::Decimal),
            "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(SqlValue::Date),
            "TIME" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Time),
            "DATETIME" | "TIMESTAMP" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(SqlValue::DateTime),
            _ => None,
        });

    parsed.unwrap_or_else(|| SqlValue::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_value_integers() {
        assert_eq!(typed_value("INT", b"-42".to_vec()), SqlValue::Int(-42));
        assert_eq!(
            typed_value("BIGINT UNSIGNED", b"18446744073709551615".to_vec()),
            SqlValue::UInt(u64::MAX)
        );
        assert_eq!(typed_value("BOOLEAN", b"1".to_vec()), SqlValue::Bool(true));
    }

    #[test]
    fn test_typed_value_dates() {
        assert_eq!(
            typed_value("DATE", b"2017-05-07".to_vec()),
            SqlValue::Date(NaiveDate::from_ymd_opt(2017, 5, 7).unwrap())
        );
        assert!(matches!(
            typed_value("DATETIME", b"2017-05-07 10:20:30.250".to_vec()),
            SqlValue::DateTime(_)
        ));
    }

    #[test]
    fn test_typed_value_falls_back_to_raw() {
        // Zero dates are valid in MySQL but not in chrono
        assert_eq!(
            typed_value("DATE", b"0000-00-00".to_vec()),
            SqlValue::Text("0000-00-00".to_string())
        );
        assert_eq!(
            typed_value("VARCHAR", b"hello".to_vec()),
            SqlValue::Text("hello".to_string())
        );
        assert_eq!(
            typed_value("BLOB", vec![0xde, 0xad, 0xbe, 0xef]),
            SqlValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[test]
    fn test_typed_value_decimal_keeps_scale() {
        assert_eq!(
            typed_value("DECIMAL", b"10.500".to_vec()),
            SqlValue::Decimal(Decimal::from_str("10.500").unwrap())
        );
    }

    #[test]
    fn test_typed_value_wide_decimal_is_not_rounded() {
        let wide = "1234567890.12345678901234567891";
        let value = typed_value("DECIMAL", wide.as_bytes().to_vec());
        assert_eq!(value, SqlValue::Text(wide.to_string()));
        assert_eq!(
            crate::dump::escape::serialize(&value),
            format!("'{}'", wide)
        );
    }
}
