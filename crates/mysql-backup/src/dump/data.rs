//! Table data as multi-row `INSERT` statements.

use serde::Serialize;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::core::identifier::quote_mysql;
use crate::core::traits::SchemaSource;
use crate::core::value::RowBatch;
use crate::error::{BackupError, Result};

use super::escape::write_literal;
use super::sink::OutputSink;

/// Session time zone used while reading and replaying TIMESTAMP values.
pub const SESSION_TIME_ZONE: &str = "+00:00";

/// Statements pinning the replay session to [`SESSION_TIME_ZONE`].
pub fn time_zone_prologue() -> String {
    format!(
        "SET @OLD_TIME_ZONE = @@TIME_ZONE;\nSET TIME_ZONE = '{}';\n\n",
        SESSION_TIME_ZONE
    )
}

/// Restores the replay session's time zone.
pub const TIME_ZONE_EPILOGUE: &str = "SET TIME_ZONE = @OLD_TIME_ZONE;\n\n";

/// Counts for one dumped table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableDumpStats {
    pub rows: u64,
    pub statements: u64,
}

/// `INSERT INTO `t`(`a`,`b`) VALUES` line for the given columns.
pub fn insert_header(table: &str, columns: &[String]) -> Result<String> {
    let quoted = columns
        .iter()
        .map(|c| quote_mysql(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "INSERT INTO {}({}) VALUES\n",
        quote_mysql(table)?,
        quoted.join(",")
    ))
}

/// Stream every row of `table` into `sink`.
///
/// Rows are grouped into statements of at most `batch_size` rows, in scan
/// order. The sink is flushed before the scan starts and after each
/// statement, so at most one statement is buffered at a time. An empty
/// table produces no output.
pub async fn dump_table<W>(
    source: &dyn SchemaSource,
    sink: &mut OutputSink<W>,
    table: &str,
    batch_size: usize,
) -> Result<TableDumpStats>
where
    W: AsyncWrite + Unpin + Send,
{
    if batch_size == 0 {
        return Err(BackupError::Config("batch_size must be at least 1".into()));
    }
    sink.flush().await?;

    let mut stats = TableDumpStats::default();
    let mut header: Option<String> = None;
    // Rows in the statement currently being built
    let mut in_statement = 0usize;

    let mut rx = source.read_table(table, batch_size);
    while let Some(batch) = rx.recv().await {
        let batch: RowBatch = batch?;
        if header.is_none() && !batch.is_empty() {
            header = Some(insert_header(table, &batch.columns)?);
        }
        let Some(header) = header.as_deref() else {
            continue;
        };

        for row in &batch.rows {
            let buf = sink.buffer_mut();
            if in_statement == 0 {
                buf.push_str(header);
            } else {
                buf.push_str(",\n");
            }
            buf.push_str(" (");
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_literal(buf, value);
            }
            buf.push(')');

            in_statement += 1;
            stats.rows += 1;

            if in_statement == batch_size {
                sink.append(";\n\n");
                sink.flush().await?;
                stats.statements += 1;
                in_statement = 0;
            }
        }
    }

    if in_statement > 0 {
        sink.append(";\n\n");
        sink.flush().await?;
        stats.statements += 1;
    }

    debug!(
        "Dumped {} row(s) of {} in {} statement(s)",
        stats.rows, table, stats.statements
    );
    Ok(stats)
}
