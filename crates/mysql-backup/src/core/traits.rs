//! The database boundary used by the dump engine.
//!
//! - [`SchemaSource`]: introspection and row streaming for one database
//! - [`ObjectKind`] / [`RoutineKind`]: which catalog entries to ask for

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::value::RowBatch;

/// Kind of table-like object reported by `SHOW FULL TABLES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A base table.
    Table,
    /// A view.
    View,
}

impl ObjectKind {
    /// The catalog's type tag (`Table_type` column).
    pub fn table_type(&self) -> &'static str {
        match self {
            ObjectKind::Table => "BASE TABLE",
            ObjectKind::View => "VIEW",
        }
    }

    /// Keyword used in `SHOW CREATE <keyword>`.
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Kind of stored program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    /// Stored procedure.
    Procedure,
    /// Stored function.
    Function,
}

impl RoutineKind {
    /// SQL keyword for this routine kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }

    /// Name of the create-text column returned by `SHOW CREATE <kind>`.
    pub fn create_column(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "Create Procedure",
            RoutineKind::Function => "Create Function",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Introspection and data access for a single database.
///
/// One implementation talks to a live server, another serves an in-memory
/// catalog. The dump engine only ever has one call in flight.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Name of the database being dumped.
    fn database(&self) -> &str;

    /// Names of all objects of `kind`, in catalog order.
    async fn list_objects(&self, kind: ObjectKind) -> Result<Vec<String>>;

    /// The server's canonical `CREATE` statement for a table or view.
    async fn show_create(&self, kind: ObjectKind, name: &str) -> Result<String>;

    /// Names of stored routines of `kind` in this database.
    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<String>>;

    /// The server's canonical `CREATE` statement for a stored routine.
    async fn show_create_routine(&self, kind: RoutineKind, name: &str) -> Result<String>;

    /// Start a full-table scan.
    ///
    /// Rows arrive in scan order, in batches of at most `batch_size` rows,
    /// over a bounded channel. The scan has no filter, paging or ordering.
    /// An `Err` item ends the stream.
    fn read_table(&self, table: &str, batch_size: usize) -> mpsc::Receiver<Result<RowBatch>>;

    /// Check that the connection works.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_tags() {
        assert_eq!(ObjectKind::Table.table_type(), "BASE TABLE");
        assert_eq!(ObjectKind::View.table_type(), "VIEW");
        assert_eq!(ObjectKind::View.to_string(), "VIEW");
    }

    #[test]
    fn test_routine_kind_columns() {
        assert_eq!(RoutineKind::Procedure.create_column(), "Create Procedure");
        assert_eq!(RoutineKind::Function.create_column(), "Create Function");
        assert_eq!(RoutineKind::Function.to_string(), "FUNCTION");
    }
}
