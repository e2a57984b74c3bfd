//! In-memory source.
//!
//! Serves a fixed catalog (create statements and rows) through the same
//! [`SchemaSource`] interface as the MySQL driver. Used for dry runs of the
//! dump format and throughout the test suite.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::traits::{ObjectKind, RoutineKind, SchemaSource};
use crate::core::value::{RowBatch, SqlValue};
use crate::error::{BackupError, Result};

/// Row batches buffered between the scan task and the dump writer.
const READ_AHEAD_BATCHES: usize = 4;

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    create_sql: String,
    columns: Arc<[String]>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug, Clone)]
struct MemoryObject {
    name: String,
    create_sql: String,
}

/// Fixed, in-memory database catalog.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    database: String,
    tables: Vec<MemoryTable>,
    views: Vec<MemoryObject>,
    procedures: Vec<MemoryObject>,
    functions: Vec<MemoryObject>,
    broken: HashSet<String>,
}

impl MemorySource {
    /// Create an empty catalog for `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Add a base table. Tables are listed in insertion order.
    pub fn with_table<C, R>(
        mut self,
        name: impl Into<String>,
        create_sql: impl Into<String>,
        columns: C,
        rows: R,
    ) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = Vec<SqlValue>>,
    {
        self.tables.push(MemoryTable {
            name: name.into(),
            create_sql: create_sql.into(),
            columns: columns.into_iter().map(Into::into).collect::<Vec<_>>().into(),
            rows: rows.into_iter().collect(),
        });
        self
    }

    /// Add a view.
    pub fn with_view(mut self, name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        self.views.push(MemoryObject {
            name: name.into(),
            create_sql: create_sql.into(),
        });
        self
    }

    /// Add a stored routine.
    pub fn with_routine(
        mut self,
        kind: RoutineKind,
        name: impl Into<String>,
        create_sql: impl Into<String>,
    ) -> Self {
        let object = MemoryObject {
            name: name.into(),
            create_sql: create_sql.into(),
        };
        match kind {
            RoutineKind::Procedure => self.procedures.push(object),
            RoutineKind::Function => self.functions.push(object),
        }
        self
    }

    /// Make every introspection call for `name` fail.
    pub fn with_broken_object(mut self, name: impl Into<String>) -> Self {
        self.broken.insert(name.into());
        self
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.broken.contains(name) {
            return Err(BackupError::introspection(name, "object is unreadable"));
        }
        Ok(())
    }

    fn find<'a>(objects: &'a [MemoryObject], name: &str) -> Option<&'a MemoryObject> {
        objects.iter().find(|o| o.name == name)
    }

    fn routines(&self, kind: RoutineKind) -> &[MemoryObject] {
        match kind {
            RoutineKind::Procedure => &self.procedures,
            RoutineKind::Function => &self.functions,
        }
    }
}

#[async_trait]
impl SchemaSource for MemorySource {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_objects(&self, kind: ObjectKind) -> Result<Vec<String>> {
        Ok(match kind {
            ObjectKind::Table => self.tables.iter().map(|t| t.name.clone()).collect(),
            ObjectKind::View => self.views.iter().map(|v| v.name.clone()).collect(),
        })
    }

    async fn show_create(&self, kind: ObjectKind, name: &str) -> Result<String> {
        self.check(name)?;
        let found = match kind {
            ObjectKind::Table => self
                .tables
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.create_sql.clone()),
            ObjectKind::View => Self::find(&self.views, name).map(|v| v.create_sql.clone()),
        };
        found.ok_or_else(|| BackupError::introspection(name, format!("no such {}", kind)))
    }

    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<String>> {
        Ok(self.routines(kind).iter().map(|r| r.name.clone()).collect())
    }

    async fn show_create_routine(&self, kind: RoutineKind, name: &str) -> Result<String> {
        self.check(name)?;
        Self::find(self.routines(kind), name)
            .map(|r| r.create_sql.clone())
            .ok_or_else(|| BackupError::introspection(name, format!("no such {}", kind)))
    }

    fn read_table(&self, table: &str, batch_size: usize) -> mpsc::Receiver<Result<RowBatch>> {
        let (tx, rx) = mpsc::channel(READ_AHEAD_BATCHES);
        let batch_size = batch_size.max(1);
        let found = self
            .check(table)
            .and_then(|()| {
                self.tables
                    .iter()
                    .find(|t| t.name == table)
                    .cloned()
                    .ok_or_else(|| BackupError::introspection(table, "no such TABLE"))
            });

        tokio::spawn(async move {
            let table = match found {
                Ok(table) => table,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            for chunk in table.rows.chunks(batch_size) {
                let batch = RowBatch {
                    columns: table.columns.clone(),
                    rows: chunk.to_vec(),
                };
                if tx.send(Ok(batch)).await.is_err() {
                    return;
                }
            }
        });

        rx
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        MemorySource::new("acme")
            .with_table(
                "users",
                "CREATE TABLE `users` (\n  `id` int NOT NULL\n) ENGINE=InnoDB",
                ["id"],
                (1..=5).map(|i| vec![SqlValue::Int(i)]),
            )
            .with_view("v_users", "CREATE VIEW `v_users` AS select 1")
            .with_routine(RoutineKind::Function, "f1", "CREATE FUNCTION `f1`() RETURNS int RETURN 1")
    }

    #[tokio::test]
    async fn test_lists_objects_by_kind() {
        let source = source();
        assert_eq!(source.list_objects(ObjectKind::Table).await.unwrap(), ["users"]);
        assert_eq!(source.list_objects(ObjectKind::View).await.unwrap(), ["v_users"]);
        assert_eq!(source.list_routines(RoutineKind::Function).await.unwrap(), ["f1"]);
        assert!(source.list_routines(RoutineKind::Procedure).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_table_batches() {
        let mut rx = source().read_table("users", 2);
        let mut sizes = Vec::new();
        while let Some(batch) = rx.recv().await {
            sizes.push(batch.unwrap().len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_broken_object_fails() {
        let source = source().with_broken_object("users");
        assert!(source.show_create(ObjectKind::Table, "users").await.is_err());
        let mut rx = source.read_table("users", 10);
        assert!(rx.recv().await.unwrap().is_err());
    }
}
