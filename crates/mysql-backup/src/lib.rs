//! # mysql-backup
//!
//! Logical backups of MySQL and MariaDB databases, generated from the
//! server's own introspection commands instead of an external dump tool.
//!
//! A dump is a replayable SQL script with, per enabled section:
//!
//! - **Database** creation and `USE`
//! - **Tables** dropped and recreated, with foreign keys deferred to a
//!   single `ALTER TABLE` pass after every table exists
//! - **Views** as `CREATE OR REPLACE VIEW`
//! - **Routines** (procedures, then functions) in `DELIMITER` blocks
//! - **Data** as batched multi-row `INSERT` statements, streamed in
//!   bounded memory
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_backup::{BackupRunner, Config};
//!
//! #[tokio::main]
//! async fn main() -> mysql_backup::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let runner = BackupRunner::connect(config).await?;
//!     let summary = runner.run_to_file().await?;
//!     println!("Dumped {} rows", summary.rows);
//!     runner.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod dump;
pub mod error;
pub mod orchestrator;

// Re-exports for convenient access
pub use config::{BackupConfig, Config, ConnectionConfig, Section, SectionSelection};
pub use crate::core::{ObjectKind, RoutineKind, RowBatch, SchemaSource, SqlValue};
pub use drivers::{MemorySource, MysqlSource};
pub use dump::{ObjectFilter, OutputSink};
pub use error::{BackupError, Result};
pub use orchestrator::{BackupRunner, BackupSummary};
