//! Dump generation.
//!
//! - [`catalog`]: object discovery and name filtering
//! - [`schema`]: DDL statements, including foreign-key extraction
//! - [`data`]: row data as batched `INSERT` statements
//! - [`escape`]: value literals
//! - [`sink`]: buffered output
//! - [`format`]: banners, header and footer

pub mod catalog;
pub mod data;
pub mod escape;
pub mod format;
pub mod schema;
pub mod sink;

pub use catalog::{NamePattern, ObjectFilter};
pub use data::TableDumpStats;
pub use schema::{DeferredForeignKeys, TableSchema};
pub use sink::OutputSink;
