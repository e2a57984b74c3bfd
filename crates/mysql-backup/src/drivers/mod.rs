//! Database drivers implementing [`SchemaSource`](crate::core::SchemaSource).
//!
//! - [`MysqlSource`]: MySQL 5.7+/8.0+ and MariaDB 10.2+ over SQLx
//! - [`MemorySource`]: fixed in-memory catalog

mod memory;
mod mysql;

pub use memory::MemorySource;
pub use mysql::MysqlSource;
