//! Core abstractions shared by drivers and the dump engine.
//!
//! - [`traits`]: the [`SchemaSource`] database boundary
//! - [`value`]: decoded field values and row batches
//! - [`identifier`]: identifier validation and quoting

pub mod identifier;
pub mod traits;
pub mod value;

pub use traits::{ObjectKind, RoutineKind, SchemaSource};
pub use value::{RowBatch, SqlValue};
