//! Catalog module: table and field metadata.
//!
//! The catalog hands out shared `Arc<Table>` handles; plans reference fields
//! by their stable index in `TableMeta::fields` instead of copying metadata.

mod manager;
mod schema;
mod types;

pub use manager::Catalog;
pub use schema::{SchemaError, TableMeta};
pub use types::{DataType, FieldMeta, Value};
