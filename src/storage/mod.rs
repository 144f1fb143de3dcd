//! Storage collaborator for the executor.
//!
//! Tables are in-memory heaps of versioned records. The upper layers
//! (transaction context, table-get operators) reach rows only through the
//! primitives exposed here: cursor reads, appends and header stamping.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Catalog                      │
//! │   (name -> Arc<Table>, create / rename)      │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │     Table     │
//!               │ meta + heap   │
//!               └───────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │    Record     │
//!               │ xmin / xmax   │
//!               └───────────────┘
//! ```

mod error;
mod record;
mod table;

pub use error::{StorageError, StorageResult};
pub use record::{Record, RowId, TxId};
pub use table::Table;
