//! Transaction management.
//!
//! Each transaction stamps the record versions it writes (`xmin` on insert,
//! `xmax` on delete). Visibility of a version is then a function of the
//! stamping transactions' states and the reader's snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TransactionManager                        │
//! │        (assigns ids, tracks states, takes snapshots)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ Transaction │       │  Isolation  │       │  Snapshot   │
//!  │  (handle)   │       │    Level    │       │             │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! The executor only consumes the outcome of [`Transaction::visibility`]:
//! a `Conflict` there becomes the conflict outcome of a table-get operator.

mod context;
mod error;
mod isolation;
mod manager;
mod snapshot;

pub use context::{Transaction, Visibility};
pub use error::{TransactionError, TransactionResult};
pub use isolation::IsolationLevel;
pub use manager::{TransactionManager, TxState};
pub use snapshot::Snapshot;
