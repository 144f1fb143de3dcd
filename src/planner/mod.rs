//! Query planning.
//!
//! A resolved statement is turned into a tree of logical operators by
//! [`LogicalPlanGenerator`], then lowered one-to-one into executable
//! operators by [`PhysicalPlanGenerator`]. Planning is rule-based: every
//! logical shape has exactly one physical shape.

mod error;
mod logical;
mod logical_generator;
mod physical_generator;

pub use error::{PlanError, PlanResult};
pub use logical::{LogicalNode, LogicalOperator};
pub use logical_generator::LogicalPlanGenerator;
pub use physical_generator::PhysicalPlanGenerator;
