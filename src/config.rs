//! Engine configuration.

use crate::transaction::IsolationLevel;

/// What filtering operators do with a row whose visibility is contested but
/// which fails the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Skip it like any other non-matching row.
    #[default]
    AbsorbUnmatched,
    /// Return it as a conflict regardless of the filter result.
    SurfaceAll,
}

/// Options consumed by plan generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Wrap the inner side of every join in a cached-result node.
    pub cache_join_inner: bool,
    pub conflict_policy: ConflictPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cache_join_inner: true,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Isolation level of the transactions the executor starts.
    pub isolation: IsolationLevel,
    /// Commit after each statement outside an explicit BEGIN.
    pub auto_commit: bool,
    pub conflict_policy: ConflictPolicy,
    pub cache_join_inner: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            isolation: IsolationLevel::default(),
            auto_commit: true,
            conflict_policy: ConflictPolicy::default(),
            cache_join_inner: true,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn isolation(mut self, value: IsolationLevel) -> Self {
        self.isolation = value;
        self
    }

    /// Set auto_commit flag.
    pub fn auto_commit(mut self, value: bool) -> Self {
        self.auto_commit = value;
        self
    }

    /// Set the conflict policy.
    pub fn conflict_policy(mut self, value: ConflictPolicy) -> Self {
        self.conflict_policy = value;
        self
    }

    /// Set cache_join_inner flag.
    pub fn cache_join_inner(mut self, value: bool) -> Self {
        self.cache_join_inner = value;
        self
    }

    /// The planning subset of this configuration.
    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig {
            cache_join_inner: self.cache_join_inner,
            conflict_policy: self.conflict_policy,
        }
    }
}
