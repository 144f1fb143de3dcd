use super::{check_children, close_children, not_open, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::config::ConflictPolicy;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate_predicate;
use crate::stmt::Expression;
use crate::transaction::Transaction;
use crate::tuple::{JoinedTuple, Tuple};

/// Filter operator - passes through the child rows that satisfy a
/// condition, keeping each row's status.
pub struct PredicateOperator {
    expression: Expression,
    conflict_policy: ConflictPolicy,
    children: Vec<PhysicalOperator>,
}

impl PredicateOperator {
    pub fn new(expression: Expression, conflict_policy: ConflictPolicy) -> Self {
        Self {
            expression,
            conflict_policy,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: PhysicalOperator) -> Self {
        self.children.push(child);
        self
    }
}

impl Operator for PredicateOperator {
    fn name(&self) -> &'static str {
        "PREDICATE"
    }

    fn param(&self) -> String {
        self.expression.to_string()
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.children[0].open(trx)
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        let expression = &self.expression;
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| not_open("PREDICATE"))?;

        loop {
            let step = child.next(env)?;
            if step == Step::Eof {
                return Ok(Step::Eof);
            }

            let mut matched = false;
            child.visit_current(&mut |tuple| {
                matched = evaluate_predicate(expression, &JoinedTuple::new(tuple, env))?;
                Ok(())
            })?;

            if matched {
                return Ok(step);
            }
            if step == Step::Conflict && self.conflict_policy == ConflictPolicy::SurfaceAll {
                return Ok(step);
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match self.children.first() {
            Some(child) => child.visit_current(visitor),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}
