use super::{check_children, close_children, not_open, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{JoinedTuple, Tuple};

/// Nested loop join: the right child is re-opened for every left row.
pub struct NestedLoopJoinOperator {
    children: Vec<PhysicalOperator>,
    trx: Option<Transaction>,
    left_step: Option<Step>,
}

impl NestedLoopJoinOperator {
    pub fn new(left: PhysicalOperator, right: PhysicalOperator) -> Self {
        Self {
            children: vec![left, right],
            trx: None,
            left_step: None,
        }
    }
}

impl Operator for NestedLoopJoinOperator {
    fn name(&self) -> &'static str {
        "NESTED_LOOP_JOIN"
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 2)?;
        self.children[0].open(trx)?;
        self.trx = Some(trx.clone());
        self.left_step = None;
        Ok(())
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        let trx = self.trx.as_ref().ok_or_else(|| not_open("NESTED_LOOP_JOIN"))?;
        let [left, right] = self.children.as_mut_slice() else {
            return Err(not_open("NESTED_LOOP_JOIN"));
        };

        loop {
            let left_step = match self.left_step {
                Some(step) => step,
                None => {
                    let step = left.next(env)?;
                    if step == Step::Eof {
                        return Ok(Step::Eof);
                    }
                    right.close()?;
                    right.open(trx)?;
                    self.left_step = Some(step);
                    step
                }
            };

            match right.next(env)? {
                Step::Eof => self.left_step = None,
                right_step => return Ok(left_step.combine(right_step)),
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.trx = None;
        self.left_step = None;
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        let [left, right] = self.children.as_slice() else {
            return Err(ExecuteError::NoCurrentTuple(self.name()));
        };
        left.visit_current(&mut |l| {
            right.visit_current(&mut |r| visitor(&JoinedTuple::new(l, r)))
        })
    }
}
