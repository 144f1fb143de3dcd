use super::{
    check_children, close_children, not_open, Operator, PhysicalOperator, Step,
    StringListOperator, TupleVisitor,
};
use crate::executor::error::ExecuteResult;
use crate::stmt::ProjectExpr;
use crate::transaction::Transaction;
use crate::tuple::{ProjectTuple, Tuple};

/// Project operator - maps each input row through the SELECT list.
///
/// Without a child (`SELECT 1+1`) it reads from a one-row literal source
/// created on open, so it yields exactly one row.
pub struct ProjectOperator {
    exprs: Vec<ProjectExpr>,
    children: Vec<PhysicalOperator>,
    literal_source: Option<Box<PhysicalOperator>>,
}

impl ProjectOperator {
    pub fn new(exprs: Vec<ProjectExpr>) -> Self {
        Self {
            exprs,
            children: Vec::new(),
            literal_source: None,
        }
    }

    pub fn with_child(mut self, child: PhysicalOperator) -> Self {
        self.children.push(child);
        self
    }

    fn source(&self) -> Option<&PhysicalOperator> {
        self.children.first().or(self.literal_source.as_deref())
    }

    fn source_mut(&mut self) -> Option<&mut PhysicalOperator> {
        match self.children.first_mut() {
            Some(child) => Some(child),
            None => self.literal_source.as_deref_mut(),
        }
    }
}

impl Operator for ProjectOperator {
    fn name(&self) -> &'static str {
        "PROJECT"
    }

    fn param(&self) -> String {
        let exprs: Vec<String> = self.exprs.iter().map(|e| e.to_string()).collect();
        exprs.join(", ")
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        if self.children.is_empty() {
            self.literal_source = Some(Box::new(PhysicalOperator::StringList(
                StringListOperator::single_empty_row(),
            )));
        } else {
            check_children(self.name(), &self.children, 1)?;
        }

        match self.source_mut() {
            Some(source) => source.open(trx),
            None => Err(not_open("PROJECT")),
        }
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        match self.source_mut() {
            Some(source) => source.next(env),
            None => Err(not_open("PROJECT")),
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        if let Some(source) = self.literal_source.as_deref_mut() {
            source.close()?;
        }
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        let source = self.source().ok_or_else(|| not_open("PROJECT"))?;
        let exprs = &self.exprs;
        source.visit_current(&mut |tuple| visitor(&ProjectTuple::new(exprs, tuple)))
    }
}
