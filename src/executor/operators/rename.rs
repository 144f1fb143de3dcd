use std::sync::Arc;

use tracing::info;

use super::{Operator, Step, TupleVisitor};
use crate::catalog::Catalog;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::storage::Table;
use crate::transaction::Transaction;
use crate::tuple::Tuple;

/// RENAME TABLE. Takes effect when opened.
pub struct RenameOperator {
    catalog: Catalog,
    table: Arc<Table>,
    new_name: String,
}

impl RenameOperator {
    pub fn new(catalog: Catalog, table: Arc<Table>, new_name: impl Into<String>) -> Self {
        Self {
            catalog,
            table,
            new_name: new_name.into(),
        }
    }
}

impl Operator for RenameOperator {
    fn name(&self) -> &'static str {
        "RENAME"
    }

    fn param(&self) -> String {
        format!("{} TO {}", self.table.name(), self.new_name)
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        let old_name = self.table.name();
        self.catalog.rename_table(&old_name, &self.new_name)?;
        info!(from = %old_name, to = %self.new_name, tx = trx.label(), "table renamed by statement");
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        Ok(Step::Eof)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        Ok(())
    }

    fn visit_current(&self, _visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        Err(ExecuteError::NoCurrentTuple(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::PhysicalOperator;
    use super::*;

    #[test]
    fn test_renames_on_open() {
        let f = fixture(&[1]);
        let mut op = PhysicalOperator::Rename(RenameOperator::new(f.catalog.clone(), f.table.clone(), "people"));
        assert_eq!(op.param(), "t TO people");

        op.open(&f.manager.begin()).unwrap();
        assert!(!f.catalog.table_exists("t"));
        assert_eq!(f.catalog.table("people").unwrap().name(), "people");
        assert_eq!(f.table.name(), "people");
    }

    #[test]
    fn test_target_taken() {
        let f = fixture(&[]);
        f.catalog
            .create_table("u", vec![crate::catalog::FieldMeta::new("k", crate::catalog::DataType::Integer)])
            .unwrap();
        let mut op = PhysicalOperator::Rename(RenameOperator::new(f.catalog.clone(), f.table.clone(), "u"));
        assert!(op.open(&f.manager.begin()).is_err());
        assert!(f.catalog.table_exists("t"));
    }
}
