use tracing::info;

use super::{Operator, Step, TupleVisitor};
use crate::catalog::{Catalog, FieldMeta};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::Tuple;

/// CREATE TABLE. The table is created when the operator is opened.
pub struct CreateTableOperator {
    catalog: Catalog,
    name: String,
    fields: Vec<FieldMeta>,
}

impl CreateTableOperator {
    pub fn new(catalog: Catalog, name: impl Into<String>, fields: Vec<FieldMeta>) -> Self {
        Self {
            catalog,
            name: name.into(),
            fields,
        }
    }
}

impl Operator for CreateTableOperator {
    fn name(&self) -> &'static str {
        "CREATE_TABLE"
    }

    fn param(&self) -> String {
        let fields: Vec<String> = self.fields.iter().map(|f| f.to_string()).collect();
        format!("{} ({})", self.name, fields.join(", "))
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        self.catalog.create_table(&self.name, self.fields.clone())?;
        info!(table = %self.name, fields = self.fields.len(), tx = trx.label(), "table created by statement");
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
    use crate::catalog::DataType;
    use crate::storage::StorageError;
    use crate::tuple::EmptyTuple;

    #[test]
    fn test_creates_on_open() {
        let f = fixture(&[]);
        let fields = vec![FieldMeta::new("id", DataType::Integer).not_null()];
        let mut op = PhysicalOperator::CreateTable(CreateTableOperator::new(f.catalog.clone(), "u", fields));
        assert_eq!(op.label(), "CREATE_TABLE(u (id INT NOT NULL))");

        op.open(&f.manager.begin()).unwrap();
        assert!(f.catalog.table_exists("u"));
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    }

    #[test]
    fn test_duplicate_table() {
        let f = fixture(&[]);
        let fields = vec![FieldMeta::new("id", DataType::Integer)];
        let mut op = PhysicalOperator::CreateTable(CreateTableOperator::new(f.catalog.clone(), "t", fields));
        let err = op.open(&f.manager.begin()).unwrap_err();
        assert!(matches!(err, ExecuteError::Storage(StorageError::TableAlreadyExists(_))));
    }
}
