use std::cmp::Ordering;

use super::{check_children, close_children, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate;
use crate::stmt::{AggregateExpr, AggregateFunc, Expression, ProjectExpr};
use crate::transaction::Transaction;
use crate::tuple::{EmptyTuple, Tuple, TupleCellSpec, ValueListTuple};

/// Running state of one aggregate call.
#[derive(Debug, Clone)]
struct Accumulator {
    func: AggregateFunc,
    count: i64,
    sum: Option<Value>,
    best: Option<Value>,
}

impl Accumulator {
    fn new(func: AggregateFunc) -> Self {
        Self {
            func,
            count: 0,
            sum: None,
            best: None,
        }
    }

    /// Feed one input. `None` is a `COUNT(*)` row.
    fn update(&mut self, value: Option<Value>) -> ExecuteResult<()> {
        let Some(value) = value else {
            self.count += 1;
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;

        match self.func {
            AggregateFunc::Count => {}
            AggregateFunc::Sum | AggregateFunc::Avg => {
                self.sum = Some(match self.sum.take() {
                    None => numeric(value)?,
                    Some(sum) => add(sum, value)?,
                });
            }
            AggregateFunc::Min | AggregateFunc::Max => {
                let wanted = if self.func == AggregateFunc::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match &self.best {
                    None => true,
                    Some(best) => value.total_cmp(best) == wanted,
                };
                if replace {
                    self.best = Some(value);
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        match self.func {
            AggregateFunc::Count => Value::Integer(self.count),
            AggregateFunc::Sum => self.sum.clone().unwrap_or(Value::Null),
            AggregateFunc::Avg => match self.sum.as_ref().and_then(Value::as_f64) {
                Some(sum) if self.count > 0 => Value::Float(sum / self.count as f64),
                _ => Value::Null,
            },
            AggregateFunc::Min | AggregateFunc::Max => self.best.clone().unwrap_or(Value::Null),
        }
    }
}

fn numeric(value: Value) -> ExecuteResult<Value> {
    match value {
        Value::Integer(_) | Value::Float(_) => Ok(value),
        other => Err(ExecuteError::TypeMismatch {
            expected: "numeric".into(),
            actual: other.data_type().to_string(),
        }),
    }
}

fn add(sum: Value, value: Value) -> ExecuteResult<Value> {
    match (sum, numeric(value)?) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(b)
            .map(Value::Integer)
            .ok_or_else(|| ExecuteError::Overflow(format!("{} + {}", a, b))),
        (a, b) => {
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            Ok(Value::Float(x + y))
        }
    }
}

struct Group {
    key: Vec<Value>,
    accumulators: Vec<Accumulator>,
    conflict: bool,
}

/// Grouping aggregate: buffers all input on open, then emits one
/// row per group in first-seen order.
///
/// Output cells are the group-by expressions followed by the aggregate
/// calls, named so that expressions above (HAVING, the SELECT list) can
/// find them again.
pub struct AggregateOperator {
    group_by: Vec<Expression>,
    aggregates: Vec<AggregateExpr>,
    children: Vec<PhysicalOperator>,
    output: Vec<(ValueListTuple, Step)>,
    position: usize,
    current: Option<usize>,
}

impl AggregateOperator {
    pub fn new(
        group_by: Vec<Expression>,
        aggregates: Vec<AggregateExpr>,
        child: PhysicalOperator,
    ) -> Self {
        Self {
            group_by,
            aggregates,
            children: vec![child],
            output: Vec::new(),
            position: 0,
            current: None,
        }
    }

    fn specs(&self) -> Vec<TupleCellSpec> {
        let keys = self
            .group_by
            .iter()
            .map(|expr| ProjectExpr::new(expr.clone()).spec());
        let aggs = self
            .aggregates
            .iter()
            .map(|agg| TupleCellSpec::new(agg.to_string()));
        keys.chain(aggs).collect()
    }

    fn build_groups(&mut self) -> ExecuteResult<Vec<Group>> {
        let group_by = &self.group_by;
        let aggregates = &self.aggregates;
        let child = &mut self.children[0];
        let mut groups: Vec<Group> = Vec::new();

        loop {
            let step = child.next(&EmptyTuple)?;
            if step == Step::Eof {
                break;
            }

            child.visit_current(&mut |tuple| {
                let key = group_by
                    .iter()
                    .map(|expr| evaluate(expr, tuple))
                    .collect::<ExecuteResult<Vec<_>>>()?;

                let index = match groups.iter().position(|g| same_key(&g.key, &key)) {
                    Some(index) => index,
                    None => {
                        groups.push(Group {
                            key,
                            accumulators: aggregates.iter().map(|a| Accumulator::new(a.func)).collect(),
                            conflict: false,
                        });
                        groups.len() - 1
                    }
                };

                let group = &mut groups[index];
                group.conflict |= step == Step::Conflict;
                for (acc, agg) in group.accumulators.iter_mut().zip(aggregates) {
                    let input = match &agg.arg {
                        Some(arg) => Some(evaluate(arg, tuple)?),
                        None => None,
                    };
                    acc.update(input)?;
                }
                Ok(())
            })?;
        }

        if groups.is_empty() && group_by.is_empty() {
            groups.push(Group {
                key: Vec::new(),
                accumulators: aggregates.iter().map(|a| Accumulator::new(a.func)).collect(),
                conflict: false,
            });
        }
        Ok(groups)
    }
}

fn same_key(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.total_cmp(y) == Ordering::Equal)
}

impl Operator for AggregateOperator {
    fn name(&self) -> &'static str {
        "AGGREGATE"
    }

    fn param(&self) -> String {
        let aggs: Vec<String> = self.aggregates.iter().map(|a| a.to_string()).collect();
        if self.group_by.is_empty() {
            aggs.join(", ")
        } else {
            let keys: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            format!("{} GROUP BY {}", aggs.join(", "), keys.join(", "))
        }
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.children[0].open(trx)?;

        let specs = self.specs();
        let groups = self.build_groups()?;
        self.output = groups
            .into_iter()
            .map(|group| {
                let status = if group.conflict { Step::Conflict } else { Step::Row };
                let mut values = group.key;
                values.extend(group.accumulators.iter().map(Accumulator::finish));
                (ValueListTuple::new(specs.clone(), values), status)
            })
            .collect();
        self.position = 0;
        self.current = None;
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        match self.output.get(self.position) {
            Some((_, step)) => {
                self.current = Some(self.position);
                self.position += 1;
                Ok(*step)
            }
            None => {
                self.current = None;
                Ok(Step::Eof)
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.output.clear();
        self.current = None;
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match self.current.and_then(|i| self.output.get(i)) {
            Some((row, _)) => visitor(row),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::catalog::{DataType, FieldMeta};

    fn id() -> Expression {
        Expression::field("t", "id", DataType::Integer)
    }

    fn agg(func: AggregateFunc, arg: Option<Expression>) -> AggregateExpr {
        AggregateExpr {
            func,
            arg: arg.map(Box::new),
        }
    }

    fn all_aggregates() -> Vec<AggregateExpr> {
        vec![
            agg(AggregateFunc::Count, None),
            agg(AggregateFunc::Sum, Some(id())),
            agg(AggregateFunc::Avg, Some(id())),
            agg(AggregateFunc::Min, Some(id())),
            agg(AggregateFunc::Max, Some(id())),
        ]
    }

    #[test]
    fn test_whole_table_aggregates() {
        let f = fixture(&[4, 1, 7]);
        let mut op = PhysicalOperator::Aggregate(AggregateOperator::new(
            Vec::new(),
            all_aggregates(),
            scan(&f.table, true),
        ));
        op.open(&f.manager.begin()).unwrap();

        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
        let row = op.current_row().unwrap();
        assert_eq!(
            row.values().unwrap(),
            vec![
                Value::Integer(3),
                Value::Integer(12),
                Value::Float(4.0),
                Value::Integer(1),
                Value::Integer(7),
            ]
        );
        assert_eq!(
            row.find_cell(&TupleCellSpec::new("SUM(t.id)")).unwrap(),
            Some(Value::Integer(12))
        );
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    }

    #[test]
    fn test_empty_input_without_group_by() {
        let f = fixture(&[]);
        let mut op = PhysicalOperator::Aggregate(AggregateOperator::new(
            Vec::new(),
            all_aggregates(),
            scan(&f.table, true),
        ));
        op.open(&f.manager.begin()).unwrap();

        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
        let row = op.current_row().unwrap();
        assert_eq!(
            row.values().unwrap(),
            vec![Value::Integer(0), Value::Null, Value::Null, Value::Null, Value::Null]
        );
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    }

    #[test]
    fn test_group_by() {
        let f = fixture(&[]);
        let sales = f
            .catalog
            .create_table(
                "s",
                vec![
                    FieldMeta::new("region", DataType::Text),
                    FieldMeta::new("amount", DataType::Integer),
                ],
            )
            .unwrap();
        let trx = f.manager.begin();
        for (region, amount) in [("east", 1), ("west", 5), ("east", 2), ("west", 0)] {
            trx.insert_record(&sales, vec![Value::from(region), Value::Integer(amount)])
                .unwrap();
        }
        trx.commit().unwrap();

        let region = Expression::field("s", "region", DataType::Text);
        let amount = Expression::field("s", "amount", DataType::Integer);
        let child = PhysicalOperator::TableScan(
            super::super::TableScanOperator::new(sales, vec![0, 1], true, Vec::new(), Default::default())
                .unwrap(),
        );
        let mut op = PhysicalOperator::Aggregate(AggregateOperator::new(
            vec![region],
            vec![agg(AggregateFunc::Sum, Some(amount))],
            child,
        ));
        assert_eq!(op.param(), "SUM(s.amount) GROUP BY s.region");
        op.open(&f.manager.begin()).unwrap();

        let rows = collect_first(&mut op);
        assert_eq!(
            rows,
            vec![(Value::from("east"), Step::Row), (Value::from("west"), Step::Row)]
        );
    }

    #[test]
    fn test_conflict_taints_group() {
        let f = fixture(&[1]);
        let writer = f.manager.begin();
        writer.insert_record(&f.table, vec![Value::Integer(2), Value::Null]).unwrap();

        let mut op = PhysicalOperator::Aggregate(AggregateOperator::new(
            Vec::new(),
            vec![agg(AggregateFunc::Count, None)],
            scan(&f.table, false),
        ));
        op.open(&f.manager.begin()).unwrap();
        assert_eq!(collect_first(&mut op), vec![(Value::Integer(2), Step::Conflict)]);
    }

    #[test]
    fn test_sum_rejects_text() {
        let f = fixture(&[1]);
        let name = Expression::field("t", "name", DataType::Text);
        let mut op = PhysicalOperator::Aggregate(AggregateOperator::new(
            Vec::new(),
            vec![agg(AggregateFunc::Sum, Some(name))],
            scan(&f.table, true),
        ));
        let err = op.open(&f.manager.begin()).unwrap_err();
        assert!(matches!(err, ExecuteError::TypeMismatch { .. }));
    }
}
