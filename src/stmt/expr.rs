//! Resolved scalar expressions.
//!
//! Field references are already bound to a table (or sub-query alias) and
//! carry their static type, so `value_type` never needs the catalog.

use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{DataType, Value};

/// A resolved field reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    /// Table name or sub-query alias the field belongs to.
    pub table: String,
    pub field: String,
    pub data_type: DataType,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompOp::Eq => "=",
            CompOp::NotEq => "<>",
            CompOp::Lt => "<",
            CompOp::LtEq => "<=",
            CompOp::Gt => ">",
            CompOp::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjunctionKind {
    And,
    Or,
}

/// Arithmetic operators. `Negate` is unary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Negate,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub | ArithmeticOp::Negate => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        };
        write!(f, "{}", s)
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        };
        write!(f, "{}", s)
    }
}

/// An aggregate call. `arg == None` means `COUNT(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunc,
    pub arg: Option<Box<Expression>>,
}

impl AggregateExpr {
    pub fn value_type(&self) -> DataType {
        match (self.func, &self.arg) {
            (AggregateFunc::Count, _) => DataType::Integer,
            (AggregateFunc::Avg, _) => DataType::Float,
            (_, Some(arg)) => arg.value_type(),
            (_, None) => DataType::Undefined,
        }
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}({})", self.func, arg),
            None => write!(f, "{}(*)", self.func),
        }
    }
}

/// SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Field reference.
    Field(FieldExpr),
    /// Literal value.
    Value(Value),
    /// Binary comparison, always boolean.
    Comparison {
        op: CompOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// AND / OR over any number of boolean children.
    Conjunction {
        kind: ConjunctionKind,
        children: Vec<Expression>,
    },
    /// Arithmetic; `right` is `None` only for `Negate`.
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Option<Box<Expression>>,
    },
    /// IS [NOT] NULL.
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
    /// Aggregate call, only valid above an aggregate operator.
    Aggregate(AggregateExpr),
}

impl Expression {
    pub fn field(table: impl Into<String>, field: impl Into<String>, data_type: DataType) -> Self {
        Expression::Field(FieldExpr {
            table: table.into(),
            field: field.into(),
            data_type,
        })
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Value(value.into())
    }

    pub fn comparison(op: CompOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    pub fn and(children: Vec<Expression>) -> Self {
        Expression::Conjunction {
            kind: ConjunctionKind::And,
            children,
        }
    }

    pub fn aggregate(func: AggregateFunc, arg: Option<Expression>) -> Self {
        Expression::Aggregate(AggregateExpr {
            func,
            arg: arg.map(Box::new),
        })
    }

    /// Static result type.
    pub fn value_type(&self) -> DataType {
        match self {
            Expression::Field(field) => field.data_type,
            Expression::Value(value) => value.data_type(),
            Expression::Comparison { .. }
            | Expression::Conjunction { .. }
            | Expression::IsNull { .. } => DataType::Boolean,
            Expression::Arithmetic { op, left, right } => {
                let left_type = left.value_type();
                match (op, right) {
                    (ArithmeticOp::Div, _) => DataType::Float,
                    (ArithmeticOp::Negate, _) | (_, None) => left_type,
                    (_, Some(right)) => {
                        if left_type == DataType::Integer && right.value_type() == DataType::Integer {
                            DataType::Integer
                        } else {
                            DataType::Float
                        }
                    }
                }
            }
            Expression::Aggregate(agg) => agg.value_type(),
        }
    }

    /// Whether the expression can serve as a filter condition.
    pub fn is_boolean(&self) -> bool {
        matches!(self.value_type(), DataType::Boolean | DataType::Undefined)
    }

    /// Visit every field reference, including those inside aggregate calls.
    pub fn visit_fields<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldExpr)) {
        self.walk_fields(true, visit);
    }

    /// Visit the field references that are not arguments of an aggregate
    /// call. Above a grouping aggregate these must be grouped columns.
    pub fn visit_ungrouped_fields<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldExpr)) {
        self.walk_fields(false, visit);
    }

    fn walk_fields<'a>(&'a self, into_aggregates: bool, visit: &mut dyn FnMut(&'a FieldExpr)) {
        match self {
            Expression::Field(field) => visit(field),
            Expression::Value(_) => {}
            Expression::Comparison { left, right, .. } => {
                left.walk_fields(into_aggregates, visit);
                right.walk_fields(into_aggregates, visit);
            }
            Expression::Conjunction { children, .. } => {
                for child in children {
                    child.walk_fields(into_aggregates, visit);
                }
            }
            Expression::Arithmetic { left, right, .. } => {
                left.walk_fields(into_aggregates, visit);
                if let Some(right) = right {
                    right.walk_fields(into_aggregates, visit);
                }
            }
            Expression::IsNull { expr, .. } => expr.walk_fields(into_aggregates, visit),
            Expression::Aggregate(agg) => {
                if let Some(arg) = agg.arg.as_ref().filter(|_| into_aggregates) {
                    arg.walk_fields(into_aggregates, visit);
                }
            }
        }
    }

    /// Names of the tables (or aliases) this expression reads.
    pub fn referenced_tables(&self) -> BTreeSet<String> {
        let mut tables = BTreeSet::new();
        self.visit_fields(&mut |field| {
            tables.insert(field.table.clone());
        });
        tables
    }

    /// Collect the distinct aggregate calls in this expression.
    pub fn collect_aggregates(&self, out: &mut Vec<AggregateExpr>) {
        match self {
            Expression::Aggregate(agg) => {
                if !out.contains(agg) {
                    out.push(agg.clone());
                }
            }
            Expression::Field(_) | Expression::Value(_) => {}
            Expression::Comparison { left, right, .. } => {
                left.collect_aggregates(out);
                right.collect_aggregates(out);
            }
            Expression::Conjunction { children, .. } => {
                for child in children {
                    child.collect_aggregates(out);
                }
            }
            Expression::Arithmetic { left, right, .. } => {
                left.collect_aggregates(out);
                if let Some(right) = right {
                    right.collect_aggregates(out);
                }
            }
            Expression::IsNull { expr, .. } => expr.collect_aggregates(out),
        }
    }

    pub fn has_aggregate(&self) -> bool {
        let mut found = Vec::new();
        self.collect_aggregates(&mut found);
        !found.is_empty()
    }

    /// Split a condition into its top-level AND terms.
    pub fn into_conjuncts(self) -> Vec<Expression> {
        match self {
            Expression::Conjunction {
                kind: ConjunctionKind::And,
                children,
            } => children.into_iter().flat_map(Expression::into_conjuncts).collect(),
            other => vec![other],
        }
    }

    /// Inverse of `into_conjuncts`.
    pub fn from_conjuncts(mut conjuncts: Vec<Expression>) -> Option<Expression> {
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(Expression::and(conjuncts)),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Field(field) => write!(f, "{}.{}", field.table, field.field),
            Expression::Value(value) => write!(f, "{}", value),
            Expression::Comparison { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expression::Conjunction { kind, children } => {
                let sep = match kind {
                    ConjunctionKind::And => " AND ",
                    ConjunctionKind::Or => " OR ",
                };
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join(sep))
            }
            Expression::Arithmetic { op, left, right } => match right {
                Some(right) => write!(f, "{}{}{}", left, op, right),
                None => write!(f, "-{}", left),
            },
            Expression::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expr)
                } else {
                    write!(f, "{} IS NULL", expr)
                }
            }
            Expression::Aggregate(agg) => write!(f, "{}", agg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Expression {
        Expression::field("t", "id", DataType::Integer)
    }

    #[test]
    fn test_value_types() {
        let cmp = Expression::comparison(CompOp::Gt, id(), Expression::value(5));
        assert_eq!(cmp.value_type(), DataType::Boolean);
        assert!(cmp.is_boolean());

        let sum = Expression::arithmetic(ArithmeticOp::Add, id(), Expression::value(1));
        assert_eq!(sum.value_type(), DataType::Integer);
        assert!(!sum.is_boolean());

        let div = Expression::arithmetic(ArithmeticOp::Div, id(), Expression::value(2));
        assert_eq!(div.value_type(), DataType::Float);

        let avg = Expression::aggregate(AggregateFunc::Avg, Some(id()));
        assert_eq!(avg.value_type(), DataType::Float);
    }

    #[test]
    fn test_display() {
        let cmp = Expression::comparison(CompOp::Gt, id(), Expression::value(5));
        assert_eq!(cmp.to_string(), "t.id > 5");

        let calc = Expression::arithmetic(ArithmeticOp::Add, Expression::value(1), Expression::value(1));
        assert_eq!(calc.to_string(), "1+1");

        assert_eq!(Expression::aggregate(AggregateFunc::Count, None).to_string(), "COUNT(*)");
    }

    #[test]
    fn test_conjunct_split() {
        let a = Expression::comparison(CompOp::Gt, id(), Expression::value(5));
        let b = Expression::comparison(
            CompOp::Eq,
            Expression::field("u", "id", DataType::Integer),
            id(),
        );
        let nested = Expression::and(vec![a.clone(), Expression::and(vec![b.clone()])]);

        let conjuncts = nested.into_conjuncts();
        assert_eq!(conjuncts, vec![a.clone(), b.clone()]);
        assert_eq!(conjuncts[1].referenced_tables().len(), 2);

        let rebuilt = Expression::from_conjuncts(vec![a.clone()]).unwrap();
        assert_eq!(rebuilt, a);
        assert!(Expression::from_conjuncts(Vec::new()).is_none());
    }

    #[test]
    fn test_ungrouped_fields_skip_aggregate_args() {
        let name = Expression::field("t", "name", DataType::Text);
        let expr = Expression::arithmetic(
            ArithmeticOp::Add,
            id(),
            Expression::aggregate(AggregateFunc::Count, Some(name)),
        );

        let mut all = Vec::new();
        expr.visit_fields(&mut |f| all.push(f.field.clone()));
        assert_eq!(all, vec!["id", "name"]);

        let mut ungrouped = Vec::new();
        expr.visit_ungrouped_fields(&mut |f| ungrouped.push(f.field.clone()));
        assert_eq!(ungrouped, vec!["id"]);
    }

    #[test]
    fn test_collect_aggregates_dedupes() {
        let count = Expression::aggregate(AggregateFunc::Count, None);
        let expr = Expression::comparison(CompOp::Gt, count.clone(), count);
        let mut aggs = Vec::new();
        expr.collect_aggregates(&mut aggs);
        assert_eq!(aggs.len(), 1);
        assert!(expr.has_aggregate());
    }
}
