//! End-to-end planning and iteration scenarios, driven through the public API.

use std::sync::Arc;

use qplan::catalog::{Catalog, DataType, FieldMeta, Value};
use qplan::config::{ConflictPolicy, PlannerConfig};
use qplan::executor::operators::{
    Operator, PhysicalOperator, PredicateOperator, Step, TableScanOperator,
};
use qplan::executor::{QueryExecutor, QueryResult};
use qplan::planner::LogicalPlanGenerator;
use qplan::stmt::{
    AggregateFunc, ArithmeticOp, Assignment, CalcStmt, CompOp, CreateTableStmt, DeleteStmt,
    ExplainStmt, Expression, FromItem, InsertStmt, OrderBy, ProjectExpr, RenameTableStmt,
    SelectStmt, Statement, UpdateStmt,
};
use qplan::storage::Table;
use qplan::transaction::{Transaction, TransactionManager};
use qplan::tuple::{EmptyTuple, Tuple};

struct Db {
    catalog: Catalog,
    manager: TransactionManager,
    table: Arc<Table>,
}

fn db() -> Db {
    let catalog = Catalog::new();
    let table = catalog
        .create_table(
            "t",
            vec![
                FieldMeta::new("id", DataType::Integer),
                FieldMeta::new("name", DataType::Text),
            ],
        )
        .unwrap();
    Db {
        catalog,
        manager: TransactionManager::new(),
        table,
    }
}

fn id() -> Expression {
    Expression::field("t", "id", DataType::Integer)
}

fn id_gt(n: i64) -> Expression {
    Expression::comparison(CompOp::Gt, id(), Expression::value(n))
}

fn row(n: i64) -> Vec<Value> {
    vec![Value::Integer(n), Value::Text(format!("n{}", n))]
}

/// Leaves `id` inserted by a transaction that is still running.
fn conflicting_insert(db: &Db, n: i64) -> Transaction {
    let writer = db.manager.begin();
    writer.insert_record(&db.table, row(n)).unwrap();
    writer
}

fn committed_insert(db: &Db, n: i64) {
    let trx = db.manager.begin();
    trx.insert_record(&db.table, row(n)).unwrap();
    trx.commit().unwrap();
}

fn write_predicate(db: &Db, expr: Expression, policy: ConflictPolicy) -> PhysicalOperator {
    let scan = TableScanOperator::new(db.table.clone(), vec![0, 1], false, Vec::new(), policy).unwrap();
    PhysicalOperator::Predicate(
        PredicateOperator::new(expr, policy).with_child(PhysicalOperator::TableScan(scan)),
    )
}

fn current_id(op: &PhysicalOperator) -> Value {
    op.current_row().unwrap().cell_at(0).unwrap()
}

#[test]
fn scenario_a_childless_projection() {
    let db = db();
    let exec = QueryExecutor::new(db.catalog.clone(), db.manager.clone());
    let select = SelectStmt {
        projections: vec![ProjectExpr::new(Expression::arithmetic(
            ArithmeticOp::Add,
            Expression::value(1),
            Expression::value(1),
        ))],
        ..Default::default()
    };

    let mut op = exec.plan(&Statement::Select(select)).unwrap();
    assert!(op.children().is_empty());

    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
    assert_eq!(current_id(&op), Value::Integer(2));
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    op.close().unwrap();
}

#[test]
fn scenario_b_empty_table() {
    let db = db();
    let mut op = write_predicate(&db, id_gt(5), ConflictPolicy::default());

    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    op.close().unwrap();
    op.close().unwrap();
}

#[test]
fn scenario_c_matching_conflict_surfaces() {
    let db = db();
    let _writer = conflicting_insert(&db, 7);
    let mut op = write_predicate(&db, id_gt(5), ConflictPolicy::default());

    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Conflict);
    assert_eq!(current_id(&op), Value::Integer(7));
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    op.close().unwrap();
}

#[test]
fn scenario_d_unmatched_conflict_is_absorbed() {
    let db = db();
    let _writer = conflicting_insert(&db, 7);
    committed_insert(&db, 12);

    let mut op = write_predicate(&db, id_gt(10), ConflictPolicy::AbsorbUnmatched);
    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
    assert_eq!(current_id(&op), Value::Integer(12));
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    op.close().unwrap();

    let mut op = write_predicate(&db, id_gt(10), ConflictPolicy::SurfaceAll);
    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Conflict);
    assert_eq!(current_id(&op), Value::Integer(7));
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
    assert_eq!(current_id(&op), Value::Integer(12));
    op.close().unwrap();
}

#[test]
fn scenario_e_explain_never_runs_its_plan() {
    let db = db();
    committed_insert(&db, 1);
    committed_insert(&db, 9);
    let mut exec = QueryExecutor::new(db.catalog.clone(), db.manager.clone());

    let delete = Statement::Delete(DeleteStmt {
        table: db.table.clone(),
        filter: Some(id_gt(5)),
    });
    let explain = Statement::Explain(ExplainStmt {
        statement: Box::new(delete),
    });
    let result = exec.execute(&explain).unwrap();
    let rs = result.rows().unwrap();
    assert_eq!(
        rs.rows,
        vec![vec![Value::from("DELETE(t)\n└─PREDICATE(t.id > 5)\n  └─TABLE_SCAN(t)")]]
    );

    let select = Statement::Select(SelectStmt {
        projections: vec![ProjectExpr::new(id())],
        from: vec![FromItem::table(db.table.clone())],
        ..Default::default()
    });
    let result = exec.execute(&select).unwrap();
    assert_eq!(result.rows().unwrap().len(), 2);
}

#[test]
fn predicate_never_returns_false_rows() {
    let db = db();
    for n in 0..20 {
        committed_insert(&db, n);
    }
    let mut op = write_predicate(&db, id_gt(13), ConflictPolicy::SurfaceAll);
    op.open(&db.manager.begin()).unwrap();

    let mut seen = Vec::new();
    while op.next(&EmptyTuple).unwrap() != Step::Eof {
        match current_id(&op) {
            Value::Integer(n) => {
                assert!(n > 13);
                seen.push(n);
            }
            other => panic!("unexpected {}", other),
        }
    }
    assert_eq!(seen, vec![14, 15, 16, 17, 18, 19]);
    op.close().unwrap();
}

#[test]
fn root_table_set_matches_statement() {
    let db = db();
    let u = db
        .catalog
        .create_table("u", vec![FieldMeta::new("tid", DataType::Integer)])
        .unwrap();
    let tid = Expression::field("u", "tid", DataType::Integer);

    let join = SelectStmt {
        projections: vec![ProjectExpr::new(tid.clone())],
        from: vec![
            FromItem::table(db.table.clone()),
            FromItem::join(u.clone(), Expression::comparison(CompOp::Eq, id(), tid.clone())),
        ],
        filter: Some(id_gt(1)),
        ..Default::default()
    };
    let grouped = SelectStmt {
        projections: vec![
            ProjectExpr::new(tid.clone()),
            ProjectExpr::new(Expression::aggregate(AggregateFunc::Count, None)),
        ],
        from: vec![FromItem::table(u.clone())],
        group_by: vec![tid.clone()],
        order_by: vec![OrderBy {
            expr: tid.clone(),
            ascending: true,
        }],
        ..Default::default()
    };
    let nested = SelectStmt {
        projections: vec![ProjectExpr::new(Expression::field("s", "id", DataType::Integer))],
        from: vec![FromItem::sub_query(
            SelectStmt {
                projections: vec![ProjectExpr::new(id())],
                from: vec![FromItem::table(db.table.clone())],
                ..Default::default()
            },
            "s",
        )],
        ..Default::default()
    };

    let statements = vec![
        Statement::Select(join.clone()),
        Statement::Select(grouped),
        Statement::Select(nested),
        Statement::Insert(InsertStmt {
            table: u.clone(),
            records: vec![vec![Value::Integer(1)]],
        }),
        Statement::Delete(DeleteStmt {
            table: db.table.clone(),
            filter: None,
        }),
        Statement::Update(UpdateStmt {
            table: db.table.clone(),
            assignments: vec![Assignment {
                field: "name".into(),
                value: Expression::value("x"),
            }],
            filter: Some(id_gt(3)),
        }),
        Statement::Explain(ExplainStmt {
            statement: Box::new(Statement::Select(join)),
        }),
        Statement::CreateTable(CreateTableStmt {
            name: "v".into(),
            fields: vec![FieldMeta::new("k", DataType::Integer)],
        }),
        Statement::RenameTable(RenameTableStmt {
            table: u,
            new_name: "w".into(),
        }),
        Statement::Calc(CalcStmt {
            expressions: vec![Expression::value(1)],
        }),
    ];

    for config in [
        PlannerConfig::default(),
        PlannerConfig {
            cache_join_inner: false,
            conflict_policy: ConflictPolicy::SurfaceAll,
        },
    ] {
        let generator = LogicalPlanGenerator::new(config);
        for stmt in &statements {
            let plan = generator.create(stmt).unwrap();
            assert_eq!(plan.tables(), &stmt.referenced_tables(), "{}", stmt.kind());
        }
    }
}

#[test]
fn close_twice_after_join_iteration() {
    let db = db();
    committed_insert(&db, 1);
    let exec = QueryExecutor::new(db.catalog.clone(), db.manager.clone());
    let u = db
        .catalog
        .create_table("u", vec![FieldMeta::new("tid", DataType::Integer)])
        .unwrap();
    let trx = db.manager.begin();
    trx.insert_record(&u, vec![Value::Integer(1)]).unwrap();
    trx.commit().unwrap();

    let select = SelectStmt {
        projections: vec![ProjectExpr::new(id())],
        from: vec![FromItem::table(db.table.clone()), FromItem::table(u)],
        ..Default::default()
    };
    let mut op = exec.plan(&Statement::Select(select)).unwrap();
    op.open(&db.manager.begin()).unwrap();
    assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);

    op.close().unwrap();
    op.close().unwrap();
    assert!(op.current_row().is_err());
}

#[test]
fn join_and_aggregate_through_executor() {
    let db = db();
    for n in [1, 2, 3] {
        committed_insert(&db, n);
    }
    let scores = db
        .catalog
        .create_table(
            "s",
            vec![
                FieldMeta::new("tid", DataType::Integer),
                FieldMeta::new("score", DataType::Integer),
            ],
        )
        .unwrap();
    let mut exec = QueryExecutor::new(db.catalog.clone(), db.manager.clone());
    exec.execute(&Statement::Insert(InsertStmt {
        table: scores.clone(),
        records: vec![
            vec![Value::Integer(1), Value::Integer(10)],
            vec![Value::Integer(1), Value::Integer(5)],
            vec![Value::Integer(3), Value::Integer(7)],
        ],
    }))
    .unwrap();

    let tid = Expression::field("s", "tid", DataType::Integer);
    let score = Expression::field("s", "score", DataType::Integer);
    let name = Expression::field("t", "name", DataType::Text);
    let total = Expression::aggregate(AggregateFunc::Sum, Some(score));
    let select = SelectStmt {
        projections: vec![
            ProjectExpr::new(name.clone()),
            ProjectExpr::new(total.clone()).with_alias("total"),
        ],
        from: vec![
            FromItem::table(db.table.clone()),
            FromItem::join(scores, Expression::comparison(CompOp::Eq, id(), tid)),
        ],
        group_by: vec![name],
        order_by: vec![OrderBy {
            expr: total,
            ascending: false,
        }],
        ..Default::default()
    };

    let result = exec.execute(&Statement::Select(select)).unwrap();
    let QueryResult::Select(rs) = result else {
        panic!("expected rows");
    };
    assert_eq!(rs.columns, vec!["t.name".to_string(), "total".to_string()]);
    assert_eq!(
        rs.rows,
        vec![
            vec![Value::from("n1"), Value::Integer(15)],
            vec![Value::from("n3"), Value::Integer(7)],
        ]
    );
}

#[test]
fn grouping_errors_surface_at_plan_time() {
    let db = db();
    for n in [1, 2, 2] {
        committed_insert(&db, n);
    }
    let mut exec = QueryExecutor::new(db.catalog.clone(), db.manager.clone());
    let name = Expression::field("t", "name", DataType::Text);

    let by_name = SelectStmt {
        projections: vec![ProjectExpr::new(id())],
        from: vec![FromItem::table(db.table.clone())],
        group_by: vec![id()],
        order_by: vec![OrderBy {
            expr: name,
            ascending: true,
        }],
        ..Default::default()
    };
    assert!(exec.plan(&Statement::Select(by_name)).is_err());

    let shifted = SelectStmt {
        projections: vec![
            ProjectExpr::new(Expression::arithmetic(ArithmeticOp::Add, id(), Expression::value(1)))
                .with_alias("next"),
            ProjectExpr::new(Expression::aggregate(AggregateFunc::Count, None)),
        ],
        from: vec![FromItem::table(db.table.clone())],
        group_by: vec![id()],
        order_by: vec![OrderBy {
            expr: id(),
            ascending: true,
        }],
        ..Default::default()
    };
    let result = exec.execute(&Statement::Select(shifted)).unwrap();
    assert_eq!(
        result.rows().unwrap().rows,
        vec![
            vec![Value::Integer(2), Value::Integer(1)],
            vec![Value::Integer(3), Value::Integer(2)],
        ]
    );
}
