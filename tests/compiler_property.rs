// tests/compiler_property.rs

use std::time::Instant;

use proptest::prelude::*;

use calcdag::compiler::compile;
use calcdag::dag::{ExpressionRecord, TaskStore};
use calcdag::exec::evaluate;
use calcdag::types::{ExpressionId, ExpressionStatus, Operation};

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Bin(Operation, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn operators(&self) -> usize {
        match self {
            Expr::Num(_) => 0,
            Expr::Bin(_, l, r) => 1 + l.operators() + r.operators(),
        }
    }

    /// Direct evaluation; `None` if any division has a zero divisor.
    fn eval(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            Expr::Bin(op, l, r) => {
                let (l, r) = (l.eval(), r.eval());
                evaluate(*op, l?, r?).ok()
            }
        }
    }

    /// Render with the minimum parentheses that keep the tree's shape
    /// under left-associative precedence parsing.
    fn render(&self) -> String {
        match self {
            Expr::Num(v) => format!("{v}"),
            Expr::Bin(op, l, r) => {
                let left = match l.as_ref() {
                    Expr::Bin(lop, ..) if lop.precedence() < op.precedence() => {
                        format!("({})", l.render())
                    }
                    _ => l.render(),
                };
                let right = match r.as_ref() {
                    Expr::Bin(rop, ..) if rop.precedence() <= op.precedence() => {
                        format!("({})", r.render())
                    }
                    _ => r.render(),
                };
                format!("{left} {} {right}", op.symbol())
            }
        }
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    prop::sample::select(Operation::ALL.to_vec())
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    // Small integers and one-decimal values; zero shows up often enough to
    // exercise division failures.
    let leaf = (0u16..200, prop::bool::ANY).prop_map(|(n, tenth)| {
        Expr::Num(if tenth { f64::from(n) / 10.0 } else { f64::from(n % 10) })
    });

    leaf.prop_recursive(5, 32, 2, |inner| {
        (operation(), inner.clone(), inner)
            .prop_map(|(op, l, r)| Expr::Bin(op, Box::new(l), Box::new(r)))
    })
}

fn binary_expr_strategy() -> impl Strategy<Value = Expr> {
    (operation(), expr_strategy(), expr_strategy())
        .prop_map(|(op, l, r)| Expr::Bin(op, Box::new(l), Box::new(r)))
}

/// Run every task of a freshly stored expression to completion on one
/// thread and return the expression's final state.
fn run_to_completion(source: &str) -> (ExpressionStatus, Option<f64>) {
    let mut store = TaskStore::new();
    let id = ExpressionId::new();
    let graph = compile(source).expect("generated expression compiles");
    store
        .add_expression_with_graph(ExpressionRecord::new(id, source), graph)
        .expect("compiled graph is accepted");

    while let Ok(task) = store.next_ready_task(Instant::now()) {
        match evaluate(task.operation, task.lhs, task.rhs) {
            Ok(value) => {
                store.complete_task(task.id, value).expect("claimed task completes");
            }
            Err(err) => {
                store.fail_task(task.id, &err.to_string()).expect("claimed task fails");
            }
        }
    }

    let record = store.expression(id).expect("expression stored");
    (record.status, record.result)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn compiled_graph_has_one_task_per_operator(expr in binary_expr_strategy()) {
        let source = expr.render();
        let graph = compile(&source).expect("generated expression compiles");

        prop_assert_eq!(graph.len(), expr.operators());
        prop_assert!(graph.validate().is_ok(), "{} produced an invalid graph", source);

        for task in graph.tasks() {
            for dep in task.dependencies() {
                prop_assert!(dep < task.id);
            }
        }
    }

    #[test]
    fn scheduled_result_matches_direct_evaluation(expr in binary_expr_strategy()) {
        let source = expr.render();
        let (status, result) = run_to_completion(&source);

        match expr.eval() {
            Some(expected) => {
                prop_assert_eq!(status, ExpressionStatus::Done, "{}", source);
                prop_assert_eq!(result, Some(expected), "{}", source);
            }
            None => {
                prop_assert_eq!(status, ExpressionStatus::Error, "{}", source);
                prop_assert_eq!(result, None);
            }
        }
    }

    #[test]
    fn store_never_hands_out_unresolved_tasks(
        exprs in proptest::collection::vec(binary_expr_strategy(), 1..6)
    ) {
        let mut store = TaskStore::new();
        for expr in &exprs {
            let source = expr.render();
            store
                .add_expression_with_graph(
                    ExpressionRecord::new(ExpressionId::new(), source.clone()),
                    compile(&source).expect("generated expression compiles"),
                )
                .expect("compiled graph is accepted");
        }

        // Claim everything ready, then report in reverse claim order.
        loop {
            let mut batch = Vec::new();
            while let Ok(task) = store.next_ready_task(Instant::now()) {
                batch.push(task);
            }
            if batch.is_empty() {
                break;
            }
            for task in batch.into_iter().rev() {
                match evaluate(task.operation, task.lhs, task.rhs) {
                    Ok(value) => { store.complete_task(task.id, value).expect("complete"); }
                    Err(err) => { store.fail_task(task.id, &err.to_string()).expect("fail"); }
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.blocked + stats.ready + stats.assigned, 0);
        prop_assert!(store.expressions().all(|e| e.status.is_terminal()));
    }
}
