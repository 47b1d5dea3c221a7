// tests/task_store.rs

use std::error::Error;
use std::time::{Duration, Instant};

use calcdag::compiler::compile;
use calcdag::dag::{ExpressionRecord, StepDisposition, StoreStats, TaskSpec, TaskStore};
use calcdag::errors::CalcdagError;
use calcdag::types::{ExpressionId, ExpressionStatus, Operand, Operation, TaskId, TaskStatus};
use calcdag_test_utils::builders::{GraphBuilder, dep, lit};

type TestResult = Result<(), Box<dyn Error>>;

/// Register `source` in `store` and return the expression ID and the
/// store-global task IDs in compile order.
fn submit(store: &mut TaskStore, source: &str) -> Result<(ExpressionId, Vec<TaskId>), Box<dyn Error>> {
    let id = ExpressionId::new();
    let tasks = store.add_expression_with_graph(ExpressionRecord::new(id, source), compile(source)?)?;
    Ok((id, tasks))
}

fn status(store: &TaskStore, id: TaskId) -> TaskStatus {
    store.task(id).map(|t| t.status).expect("task exists")
}

#[test]
fn literal_tasks_start_ready_and_others_blocked() -> TestResult {
    let mut store = TaskStore::new();
    let (expr, tasks) = submit(&mut store, "(1+2)*(3+4)")?;

    assert_eq!(tasks.len(), 3);
    assert_eq!(status(&store, tasks[0]), TaskStatus::Ready);
    assert_eq!(status(&store, tasks[1]), TaskStatus::Ready);
    assert_eq!(status(&store, tasks[2]), TaskStatus::Blocked);

    let record = store.expression(expr).ok_or("expression missing")?;
    assert_eq!(record.status, ExpressionStatus::Pending);
    assert_eq!(record.root, Some(tasks[2]));
    assert_eq!(record.tasks, tasks);

    assert_eq!(store.dependents_of(tasks[0]), &[tasks[2]]);
    assert_eq!(store.dependents_of(tasks[1]), &[tasks[2]]);
    assert!(store.dependents_of(tasks[2]).is_empty());
    Ok(())
}

#[test]
fn end_to_end_manual_claims() -> TestResult {
    let mut store = TaskStore::new();
    let (expr, tasks) = submit(&mut store, "(2+3)*4")?;

    let first = store.next_ready_task(Instant::now())?;
    assert_eq!(first.id, tasks[0]);
    assert_eq!(first.operation, Operation::Add);
    assert_eq!((first.lhs, first.rhs), (2.0, 3.0));
    assert_eq!(first.attempt, 1);
    assert_eq!(
        store.expression(expr).map(|e| e.status),
        Some(ExpressionStatus::Processing)
    );

    // The multiplication cannot be claimed before the addition reports.
    assert!(matches!(
        store.next_ready_task(Instant::now()),
        Err(CalcdagError::NoTaskAvailable)
    ));

    let step = store.complete_task(first.id, 5.0)?;
    assert_eq!(step.newly_ready, vec![tasks[1]]);
    assert_eq!(step.expression_finished, None);

    let second = store.next_ready_task(Instant::now())?;
    assert_eq!(second.id, tasks[1]);
    assert_eq!((second.lhs, second.rhs), (5.0, 4.0));

    let step = store.complete_task(second.id, 20.0)?;
    assert_eq!(step.expression_finished, Some(ExpressionStatus::Done));

    let record = store.expression(expr).ok_or("expression missing")?;
    assert_eq!(record.status, ExpressionStatus::Done);
    assert_eq!(record.result, Some(20.0));
    assert_eq!(record.error, None);
    Ok(())
}

#[test]
fn task_with_two_dependencies_waits_for_both() -> TestResult {
    let mut store = TaskStore::new();
    let (_, tasks) = submit(&mut store, "(1+2)*(3+4)")?;
    let root = tasks[2];

    let a = store.next_ready_task(Instant::now())?;
    let b = store.next_ready_task(Instant::now())?;

    let step = store.complete_task(a.id, 3.0)?;
    assert!(step.newly_ready.is_empty());
    assert_eq!(status(&store, root), TaskStatus::Blocked);
    let record = store.task(root).ok_or("root missing")?;
    assert_eq!(record.lhs, Operand::Literal(3.0));
    assert_eq!(record.rhs, Operand::Task(b.id));
    assert!(matches!(
        store.next_ready_task(Instant::now()),
        Err(CalcdagError::NoTaskAvailable)
    ));

    let step = store.complete_task(b.id, 7.0)?;
    assert_eq!(step.newly_ready, vec![root]);
    assert_eq!(status(&store, root), TaskStatus::Ready);

    let claimed = store.next_ready_task(Instant::now())?;
    assert_eq!((claimed.lhs, claimed.rhs), (3.0, 7.0));
    Ok(())
}

#[test]
fn completing_twice_is_a_noop() -> TestResult {
    let mut store = TaskStore::new();
    let (_, tasks) = submit(&mut store, "(2+3)*4")?;

    let first = store.next_ready_task(Instant::now())?;
    let step = store.complete_task(first.id, 5.0)?;
    assert_eq!(step.disposition, StepDisposition::Applied);
    assert_eq!(step.newly_ready, vec![tasks[1]]);

    let again = store.complete_task(first.id, 5.0)?;
    assert_eq!(again.disposition, StepDisposition::Duplicate);
    assert!(again.newly_ready.is_empty());

    // The dependent was enqueued exactly once.
    store.next_ready_task(Instant::now())?;
    assert!(matches!(
        store.next_ready_task(Instant::now()),
        Err(CalcdagError::NoTaskAvailable)
    ));

    // A different value for a done task keeps the first one.
    let conflicting = store.complete_task(first.id, 99.0)?;
    assert_eq!(conflicting.disposition, StepDisposition::Duplicate);
    assert_eq!(store.task(first.id).and_then(|t| t.result), Some(5.0));
    Ok(())
}

#[test]
fn ready_tasks_are_claimed_in_fifo_order() -> TestResult {
    let mut store = TaskStore::new();
    let (_, first) = submit(&mut store, "1+2")?;
    let (_, second) = submit(&mut store, "(3+4)*(5+6)")?;
    let (_, third) = submit(&mut store, "7-8")?;

    let order: Vec<TaskId> = (0..4)
        .map(|_| store.next_ready_task(Instant::now()).map(|t| t.id))
        .collect::<Result<_, _>>()?;

    assert_eq!(order, vec![first[0], second[0], second[1], third[0]]);
    Ok(())
}

#[test]
fn task_ids_are_unique_across_expressions() -> TestResult {
    let mut store = TaskStore::new();
    let (_, a) = submit(&mut store, "1+2*3")?;
    let (_, b) = submit(&mut store, "1+2*3")?;

    assert_eq!(a, vec![TaskId(0), TaskId(1)]);
    assert_eq!(b, vec![TaskId(2), TaskId(3)]);
    assert_eq!(
        store.task(b[1]).map(|t| t.rhs),
        Some(Operand::Task(b[0]))
    );
    Ok(())
}

#[test]
fn failed_task_fails_expression_and_cancels_siblings() -> TestResult {
    let mut store = TaskStore::new();
    let (expr, tasks) = submit(&mut store, "(1/0)+(2*3)")?;

    let div = store.next_ready_task(Instant::now())?;
    let mul = store.next_ready_task(Instant::now())?;
    assert_eq!(div.operation, Operation::Divide);

    let step = store.fail_task(div.id, "Division by zero")?;
    assert_eq!(step.disposition, StepDisposition::Applied);
    assert_eq!(step.expression_finished, Some(ExpressionStatus::Error));
    assert_eq!(step.newly_failed[0], div.id);
    assert!(step.newly_failed.contains(&mul.id));
    assert!(step.newly_failed.contains(&tasks[2]));

    let record = store.expression(expr).ok_or("expression missing")?;
    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.error.as_deref(), Some("Division by zero"));
    assert_eq!(record.result, None);

    for id in &tasks {
        assert_eq!(status(&store, *id), TaskStatus::Failed);
    }

    // A late result from the sibling branch is discarded.
    let late = store.complete_task(mul.id, 6.0)?;
    assert_eq!(late.disposition, StepDisposition::Ignored);
    assert_eq!(
        store.expression(expr).map(|e| e.status),
        Some(ExpressionStatus::Error)
    );

    // Failing again changes nothing.
    let again = store.fail_task(div.id, "again")?;
    assert_eq!(again.disposition, StepDisposition::Ignored);
    Ok(())
}

#[test]
fn cancelled_tasks_are_never_handed_out() -> TestResult {
    let mut store = TaskStore::new();
    let (_, tasks) = submit(&mut store, "(1/0)+(2*3)")?;
    let (_, other) = submit(&mut store, "4+5")?;

    let div = store.next_ready_task(Instant::now())?;
    store.fail_task(div.id, "Division by zero")?;

    // tasks[1] is still in the ready queue but was cancelled.
    let next = store.next_ready_task(Instant::now())?;
    assert_ne!(next.id, tasks[1]);
    assert_eq!(next.id, other[0]);
    Ok(())
}

#[test]
fn failure_does_not_touch_other_expressions() -> TestResult {
    let mut store = TaskStore::new();
    let (bad, _) = submit(&mut store, "1/0")?;
    let (good, _) = submit(&mut store, "2+2")?;

    let div = store.next_ready_task(Instant::now())?;
    store.fail_task(div.id, "Division by zero")?;
    let add = store.next_ready_task(Instant::now())?;
    store.complete_task(add.id, 4.0)?;

    assert_eq!(store.expression(bad).map(|e| e.status), Some(ExpressionStatus::Error));
    assert_eq!(store.expression(good).map(|e| e.result), Some(Some(4.0)));
    Ok(())
}

#[test]
fn unknown_task_is_task_not_found() {
    let mut store = TaskStore::new();
    assert!(matches!(
        store.complete_task(TaskId(42), 1.0),
        Err(CalcdagError::TaskNotFound(TaskId(42)))
    ));
    assert!(matches!(
        store.fail_task(TaskId(42), "boom"),
        Err(CalcdagError::TaskNotFound(TaskId(42)))
    ));
}

#[test]
fn blocked_task_cannot_be_completed() -> TestResult {
    let mut store = TaskStore::new();
    let (_, tasks) = submit(&mut store, "(2+3)*4")?;

    let err = store.complete_task(tasks[1], 20.0).unwrap_err();
    assert!(matches!(err, CalcdagError::TaskNotClaimable(id) if id == tasks[1]));
    assert_eq!(status(&store, tasks[1]), TaskStatus::Blocked);
    Ok(())
}

#[test]
fn unclaimed_ready_task_cannot_be_completed() -> TestResult {
    let mut store = TaskStore::new();
    let (expr, tasks) = submit(&mut store, "(2+3)*4")?;
    assert_eq!(status(&store, tasks[0]), TaskStatus::Ready);

    let err = store.complete_task(tasks[0], 5.0).unwrap_err();
    assert!(matches!(err, CalcdagError::TaskNotClaimable(id) if id == tasks[0]));
    assert_eq!(status(&store, tasks[0]), TaskStatus::Ready);
    assert_eq!(store.task(tasks[0]).and_then(|t| t.result), None);

    // Once claimed, the same report goes through.
    let claimed = store.next_ready_task(Instant::now())?;
    assert_eq!(claimed.id, tasks[0]);
    let step = store.complete_task(tasks[0], 5.0)?;
    assert!(step.is_applied());
    assert_eq!(store.expression(expr).map(|e| e.status), Some(ExpressionStatus::Processing));
    Ok(())
}

#[test]
fn unclaimed_tasks_cannot_fail_their_expression() -> TestResult {
    let mut store = TaskStore::new();
    let (expr, tasks) = submit(&mut store, "(2+3)*4")?;

    for task in [tasks[0], tasks[1]] {
        let err = store.fail_task(task, "boom").unwrap_err();
        assert!(matches!(err, CalcdagError::TaskNotClaimable(id) if id == task));
    }

    assert_eq!(status(&store, tasks[0]), TaskStatus::Ready);
    assert_eq!(status(&store, tasks[1]), TaskStatus::Blocked);
    let record = store.expression(expr).ok_or("expression missing")?;
    assert_eq!(record.status, ExpressionStatus::Pending);
    assert_eq!(record.error, None);
    Ok(())
}

#[test]
fn duplicate_expression_id_is_rejected() -> TestResult {
    let mut store = TaskStore::new();
    let id = ExpressionId::new();
    store.add_expression(ExpressionRecord::new(id, "1+1"))?;

    let err = store.add_expression(ExpressionRecord::new(id, "2+2")).unwrap_err();
    assert!(matches!(err, CalcdagError::ExpressionExists(e) if e == id));

    let err = store
        .add_expression_with_graph(ExpressionRecord::new(id, "2+2"), compile("2+2")?)
        .unwrap_err();
    assert!(matches!(err, CalcdagError::ExpressionExists(_)));

    assert_eq!(store.expression(id).map(|e| e.source.as_str()), Some("1+1"));
    Ok(())
}

#[test]
fn graph_for_unknown_or_finished_expression_is_rejected() -> TestResult {
    let mut store = TaskStore::new();
    let missing = ExpressionId::new();
    let err = store.add_task_graph(missing, compile("1+1")?).unwrap_err();
    assert!(matches!(err, CalcdagError::ExpressionNotFound(_)));

    let id = ExpressionId::new();
    store.add_expression(ExpressionRecord::new(id, "1+1"))?;
    store.add_task_graph(id, compile("1+1")?)?;
    let err = store.add_task_graph(id, compile("1+1")?).unwrap_err();
    assert!(matches!(err, CalcdagError::TaskGraphExists(_)));
    assert_eq!(store.stats().ready, 1);
    Ok(())
}

#[test]
fn invalid_graphs_are_rejected_without_side_effects() -> TestResult {
    let mut store = TaskStore::new();

    // Two roots.
    let mut two_roots = GraphBuilder::new();
    two_roots.task(Operation::Add, lit(1.0), lit(2.0));
    two_roots.task(Operation::Add, lit(3.0), lit(4.0));

    // Reference to a task outside the graph.
    let mut dangling = GraphBuilder::new();
    dangling.task(Operation::Add, lit(1.0), dep(TaskId(9)));

    // t0 <-> t1 cycle feeding root t2.
    let mut cyclic = GraphBuilder::new();
    cyclic.task(Operation::Add, dep(TaskId(1)), lit(1.0));
    cyclic.task(Operation::Add, dep(TaskId(0)), lit(1.0));
    cyclic.task(Operation::Multiply, dep(TaskId(1)), lit(2.0));

    // Duplicate IDs.
    let mut duplicated = GraphBuilder::new();
    duplicated.task(Operation::Add, lit(1.0), lit(2.0));
    duplicated.raw(TaskSpec {
        id: TaskId(0),
        operation: Operation::Add,
        lhs: lit(1.0),
        rhs: lit(2.0),
        estimated_duration: Duration::ZERO,
    });

    // Declared root is not the task without dependents.
    let mut wrong_root = GraphBuilder::new();
    let first = wrong_root.task(Operation::Add, lit(1.0), lit(2.0));
    wrong_root.task(Operation::Add, dep(first), lit(2.0));
    wrong_root.root(first);

    let empty = GraphBuilder::new();

    for builder in [two_roots, dangling, cyclic, duplicated, wrong_root, empty] {
        let id = ExpressionId::new();
        let err = store
            .add_expression_with_graph(ExpressionRecord::new(id, "synthetic"), builder.build())
            .unwrap_err();
        assert!(matches!(err, CalcdagError::InvalidTaskGraph(_)), "got {err:?}");
        assert!(store.expression(id).is_none());
    }

    assert_eq!(store.stats(), StoreStats::default());
    Ok(())
}

#[test]
fn shared_dependency_resolves_both_operands() -> TestResult {
    // t1 = t0 * t0
    let mut builder = GraphBuilder::new();
    let base = builder.task(Operation::Add, lit(1.0), lit(2.0));
    builder.task(Operation::Multiply, dep(base), dep(base));

    let mut store = TaskStore::new();
    let expr = ExpressionId::new();
    let tasks = store.add_expression_with_graph(ExpressionRecord::new(expr, "synthetic"), builder.build())?;

    let first = store.next_ready_task(Instant::now())?;
    let step = store.complete_task(first.id, 3.0)?;
    assert_eq!(step.newly_ready, vec![tasks[1]]);

    let second = store.next_ready_task(Instant::now())?;
    assert_eq!((second.lhs, second.rhs), (3.0, 3.0));
    store.complete_task(second.id, 9.0)?;
    assert_eq!(store.expression(expr).and_then(|e| e.result), Some(9.0));
    Ok(())
}

#[test]
fn expired_leases_return_tasks_to_the_queue() -> TestResult {
    let mut store = TaskStore::with_lease_timeout(Some(Duration::from_secs(30)));
    let (expr, tasks) = submit(&mut store, "(1+2)*(3+4)")?;
    let start = Instant::now();

    let a = store.next_ready_task(start)?;
    let b = store.next_ready_task(start + Duration::from_secs(10))?;
    assert!(store.task(a.id).and_then(|t| t.lease_deadline).is_some());

    // Only the first claim has expired.
    let reclaimed = store.reclaim_expired(start + Duration::from_secs(35));
    assert_eq!(reclaimed, vec![a.id]);
    assert_eq!(status(&store, a.id), TaskStatus::Ready);
    assert_eq!(status(&store, b.id), TaskStatus::Assigned);

    let again = store.next_ready_task(start + Duration::from_secs(36))?;
    assert_eq!(again.id, a.id);
    assert_eq!(again.attempt, 2);

    // The original claimant reports late; the second report is a duplicate.
    store.complete_task(a.id, 3.0)?;
    let dup = store.complete_task(a.id, 3.0)?;
    assert_eq!(dup.disposition, StepDisposition::Duplicate);

    store.complete_task(b.id, 7.0)?;
    let root = store.next_ready_task(start + Duration::from_secs(40))?;
    assert_eq!(root.id, tasks[2]);
    store.complete_task(root.id, 21.0)?;

    assert_eq!(store.expression(expr).and_then(|e| e.result), Some(21.0));
    assert!(store.reclaim_expired(start + Duration::from_secs(1000)).is_empty());
    Ok(())
}

#[test]
fn without_lease_claims_never_expire() -> TestResult {
    let mut store = TaskStore::new();
    submit(&mut store, "1+2")?;
    let start = Instant::now();

    let claimed = store.next_ready_task(start)?;
    assert_eq!(store.task(claimed.id).and_then(|t| t.lease_deadline), None);
    assert!(store.reclaim_expired(start + Duration::from_secs(86_400)).is_empty());
    assert_eq!(status(&store, claimed.id), TaskStatus::Assigned);
    Ok(())
}

#[test]
fn stats_and_listing_track_every_status() -> TestResult {
    let mut store = TaskStore::new();
    let (first, _) = submit(&mut store, "(1+2)*3")?;
    let (second, _) = submit(&mut store, "4/0")?;
    let (third, _) = submit(&mut store, "5-6")?;

    let t = store.next_ready_task(Instant::now())?;
    store.complete_task(t.id, 3.0)?;
    let div = store.next_ready_task(Instant::now())?;
    store.fail_task(div.id, "Division by zero")?;
    store.next_ready_task(Instant::now())?;

    // "(1+2)*3": one done, one ready. "4/0": failed. "5-6": assigned.
    assert_eq!(
        store.stats(),
        StoreStats {
            expressions: 3,
            blocked: 0,
            ready: 1,
            assigned: 1,
            done: 1,
            failed: 1,
        }
    );

    let listed: Vec<ExpressionId> = store.expressions().map(|e| e.id).collect();
    assert_eq!(listed, vec![first, second, third]);

    let statuses: Vec<TaskStatus> = store.tasks_of(first).iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![TaskStatus::Done, TaskStatus::Ready]);
    assert!(store.tasks_of(ExpressionId::new()).is_empty());
    Ok(())
}
