// src/compiler/reduce.rs

//! RPN reduction into tasks.

use crate::compiler::rpn::RpnToken;
use crate::dag::{TaskGraph, TaskSpec};
use crate::errors::{CalcdagError, Result};
use crate::types::{Operand, OperationTimings, TaskId};

/// Fold an RPN sequence into a task graph.
///
/// Numbers push literal operands. Each operator pops the right-hand operand,
/// then the left-hand one, emits a task and pushes a reference to that
/// task's result. Task IDs are compile-order indices, so a task only ever
/// references tasks emitted before it, and the last task emitted is the root.
pub fn reduce(rpn: &[RpnToken], timings: &OperationTimings) -> Result<TaskGraph> {
    let mut operands: Vec<Operand> = Vec::new();
    let mut tasks: Vec<TaskSpec> = Vec::new();

    for token in rpn {
        match *token {
            RpnToken::Number(value) => operands.push(Operand::Literal(value)),
            RpnToken::Op(operation) => {
                let (Some(rhs), Some(lhs)) = (operands.pop(), operands.pop()) else {
                    return Err(CalcdagError::InvalidExpression(format!(
                        "operator '{operation}' is missing an operand"
                    )));
                };

                let id = TaskId(tasks.len() as u64);
                tasks.push(TaskSpec {
                    id,
                    operation,
                    lhs,
                    rhs,
                    estimated_duration: timings.for_operation(operation),
                });
                operands.push(Operand::Task(id));
            }
        }
    }

    if operands.len() != 1 {
        return Err(CalcdagError::InvalidExpression(format!(
            "expected a single result, found {} operands after reduction",
            operands.len()
        )));
    }

    match operands[0] {
        Operand::Task(root) => Ok(TaskGraph::new(tasks, root)),
        Operand::Literal(_) => Err(CalcdagError::InvalidExpression(
            "expression contains no operation".to_string(),
        )),
    }
}
