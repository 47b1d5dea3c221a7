// src/types.rs

//! Identifiers and small value types shared by the compiler, the store and
//! the workers.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

/// Opaque identifier of a submitted expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpressionId(Uuid);

impl ExpressionId {
    /// Generate a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpressionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a single task.
///
/// Inside a freshly compiled [`TaskGraph`](crate::dag::TaskGraph) the IDs are
/// local compile-order indices starting at zero; the store rebases them onto
/// its global sequence when the graph is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn offset(self, base: u64) -> Self {
        TaskId(self.0 + base)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Binary arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operation::Add),
            '-' => Some(Operation::Subtract),
            '*' => Some(Operation::Multiply),
            '/' => Some(Operation::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide => '/',
        }
    }

    /// Binding strength used by the shunting-yard conversion.
    pub fn precedence(&self) -> u8 {
        match self {
            Operation::Add | Operation::Subtract => 1,
            Operation::Multiply | Operation::Divide => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One side of a binary operation.
///
/// A `Task` operand stays unresolved until the referenced task completes;
/// it is never read as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    Task(TaskId),
}

impl Operand {
    pub fn literal(&self) -> Option<f64> {
        match self {
            Operand::Literal(v) => Some(*v),
            Operand::Task(_) => None,
        }
    }

    pub fn dependency(&self) -> Option<TaskId> {
        match self {
            Operand::Literal(_) => None,
            Operand::Task(id) => Some(*id),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Task(id) => write!(f, "<{id}>"),
        }
    }
}

/// Lifecycle of a submitted expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl ExpressionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpressionStatus::Done | ExpressionStatus::Error)
    }
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpressionStatus::Pending => "pending",
            ExpressionStatus::Processing => "processing",
            ExpressionStatus::Done => "done",
            ExpressionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for at least one operand produced by another task.
    Blocked,
    /// Both operands resolved; waiting to be claimed.
    Ready,
    /// Claimed by a worker.
    Assigned,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Blocked => "blocked",
            TaskStatus::Ready => "ready",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Simulated latency per operation kind.
///
/// Purely a policy knob for the workers; correctness never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimings {
    pub addition: Duration,
    pub subtraction: Duration,
    pub multiplication: Duration,
    pub division: Duration,
}

impl OperationTimings {
    /// Every operation completes immediately.
    pub fn zero() -> Self {
        Self {
            addition: Duration::ZERO,
            subtraction: Duration::ZERO,
            multiplication: Duration::ZERO,
            division: Duration::ZERO,
        }
    }

    pub fn for_operation(&self, op: Operation) -> Duration {
        match op {
            Operation::Add => self.addition,
            Operation::Subtract => self.subtraction,
            Operation::Multiply => self.multiplication,
            Operation::Divide => self.division,
        }
    }
}

impl Default for OperationTimings {
    fn default() -> Self {
        Self {
            addition: Duration::from_millis(1000),
            subtraction: Duration::from_millis(1000),
            multiplication: Duration::from_millis(2000),
            division: Duration::from_millis(2000),
        }
    }
}
