// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{CalcdagError, Result};
use crate::types::{Operand, Operation, TaskId};

/// One binary operation as emitted by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub id: TaskId,
    pub operation: Operation,
    pub lhs: Operand,
    pub rhs: Operand,
    /// Latency hint for the worker.
    pub estimated_duration: Duration,
}

impl TaskSpec {
    /// Distinct task IDs referenced by the operands, left first.
    pub fn dependencies(&self) -> Vec<TaskId> {
        let mut deps = Vec::with_capacity(2);
        for dep in [self.lhs.dependency(), self.rhs.dependency()]
            .into_iter()
            .flatten()
        {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }
}

/// Dependency graph of the tasks belonging to one expression.
///
/// Tasks are kept in compile order. Edges are implicit in the operands: a
/// `Operand::Task(id)` is an edge from `id` to the task holding the operand.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    tasks: Vec<TaskSpec>,
    root: TaskId,
}

impl TaskGraph {
    /// Build a graph from tasks and a designated root.
    ///
    /// No checks are performed here; see [`TaskGraph::validate`].
    pub fn new(tasks: Vec<TaskSpec>, root: TaskId) -> Self {
        Self { tasks, root }
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<TaskSpec> {
        self.tasks
    }

    pub fn root(&self) -> TaskId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Immediate dependencies of a task (the tasks whose results it consumes).
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.get(id).map(TaskSpec::dependencies).unwrap_or_default()
    }

    /// Immediate dependents of a task (tasks that consume its result).
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.dependencies().contains(&id))
            .map(|t| t.id)
            .collect()
    }

    /// Shift every task ID (including operand references and the root) by
    /// `base`.
    pub fn rebased(self, base: u64) -> Self {
        let shift = |operand: Operand| match operand {
            Operand::Task(id) => Operand::Task(id.offset(base)),
            literal => literal,
        };

        let tasks = self
            .tasks
            .into_iter()
            .map(|t| TaskSpec {
                id: t.id.offset(base),
                lhs: shift(t.lhs),
                rhs: shift(t.rhs),
                ..t
            })
            .collect();

        Self {
            tasks,
            root: self.root.offset(base),
        }
    }

    /// Check that this graph can be scheduled.
    ///
    /// This checks:
    /// - there is at least one task and task IDs are unique
    /// - every operand reference points at a task of this graph
    /// - the graph has no cycles
    /// - exactly one task (the declared root) has no dependents
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(CalcdagError::InvalidTaskGraph(
                "graph contains no tasks".to_string(),
            ));
        }

        let mut ids = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !ids.insert(task.id) {
                return Err(CalcdagError::InvalidTaskGraph(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
        }

        // Edge direction: dependency -> dependent.
        let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();
        let mut dependent_count: HashMap<TaskId, usize> = HashMap::new();

        for task in &self.tasks {
            graph.add_node(task.id);
            for dep in task.dependencies() {
                if !ids.contains(&dep) {
                    return Err(CalcdagError::InvalidTaskGraph(format!(
                        "task {} references unknown task {}",
                        task.id, dep
                    )));
                }
                graph.add_edge(dep, task.id, ());
                *dependent_count.entry(dep).or_insert(0) += 1;
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(CalcdagError::InvalidTaskGraph(format!(
                "cycle detected involving task {}",
                cycle.node_id()
            )));
        }

        let roots: Vec<TaskId> = self
            .tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| !dependent_count.contains_key(id))
            .collect();

        match roots.as_slice() {
            [only] if *only == self.root => Ok(()),
            [only] => Err(CalcdagError::InvalidTaskGraph(format!(
                "declared root {} but the only task without dependents is {}",
                self.root, only
            ))),
            _ => Err(CalcdagError::InvalidTaskGraph(format!(
                "expected exactly one root, found {}",
                roots.len()
            ))),
        }
    }
}
