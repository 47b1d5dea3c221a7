// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::{ExpressionId, TaskId};

#[derive(Error, Debug)]
pub enum CalcdagError {
    // Compile errors: always caused by user input, never retried.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Unbalanced parentheses")]
    InvalidParentheses,

    #[error("Unsupported symbol: '{0}'")]
    UnsupportedSymbol(char),

    // Scheduling errors.
    #[error("Expression already exists: {0}")]
    ExpressionExists(ExpressionId),

    #[error("Expression not found: {0}")]
    ExpressionNotFound(ExpressionId),

    #[error("Expression {0} already has a task graph")]
    TaskGraphExists(ExpressionId),

    #[error("Invalid task graph: {0}")]
    InvalidTaskGraph(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("No task available")]
    NoTaskAvailable,

    #[error("Task {0} has not been claimed and cannot be completed")]
    TaskNotClaimable(TaskId),

    #[error("Task {0} still has an unresolved operand")]
    UnresolvedOperand(TaskId),

    // Execution errors.
    #[error("Division by zero")]
    DivisionByZero,

    // Transport between workers and the scheduler.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CalcdagError {
    /// Whether a worker should retry the call that produced this error.
    ///
    /// Only transport failures qualify. `NoTaskAvailable` is an expected
    /// polling outcome and is handled by the idle back-off instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CalcdagError::Transport(_))
    }

    /// Whether this error was raised while compiling user input.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            CalcdagError::InvalidExpression(_)
                | CalcdagError::InvalidParentheses
                | CalcdagError::UnsupportedSymbol(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CalcdagError>;
