// src/compiler/mod.rs

//! Expression compiler: infix text -> [`TaskGraph`].
//!
//! The pipeline has four stages, each in its own module:
//!
//! 1. a running parenthesis balance check over the raw text,
//! 2. [`tokenizer`] splits the text into numbers, operators and parentheses,
//! 3. [`rpn`] reorders the tokens into reverse-Polish form (shunting-yard),
//! 4. [`reduce`] folds the RPN sequence into tasks, one per operator.
//!
//! The compiler is a pure function and holds no state between calls.

pub mod reduce;
pub mod rpn;
pub mod tokenizer;

use tracing::debug;

use crate::dag::TaskGraph;
use crate::errors::{CalcdagError, Result};
use crate::types::OperationTimings;

pub use rpn::{RpnToken, to_rpn};
pub use tokenizer::{Token, tokenize};

/// Compile an expression using the default per-operation timings.
pub fn compile(source: &str) -> Result<TaskGraph> {
    compile_with(source, &OperationTimings::default())
}

/// Compile an expression, stamping every task with the estimated duration
/// taken from `timings`.
pub fn compile_with(source: &str, timings: &OperationTimings) -> Result<TaskGraph> {
    if source.trim().is_empty() {
        return Err(CalcdagError::InvalidExpression(
            "expression is empty".to_string(),
        ));
    }

    if !parentheses_balanced(source) {
        return Err(CalcdagError::InvalidParentheses);
    }

    let tokens = tokenize(source)?;
    let rpn = to_rpn(&tokens)?;
    let graph = reduce::reduce(&rpn, timings)?;

    debug!(
        source = %source.trim(),
        tasks = graph.len(),
        root = %graph.root(),
        "compiled expression"
    );

    Ok(graph)
}

/// Running balance check: the depth never goes negative and ends at zero.
fn parentheses_balanced(source: &str) -> bool {
    let mut depth: i64 = 0;
    for c in source.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
