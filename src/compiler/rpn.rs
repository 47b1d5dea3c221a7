// src/compiler/rpn.rs

//! Shunting-yard conversion from infix tokens to reverse-Polish order.

use crate::compiler::tokenizer::Token;
use crate::errors::{CalcdagError, Result};
use crate::types::Operation;

/// Token in reverse-Polish order. Parentheses are gone by this point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RpnToken {
    Number(f64),
    Op(Operation),
}

/// Entry on the operator stack.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Op(Operation),
    Open,
}

/// Convert infix tokens into RPN.
///
/// All operators are left associative: an incoming operator first pops every
/// stacked operator of greater *or equal* precedence.
pub fn to_rpn(tokens: &[Token]) -> Result<Vec<RpnToken>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Pending> = Vec::new();

    for token in tokens {
        match *token {
            Token::Number(value) => output.push(RpnToken::Number(value)),
            Token::LParen => stack.push(Pending::Open),
            Token::RParen => loop {
                match stack.pop() {
                    Some(Pending::Op(op)) => output.push(RpnToken::Op(op)),
                    Some(Pending::Open) => break,
                    None => return Err(CalcdagError::InvalidParentheses),
                }
            },
            Token::Op(incoming) => {
                while let Some(&Pending::Op(top)) = stack.last() {
                    if top.precedence() < incoming.precedence() {
                        break;
                    }
                    output.push(RpnToken::Op(top));
                    stack.pop();
                }
                stack.push(Pending::Op(incoming));
            }
        }
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Op(op) => output.push(RpnToken::Op(op)),
            Pending::Open => return Err(CalcdagError::InvalidParentheses),
        }
    }

    Ok(output)
}
