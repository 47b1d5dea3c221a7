// src/compiler/tokenizer.rs

use crate::errors::{CalcdagError, Result};
use crate::types::Operation;

/// Lexical token of an arithmetic expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Op(Operation),
    LParen,
    RParen,
}

/// Split `source` into tokens.
///
/// Whitespace is removed before scanning, so it never separates tokens:
/// `1 2+3` reads as `12+3`. A number is a maximal run of digits and decimal
/// points; it must parse as an `f64`, so `1.2.3` or a lone `.` is rejected
/// here rather than at evaluation time.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    let source = compact.as_str();
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if is_number_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !is_number_char(next) {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            tokens.push(Token::Number(parse_number(&source[start..end])?));
            continue;
        }

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => match Operation::from_symbol(other) {
                Some(op) => Token::Op(op),
                None => return Err(CalcdagError::UnsupportedSymbol(other)),
            },
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn parse_number(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| CalcdagError::InvalidExpression(format!("malformed number '{text}'")))
}
