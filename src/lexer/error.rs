use thiserror::Error;

use crate::rexp::ValueError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("No token rule matches '{character}' at line {line}, column {column} (position {position})")]
    NoMatchingRule {
        character: char,
        position: usize,
        line: usize,
        column: usize,
    },
    #[error("Invalid integer literal '{literal}' at position {position}")]
    InvalidIntegerLiteral { literal: String, position: usize },
    #[error("Match produced by unknown rule '{rule}'")]
    UnknownRule { rule: String },
    #[error("Lexer invariant violated: {0}")]
    Value(#[from] ValueError),
}

pub type LexResult<T> = Result<T, LexError>;
