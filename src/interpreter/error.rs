use thiserror::Error;

use crate::backend::IoError;

/// Typed errors produced by the tree-walking interpreter backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Io(#[from] IoError),
}
