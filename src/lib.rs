pub mod ast;
pub mod backend;
pub mod bytecode;
pub mod interpreter;
pub mod jasmin;
pub mod lexer;
pub mod parser;
pub mod rexp;
pub mod token;
pub mod vm;

use anyhow::{Context, Result};
use log::trace;

use crate::ast::Program;

/// Tokenizes and parses While source.
pub fn parse(source: &str) -> Result<Program> {
    trace!("lexing {} bytes", source.len());
    let tokens = lexer::tokenize(source).context("Lexing failed")?;
    trace!("parsing {} tokens", tokens.len());
    let program = parser::parse_tokens(&tokens).context("Parsing failed")?;
    Ok(program)
}
