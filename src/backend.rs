use std::fmt::Display;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::ast::Program;

pub use crate::interpreter;
pub use crate::jasmin;
pub use crate::vm;

/// Input and output streams a While program runs against.
pub struct Io<'a> {
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IoError {
    #[error("Expected an integer on input, got '{line}'")]
    NotAnInteger { line: String },
    #[error("Input ended while reading an integer")]
    EndOfInput,
    #[error("I/O error: {message}")]
    Stream { message: String },
}

impl From<std::io::Error> for IoError {
    fn from(error: std::io::Error) -> Self {
        IoError::Stream {
            message: error.to_string(),
        }
    }
}

impl<'a> Io<'a> {
    pub fn new(input: &'a mut dyn BufRead, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }

    /// Reads one line and parses it as an integer, ignoring surrounding
    /// whitespace.
    pub fn read_int(&mut self) -> Result<i32, IoError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(IoError::EndOfInput);
        }
        let trimmed = line.trim();
        trimmed.parse().map_err(|_| IoError::NotAnInteger {
            line: trimmed.to_string(),
        })
    }

    pub fn write_line(&mut self, value: impl Display) -> Result<(), IoError> {
        writeln!(self.output, "{value}")?;
        Ok(())
    }

    pub fn input(&mut self) -> &mut dyn BufRead {
        &mut *self.input
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

/// Executable artifact produced by a backend `prepare` step.
///
/// This keeps compilation and execution separated so benchmarks and tests can
/// measure prepare and run phases independently.
pub trait PreparedBackend {
    fn run(&self, io: &mut Io<'_>) -> Result<()>;

    /// Runs against `input` and returns everything written.
    fn run_with_input(&self, input: &str) -> Result<String> {
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        self.run(&mut Io::new(&mut reader, &mut output))?;
        String::from_utf8(output).context("Program wrote invalid UTF-8")
    }
}

/// Common interface implemented by each execution backend.
///
/// `prepare` translates the AST into backend-owned executable state, while
/// `run` offers the convenience path for one-shot execution.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>>;

    fn run(&self, program: &Program, io: &mut Io<'_>) -> Result<()> {
        self.prepare(program)?.run(io)
    }

    fn run_with_input(&self, program: &Program, input: &str) -> Result<String> {
        self.prepare(program)?.run_with_input(input)
    }
}

/// Backends that run in-process.
pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(crate::interpreter::Interpreter::new()),
        Box::new(crate::vm::VM::new()),
    ]
}

pub fn backend_by_name(name: &str) -> Option<Box<dyn Backend>> {
    match name {
        "interpreter" => Some(Box::new(crate::interpreter::Interpreter::new())),
        "vm" => Some(Box::new(crate::vm::VM::new())),
        "jasmin" => Some(Box::new(crate::jasmin::Jasmin::from_env())),
        _ => None,
    }
}
