use anyhow::Result;
use log::debug;

use crate::ast::{Block, Program};
use crate::backend::{Backend, Io, PreparedBackend};

mod error;
mod runtime;

pub use error::InterpreterError;
pub use runtime::Environment;
use runtime::InterpreterRuntime;

/// AST-walking backend that executes programs directly without compilation.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Runs `program` from an empty environment and returns the final
    /// bindings.
    pub fn evaluate(
        &self,
        program: &Program,
        io: &mut Io<'_>,
    ) -> std::result::Result<Environment, InterpreterError> {
        run_block(&program.statements, io)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn run_block(block: &Block, io: &mut Io<'_>) -> std::result::Result<Environment, InterpreterError> {
    let mut runtime = InterpreterRuntime {
        io,
        env: Environment::new(),
    };
    runtime.exec_block(block)?;
    debug!("interpreter finished with {} bindings", runtime.env.len());
    Ok(runtime.env)
}

/// Prepared executable program for the tree-walking interpreter.
pub struct PreparedInterpreter {
    statements: Block,
}

impl PreparedBackend for PreparedInterpreter {
    fn run(&self, io: &mut Io<'_>) -> Result<()> {
        run_block(&self.statements, io)?;
        Ok(())
    }
}

impl Backend for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>> {
        Ok(Box::new(PreparedInterpreter {
            statements: program.statements.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn program(source: &str) -> Program {
        let tokens = tokenize(source).expect("tokenize should succeed");
        parse_tokens(&tokens).expect("parse should succeed")
    }

    fn evaluate(source: &str, input: &str) -> (std::result::Result<Environment, InterpreterError>, String) {
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        let result = Interpreter::new().evaluate(
            &program(source),
            &mut Io::new(&mut reader, &mut output),
        );
        (result, String::from_utf8(output).expect("utf8"))
    }

    #[test]
    fn returns_final_bindings() {
        let (result, output) = evaluate("x := 2; y := x * 21; x := y - x", "");
        let env = result.expect("evaluate");
        assert_eq!(env.get("x"), Some(&40));
        assert_eq!(env.get("y"), Some(&42));
        assert_eq!(output, "");
    }

    #[test]
    fn for_loop_counts_up_to_the_bound() {
        let (result, output) = evaluate("for i := 0 to 5 do write i", "");
        assert_eq!(result.expect("evaluate").get("i"), Some(&5));
        assert_eq!(output, "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn reads_input_and_writes_strings() {
        let source = indoc! {r#"
            read n;
            f := 1;
            while n > 1 do { f := f * n; n := n - 1 };
            write "result:";
            write f
        "#};
        let (result, output) = evaluate(source, "5\n");
        result.expect("evaluate");
        assert_eq!(output, "result:\n120\n");
    }

    #[test]
    fn division_truncates_and_rejects_zero() {
        let (result, output) = evaluate("write 7 / 2; write 0 - 7 / 2; write 1 / 0", "");
        assert_eq!(result, Err(InterpreterError::DivisionByZero));
        assert_eq!(output, "3\n-3\n");
    }

    #[test]
    fn undefined_variables_are_errors() {
        let (result, _) = evaluate("x := y + 1", "");
        assert_eq!(
            result.expect_err("expected failure").to_string(),
            "Undefined variable 'y'"
        );
    }

    #[test]
    fn arithmetic_wraps_on_overflow() {
        let (result, _) = evaluate("x := 2147483647 + 1", "");
        assert_eq!(result.expect("evaluate").get("x"), Some(&i32::MIN));
    }

    #[test]
    fn missing_input_is_reported() {
        let (result, _) = evaluate("read n", "");
        assert_eq!(result, Err(InterpreterError::Io(crate::backend::IoError::EndOfInput)));
    }
}
