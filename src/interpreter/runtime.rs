use std::collections::BTreeMap;

use crate::ast::{AExp, ArithOp, Assignment, BExp, Block, CompareOp, Stmt};
use crate::backend::Io;

use super::InterpreterError;

/// Variable bindings, ordered by name so dumps are stable.
pub type Environment = BTreeMap<String, i32>;

type ExecResult<T> = Result<T, InterpreterError>;

pub(super) struct InterpreterRuntime<'a, 'io> {
    pub(super) io: &'a mut Io<'io>,
    pub(super) env: Environment,
}

impl InterpreterRuntime<'_, '_> {
    pub(super) fn exec_block(&mut self, block: &Block) -> ExecResult<()> {
        for statement in block {
            self.exec_statement(statement)?;
        }
        Ok(())
    }

    fn exec_statement(&mut self, statement: &Stmt) -> ExecResult<()> {
        match statement {
            Stmt::Skip => {}
            Stmt::Assign(assignment) => self.assign(assignment)?,
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.eval_bexp(condition)? {
                    self.exec_block(then_block)?;
                } else {
                    self.exec_block(else_block)?;
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_bexp(condition)? {
                    self.exec_block(body)?;
                }
            }
            Stmt::For { init, bound, body } => {
                self.assign(init)?;
                while self.load(&init.name)? < self.eval_aexp(bound)? {
                    self.exec_block(body)?;
                    let next = self.load(&init.name)?.wrapping_add(1);
                    self.env.insert(init.name.clone(), next);
                }
            }
            Stmt::Read(name) => {
                let value = self.io.read_int()?;
                self.env.insert(name.clone(), value);
            }
            Stmt::Write(value) => {
                let value = self.eval_aexp(value)?;
                self.io.write_line(value)?;
            }
            Stmt::WriteLiteral(text) => self.io.write_line(text)?,
        }
        Ok(())
    }

    fn assign(&mut self, assignment: &Assignment) -> ExecResult<()> {
        let value = self.eval_aexp(&assignment.value)?;
        self.env.insert(assignment.name.clone(), value);
        Ok(())
    }

    fn load(&self, name: &str) -> ExecResult<i32> {
        self.env
            .get(name)
            .copied()
            .ok_or_else(|| InterpreterError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn eval_aexp(&self, expr: &AExp) -> ExecResult<i32> {
        match expr {
            AExp::Num(value) => Ok(*value),
            AExp::Var(name) => self.load(name),
            AExp::Aop { op, left, right } => {
                let left = self.eval_aexp(left)?;
                let right = self.eval_aexp(right)?;
                match op {
                    ArithOp::Add => Ok(left.wrapping_add(right)),
                    ArithOp::Sub => Ok(left.wrapping_sub(right)),
                    ArithOp::Mul => Ok(left.wrapping_mul(right)),
                    ArithOp::Div => {
                        if right == 0 {
                            return Err(InterpreterError::DivisionByZero);
                        }
                        Ok(left.wrapping_div(right))
                    }
                }
            }
        }
    }

    fn eval_bexp(&self, condition: &BExp) -> ExecResult<bool> {
        match condition {
            BExp::True => Ok(true),
            BExp::False => Ok(false),
            BExp::Bop { op, left, right } => {
                let left = self.eval_aexp(left)?;
                let right = self.eval_aexp(right)?;
                Ok(match op {
                    CompareOp::Equal => left == right,
                    CompareOp::NotEqual => left != right,
                    CompareOp::Less => left < right,
                    CompareOp::Greater => left > right,
                })
            }
        }
    }
}
