use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ast::{AExp, ArithOp, Assignment, BExp, Block, CompareOp, Program, Stmt};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
}

pub type CodegenResult<T> = Result<T, CodegenError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    prefix: &'static str,
    id: usize,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Ldc(i32),
    LdcString(String),
    ILoad(usize),
    IStore(usize),
    IAdd,
    ISub,
    IMul,
    IDiv,
    // Conditional jumps pop the right operand, then the left one.
    IfICmpEq(Label),
    IfICmpNe(Label),
    IfICmpLe(Label),
    IfICmpGe(Label),
    Goto(Label),
    Label(Label),
    /// Pushes one integer read from input.
    ReadInt,
    /// Pops an integer and writes it on its own line.
    PrintInt,
    /// Pops a string and writes it on its own line.
    PrintString,
}

type CompiledBlock = Vec<Instruction>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub code: CompiledBlock,
    /// Number of local slots the code uses.
    pub slots: usize,
}

/// Variable slots and label numbering for one compilation. Slots are handed
/// out in order of first assignment and never reused; label numbers are
/// unique across the whole compilation.
#[derive(Debug, Default)]
pub struct CompileContext {
    slots: FxHashMap<String, usize>,
    labels: usize,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn lookup(&self, name: &str) -> CodegenResult<usize> {
        self.slot(name).ok_or_else(|| CodegenError::UndefinedVariable {
            name: name.to_string(),
        })
    }

    fn slot_or_allocate(&mut self, name: &str) -> usize {
        if let Some(slot) = self.slot(name) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.insert(name.to_string(), slot);
        slot
    }

    fn fresh_label(&mut self, prefix: &'static str) -> Label {
        self.labels += 1;
        Label {
            prefix,
            id: self.labels,
        }
    }
}

pub fn compile(program: &Program) -> CodegenResult<CompiledProgram> {
    let mut context = CompileContext::new();
    let code = compile_block(&program.statements, &mut context)?;
    debug!(
        "compiled {} instructions using {} slots",
        code.len(),
        context.slot_count()
    );
    Ok(CompiledProgram {
        code,
        slots: context.slot_count(),
    })
}

pub fn compile_block(block: &Block, context: &mut CompileContext) -> CodegenResult<CompiledBlock> {
    let mut code = Vec::new();
    for statement in block {
        code.extend(compile_statement(statement, context)?);
    }
    Ok(code)
}

fn compile_statement(statement: &Stmt, context: &mut CompileContext) -> CodegenResult<CompiledBlock> {
    let mut code = Vec::new();
    match statement {
        Stmt::Skip => {}
        Stmt::Assign(assignment) => code.extend(compile_assignment(assignment, context)?),
        Stmt::If {
            condition,
            then_block,
            else_block,
        } => {
            let else_label = context.fresh_label("if_else");
            let end_label = context.fresh_label("if_end");
            code.extend(compile_bexp(condition, &else_label, context)?);
            code.extend(compile_block(then_block, context)?);
            code.push(Instruction::Goto(end_label.clone()));
            code.push(Instruction::Label(else_label));
            code.extend(compile_block(else_block, context)?);
            code.push(Instruction::Label(end_label));
        }
        Stmt::While { condition, body } => {
            let begin_label = context.fresh_label("loop_begin");
            let end_label = context.fresh_label("loop_end");
            code.push(Instruction::Label(begin_label.clone()));
            code.extend(compile_bexp(condition, &end_label, context)?);
            code.extend(compile_block(body, context)?);
            code.push(Instruction::Goto(begin_label));
            code.push(Instruction::Label(end_label));
        }
        Stmt::For { init, bound, body } => {
            code.extend(compile_assignment(init, context)?);
            let slot = context.lookup(&init.name)?;
            let begin_label = context.fresh_label("loop_begin");
            let end_label = context.fresh_label("loop_end");
            let test = BExp::bop(CompareOp::Less, AExp::Var(init.name.clone()), bound.clone());
            code.push(Instruction::Label(begin_label.clone()));
            code.extend(compile_bexp(&test, &end_label, context)?);
            code.extend(compile_block(body, context)?);
            code.extend([
                Instruction::ILoad(slot),
                Instruction::Ldc(1),
                Instruction::IAdd,
                Instruction::IStore(slot),
                Instruction::Goto(begin_label),
                Instruction::Label(end_label),
            ]);
        }
        Stmt::Read(name) => {
            code.push(Instruction::ReadInt);
            code.push(Instruction::IStore(context.slot_or_allocate(name)));
        }
        Stmt::Write(value) => {
            code.extend(compile_aexp(value, context)?);
            code.push(Instruction::PrintInt);
        }
        Stmt::WriteLiteral(text) => {
            code.push(Instruction::LdcString(text.clone()));
            code.push(Instruction::PrintString);
        }
    }
    Ok(code)
}

fn compile_assignment(assignment: &Assignment, context: &mut CompileContext) -> CodegenResult<CompiledBlock> {
    let mut code = compile_aexp(&assignment.value, context)?;
    code.push(Instruction::IStore(context.slot_or_allocate(&assignment.name)));
    Ok(code)
}

fn compile_aexp(expr: &AExp, context: &CompileContext) -> CodegenResult<CompiledBlock> {
    let mut code = Vec::new();
    match expr {
        AExp::Num(value) => code.push(Instruction::Ldc(*value)),
        AExp::Var(name) => code.push(Instruction::ILoad(context.lookup(name)?)),
        AExp::Aop { op, left, right } => {
            code.extend(compile_aexp(left, context)?);
            code.extend(compile_aexp(right, context)?);
            code.push(match op {
                ArithOp::Add => Instruction::IAdd,
                ArithOp::Sub => Instruction::ISub,
                ArithOp::Mul => Instruction::IMul,
                ArithOp::Div => Instruction::IDiv,
            });
        }
    }
    Ok(code)
}

/// Emits code that falls through when `condition` holds and jumps to `skip`
/// when it does not, so every comparison uses the inverted branch.
fn compile_bexp(condition: &BExp, skip: &Label, context: &CompileContext) -> CodegenResult<CompiledBlock> {
    let mut code = Vec::new();
    match condition {
        BExp::True => {}
        BExp::False => code.push(Instruction::Goto(skip.clone())),
        BExp::Bop { op, left, right } => {
            code.extend(compile_aexp(left, context)?);
            code.extend(compile_aexp(right, context)?);
            let skip = skip.clone();
            code.push(match op {
                CompareOp::Equal => Instruction::IfICmpNe(skip),
                CompareOp::NotEqual => Instruction::IfICmpEq(skip),
                CompareOp::Less => Instruction::IfICmpGe(skip),
                CompareOp::Greater => Instruction::IfICmpLe(skip),
            });
        }
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;

    fn compile_source(source: &str) -> CodegenResult<CompiledProgram> {
        let tokens = tokenize(source).expect("tokenize should succeed");
        let program = parse_tokens(&tokens).expect("parse should succeed");
        compile(&program)
    }

    fn label(prefix: &'static str, id: usize) -> Label {
        Label { prefix, id }
    }

    #[test]
    fn allocates_slots_in_first_assignment_order() {
        let compiled = compile_source("x := 1; y := 2; x := 3").expect("compile");
        assert_eq!(compiled.slots, 2);
        assert_eq!(
            compiled.code,
            vec![
                Instruction::Ldc(1),
                Instruction::IStore(0),
                Instruction::Ldc(2),
                Instruction::IStore(1),
                Instruction::Ldc(3),
                Instruction::IStore(0),
            ]
        );
    }

    #[test]
    fn while_loop_jumps_back_to_its_test() {
        let compiled = compile_source("x := 0; while x < 3 do x := x + 1").expect("compile");
        assert_eq!(
            compiled.code,
            vec![
                Instruction::Ldc(0),
                Instruction::IStore(0),
                Instruction::Label(label("loop_begin", 1)),
                Instruction::ILoad(0),
                Instruction::Ldc(3),
                Instruction::IfICmpGe(label("loop_end", 2)),
                Instruction::ILoad(0),
                Instruction::Ldc(1),
                Instruction::IAdd,
                Instruction::IStore(0),
                Instruction::Goto(label("loop_begin", 1)),
                Instruction::Label(label("loop_end", 2)),
            ]
        );
    }

    #[test]
    fn comparisons_branch_on_the_inverse() {
        let branch = |op: &str| {
            let source = format!("x := 1; if x {op} 2 then skip");
            let compiled = compile_source(&source).expect("compile");
            compiled.code[4].clone()
        };
        let skip = label("if_else", 1);
        assert_eq!(branch("=="), Instruction::IfICmpNe(skip.clone()));
        assert_eq!(branch("!="), Instruction::IfICmpEq(skip.clone()));
        assert_eq!(branch("<"), Instruction::IfICmpGe(skip.clone()));
        assert_eq!(branch(">"), Instruction::IfICmpLe(skip));
    }

    #[test]
    fn if_else_layout() {
        let compiled =
            compile_source("if true then write 1 else write \"no\"").expect("compile");
        assert_eq!(
            compiled.code,
            vec![
                Instruction::Ldc(1),
                Instruction::PrintInt,
                Instruction::Goto(label("if_end", 2)),
                Instruction::Label(label("if_else", 1)),
                Instruction::LdcString("no".to_string()),
                Instruction::PrintString,
                Instruction::Label(label("if_end", 2)),
            ]
        );
    }

    #[test]
    fn false_condition_always_skips() {
        let compiled = compile_source("while false do skip").expect("compile");
        assert_eq!(compiled.code[1], Instruction::Goto(label("loop_end", 2)));
    }

    #[test]
    fn for_loop_increments_once_per_iteration() {
        let compiled = compile_source("for i := 0 to 5 do write i").expect("compile");
        let increments = compiled
            .code
            .windows(3)
            .filter(|window| {
                window
                    == &[
                        Instruction::ILoad(0),
                        Instruction::Ldc(1),
                        Instruction::IAdd,
                    ]
            })
            .count();
        assert_eq!(increments, 1);
        assert!(compiled.code.contains(&Instruction::IfICmpGe(label("loop_end", 2))));
    }

    #[test]
    fn labels_stay_unique_across_nesting() {
        let compiled = compile_source(
            "x := 0; while x < 2 do { if x == 0 then write 0 else write 1; x := x + 1 }; if x > 1 then skip",
        )
        .expect("compile");
        let mut defined: Vec<String> = compiled
            .code
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Label(label) => Some(label.to_string()),
                _ => None,
            })
            .collect();
        let total = defined.len();
        defined.sort();
        defined.dedup();
        assert_eq!(defined.len(), total);
        assert_eq!(total, 6);
    }

    #[test]
    fn reading_an_unassigned_variable_fails() {
        let err = compile_source("write y").expect_err("expected codegen failure");
        assert_eq!(
            err,
            CodegenError::UndefinedVariable {
                name: "y".to_string()
            }
        );
        assert_eq!(err.to_string(), "Undefined variable 'y'");
    }

    #[test]
    fn read_allocates_a_slot() {
        let compiled = compile_source("read n; write n").expect("compile");
        assert_eq!(
            compiled.code,
            vec![
                Instruction::ReadInt,
                Instruction::IStore(0),
                Instruction::ILoad(0),
                Instruction::PrintInt,
            ]
        );
    }
}
