use anyhow::Result;
use log::debug;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ast::Program;
use crate::backend::{Backend, Io, IoError, PreparedBackend};
use crate::bytecode::{CompiledProgram, Instruction, Label, compile};

type VmResult<T> = std::result::Result<T, VmError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Expected integer, got {got}")]
    ExpectedInteger { got: String },
    #[error("Expected string, got {got}")]
    ExpectedString { got: String },
    #[error("Jump to undefined label '{label}'")]
    UndefinedLabel { label: String },
    #[error("Read of uninitialized local slot {slot}")]
    UninitializedSlot { slot: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Io(#[from] IoError),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Integer(i32),
    String(String),
}

impl Value {
    fn as_int(&self) -> VmResult<i32> {
        match self {
            Value::Integer(value) => Ok(*value),
            Value::String(_) => Err(VmError::ExpectedInteger {
                got: format!("{self:?}"),
            }),
        }
    }

    fn into_string(self) -> VmResult<String> {
        match self {
            Value::String(value) => Ok(value),
            other => Err(VmError::ExpectedString {
                got: format!("{other:?}"),
            }),
        }
    }
}

/// Stack machine that executes the same instruction stream the assembler
/// backend emits.
pub struct VM;

impl VM {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

/// Instruction stream with every label resolved to its position.
pub struct PreparedVM {
    compiled: CompiledProgram,
    targets: FxHashMap<Label, usize>,
}

impl PreparedVM {
    pub fn new(compiled: CompiledProgram) -> VmResult<Self> {
        let targets: FxHashMap<Label, usize> = compiled
            .code
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Label(label) => Some((label.clone(), index)),
                _ => None,
            })
            .collect();
        for instruction in &compiled.code {
            if let Some(label) = jump_target(instruction)
                && !targets.contains_key(label)
            {
                return Err(VmError::UndefinedLabel {
                    label: label.to_string(),
                });
            }
        }
        Ok(Self { compiled, targets })
    }

    pub fn execute(&self, io: &mut Io<'_>) -> VmResult<()> {
        let code = &self.compiled.code;
        let mut stack: Vec<Value> = Vec::new();
        let mut locals: Vec<Option<i32>> = vec![None; self.compiled.slots];
        let mut ip = 0;
        let mut steps: u64 = 0;

        while let Some(instruction) = code.get(ip) {
            ip += 1;
            steps += 1;
            match instruction {
                Instruction::Ldc(value) => stack.push(Value::Integer(*value)),
                Instruction::LdcString(value) => stack.push(Value::String(value.clone())),
                Instruction::ILoad(slot) => {
                    let value = locals
                        .get(*slot)
                        .copied()
                        .flatten()
                        .ok_or(VmError::UninitializedSlot { slot: *slot })?;
                    stack.push(Value::Integer(value));
                }
                Instruction::IStore(slot) => {
                    let value = pop_int(&mut stack)?;
                    if *slot >= locals.len() {
                        locals.resize(slot + 1, None);
                    }
                    locals[*slot] = Some(value);
                }
                Instruction::IAdd => binary(&mut stack, |left, right| Ok(left.wrapping_add(right)))?,
                Instruction::ISub => binary(&mut stack, |left, right| Ok(left.wrapping_sub(right)))?,
                Instruction::IMul => binary(&mut stack, |left, right| Ok(left.wrapping_mul(right)))?,
                Instruction::IDiv => binary(&mut stack, |left, right| {
                    if right == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    Ok(left.wrapping_div(right))
                })?,
                Instruction::IfICmpEq(label) => {
                    if compare(&mut stack, |left, right| left == right)? {
                        ip = self.target(label)?;
                    }
                }
                Instruction::IfICmpNe(label) => {
                    if compare(&mut stack, |left, right| left != right)? {
                        ip = self.target(label)?;
                    }
                }
                Instruction::IfICmpLe(label) => {
                    if compare(&mut stack, |left, right| left <= right)? {
                        ip = self.target(label)?;
                    }
                }
                Instruction::IfICmpGe(label) => {
                    if compare(&mut stack, |left, right| left >= right)? {
                        ip = self.target(label)?;
                    }
                }
                Instruction::Goto(label) => ip = self.target(label)?,
                Instruction::Label(_) => {}
                Instruction::ReadInt => {
                    let value = io.read_int()?;
                    stack.push(Value::Integer(value));
                }
                Instruction::PrintInt => {
                    let value = pop_int(&mut stack)?;
                    io.write_line(value)?;
                }
                Instruction::PrintString => {
                    let value = pop(&mut stack)?.into_string()?;
                    io.write_line(value)?;
                }
            }
        }

        debug!("vm executed {steps} instructions");
        Ok(())
    }

    fn target(&self, label: &Label) -> VmResult<usize> {
        self.targets
            .get(label)
            .copied()
            .ok_or_else(|| VmError::UndefinedLabel {
                label: label.to_string(),
            })
    }
}

fn jump_target(instruction: &Instruction) -> Option<&Label> {
    match instruction {
        Instruction::IfICmpEq(label)
        | Instruction::IfICmpNe(label)
        | Instruction::IfICmpLe(label)
        | Instruction::IfICmpGe(label)
        | Instruction::Goto(label) => Some(label),
        _ => None,
    }
}

fn pop(stack: &mut Vec<Value>) -> VmResult<Value> {
    stack.pop().ok_or(VmError::StackUnderflow)
}

fn pop_int(stack: &mut Vec<Value>) -> VmResult<i32> {
    pop(stack)?.as_int()
}

fn binary(stack: &mut Vec<Value>, op: impl Fn(i32, i32) -> VmResult<i32>) -> VmResult<()> {
    let right = pop_int(stack)?;
    let left = pop_int(stack)?;
    stack.push(Value::Integer(op(left, right)?));
    Ok(())
}

fn compare(stack: &mut Vec<Value>, holds: impl Fn(i32, i32) -> bool) -> VmResult<bool> {
    let right = pop_int(stack)?;
    let left = pop_int(stack)?;
    Ok(holds(left, right))
}

impl PreparedBackend for PreparedVM {
    fn run(&self, io: &mut Io<'_>) -> Result<()> {
        Ok(self.execute(io)?)
    }
}

impl Backend for VM {
    fn name(&self) -> &'static str {
        "vm"
    }

    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>> {
        let compiled = compile(program)?;
        Ok(Box::new(PreparedVM::new(compiled)?))
    }
}
