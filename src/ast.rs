use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AExp {
    Num(i32),
    Var(String),
    /// Children are shared so that the parser can extend a partial chain
    /// without copying it.
    Aop {
        op: ArithOp,
        left: Arc<AExp>,
        right: Arc<AExp>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BExp {
    True,
    False,
    Bop {
        op: CompareOp,
        left: AExp,
        right: AExp,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    Greater,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Assignment {
    pub name: String,
    pub value: AExp,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Stmt {
    Skip,
    Assign(Assignment),
    If {
        condition: BExp,
        then_block: Block,
        else_block: Block,
    },
    While {
        condition: BExp,
        body: Block,
    },
    /// Counts `init.name` up by one while it stays below `bound`, which is
    /// evaluated before every iteration.
    For {
        init: Assignment,
        bound: AExp,
        body: Block,
    },
    Read(String),
    Write(AExp),
    /// A string literal with its escapes already decoded.
    WriteLiteral(String),
}

pub type Block = Vec<Stmt>;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Program {
    pub statements: Block,
}

impl AExp {
    pub fn num(value: i32) -> Self {
        AExp::Num(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        AExp::Var(name.into())
    }

    pub fn aop(op: ArithOp, left: AExp, right: AExp) -> Self {
        AExp::Aop {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }
}

impl BExp {
    pub fn bop(op: CompareOp, left: AExp, right: AExp) -> Self {
        BExp::Bop { op, left, right }
    }
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: AExp) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::Greater => ">",
        };
        f.write_str(symbol)
    }
}
