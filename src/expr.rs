use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::stmt::FunctionDecl;
use crate::token::Position;

/// Identity of an expression that the resolver binds to a scope depth.
/// Allocated by the parser, unique within one [`crate::engine::Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub usize);

/// A name as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
}

impl Identifier {
    pub fn new<S: Into<String>>(name: S, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// A literal constant that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Integral lexemes such as `"3"` are still stored as `3.0`.
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Short‑circuiting operators, kept apart from [`BinaryOp`] so the
/// evaluator never evaluates the right operand eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        })
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        })
    }
}

/// **Abstract‑Syntax‑Tree node** for every kind of expression.
///
/// The tree owns all of its children; function bodies are shared through
/// `Rc` so closures can keep them alive after the program that declared
/// them has finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// `42`, `"text"`, `true`, `nil`
    Literal {
        value: LiteralValue,
        position: Position,
    },

    /// `!ready` or `-42`
    Unary {
        operator: UnaryOp,
        right: Box<Expr>,
        position: Position,
    },

    /// `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },

    /// `a and b`, `a || b`
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
    },

    /// `"(" expression ")"`
    Grouping(Box<Expr>),

    Variable {
        id: ExprId,
        name: Identifier,
    },

    /// `name = value`
    Assign {
        id: ExprId,
        name: Identifier,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// Position of the opening `(`.
        position: Position,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get {
        object: Box<Expr>,
        name: Identifier,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Identifier,
        value: Box<Expr>,
    },

    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },

    /// `object[index] = value`
    SetIndex {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        position: Position,
    },

    /// `[a, b, c]`
    Array {
        elements: Vec<Expr>,
        position: Position,
    },

    /// `{ "key": value }`
    Map {
        entries: Vec<(Expr, Expr)>,
        position: Position,
    },

    This {
        id: ExprId,
        position: Position,
    },

    /// `super.method`
    Super {
        id: ExprId,
        position: Position,
        method: Identifier,
    },

    /// `fn (params) { body }`
    Lambda(Rc<FunctionDecl>),
}

impl Expr {
    /// Best‑effort source position used in diagnostics.
    pub fn position(&self) -> Position {
        match self {
            Expr::Literal { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Call { position, .. }
            | Expr::Index { position, .. }
            | Expr::SetIndex { position, .. }
            | Expr::Array { position, .. }
            | Expr::Map { position, .. }
            | Expr::This { position, .. }
            | Expr::Super { position, .. } => *position,
            Expr::Logical { left, .. } => left.position(),
            Expr::Grouping(inner) => inner.position(),
            Expr::Variable { name, .. }
            | Expr::Assign { name, .. }
            | Expr::Get { name, .. }
            | Expr::Set { name, .. } => name.position,
            Expr::Lambda(decl) => decl.name.position,
        }
    }
}
