use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::expr::{Expr, ExprId, Identifier};
use crate::token::Position;

/// Name of the method run when a class is instantiated.
pub const CONSTRUCTOR: &str = "init";

/// An optional type annotation such as `int` or `Array<Item>`.
/// Annotations are kept for tooling and ignored by evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeName {
    pub name: String,
    pub arguments: Vec<TypeName>,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;

        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MethodModifier {
    #[default]
    None,
    Virtual,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Identifier,
    pub ty: Option<TypeName>,
}

/// A named function, method or lambda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub params: Vec<Param>,
    pub return_type: Option<TypeName>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: Identifier,
    pub visibility: Visibility,
    pub ty: Option<TypeName>,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDecl {
    pub visibility: Visibility,
    pub modifier: MethodModifier,
    pub function: Rc<FunctionDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuperclassRef {
    pub id: ExprId,
    pub name: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDecl {
    pub name: Identifier,
    pub superclass: Option<SuperclassRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

/// **Abstract‑Syntax‑Tree node** for statements.  A program is a sequence
/// of these nodes returned by [`crate::parser::Parser::parse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print a;` or `print a, b;` (operands joined by one space).
    Print {
        keyword: Position,
        values: Vec<Expr>,
    },

    /// `("var" | "let") IDENT (":" type)? ("=" initializer)? ";"`
    Var {
        name: Identifier,
        ty: Option<TypeName>,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Position,
        value: Option<Expr>,
    },

    Break(Position),

    Continue(Position),

    Class(Rc<ClassDecl>),
}
