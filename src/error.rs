//! Centralised error hierarchy for the **Replit language** engine.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving category, message and position.
//!
//! The module **does not** print diagnostics itself

use std::fmt;
use std::io;
use thiserror::Error;

use log::debug;

use crate::token::Position;

/// Sub‑category of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operand or value of the wrong kind.
    Type,
    /// Wrong number of call arguments.
    Arity,
    /// Visibility rule violated by a field read/write or method call.
    Access,
    /// Undefined variable, field or method.
    Reference,
    /// Division or remainder by zero.
    Arithmetic,
    /// Call depth limit exceeded.
    StackOverflow,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::Type => "TypeError",
            RuntimeErrorKind::Arity => "ArityError",
            RuntimeErrorKind::Access => "AccessError",
            RuntimeErrorKind::Reference => "ReferenceError",
            RuntimeErrorKind::Arithmetic => "ArithmeticError",
            RuntimeErrorKind::StackOverflow => "StackOverflowError",
        };

        f.write_str(name)
    }
}

/// Coarse error category reported to embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lex,
    Parse,
    Resolve,
    Runtime,
    Io,
}

/// Canonical error type used throughout the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReplitError {
    /// Lexical (scanner) error.
    #[error("[line {position}] LexError: {message}")]
    Lex { message: String, position: Position },

    /// Syntactic (parser) error.
    #[error("[line {position}] ParseError: {message}")]
    Parse { message: String, position: Position },

    /// Static‑analysis failure detected before any statement runs.
    #[error("[line {position}] ResolveError: {message}")]
    Resolve { message: String, position: Position },

    /// Runtime evaluation error.
    #[error("[line {position}] {kind}: {message}")]
    Runtime {
        kind: RuntimeErrorKind,
        message: String,
        position: Position,
    },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ReplitError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(position: Position, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: at={}, msg={}", position, message);

        ReplitError::Lex { message, position }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(position: Position, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: at={}, msg={}", position, message);

        ReplitError::Parse { message, position }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(position: Position, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Resolve error: at={}, msg={}", position, message);

        ReplitError::Resolve { message, position }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(kind: RuntimeErrorKind, position: Position, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating {} error: at={}, msg={}", kind, position, message);

        ReplitError::Runtime {
            kind,
            message,
            position,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReplitError::Lex { .. } => ErrorCategory::Lex,
            ReplitError::Parse { .. } => ErrorCategory::Parse,
            ReplitError::Resolve { .. } => ErrorCategory::Resolve,
            ReplitError::Runtime { .. } => ErrorCategory::Runtime,
            ReplitError::Config(_) | ReplitError::Io(_) => ErrorCategory::Io,
        }
    }

    /// Runtime sub‑kind, `None` for static and I/O errors.
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            ReplitError::Runtime { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Source position, when the error has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            ReplitError::Lex { position, .. }
            | ReplitError::Parse { position, .. }
            | ReplitError::Resolve { position, .. }
            | ReplitError::Runtime { position, .. } => Some(*position),
            ReplitError::Config(_) | ReplitError::Io(_) => None,
        }
    }

    /// Human message without the position prefix.
    pub fn message(&self) -> String {
        match self {
            ReplitError::Lex { message, .. }
            | ReplitError::Parse { message, .. }
            | ReplitError::Resolve { message, .. }
            | ReplitError::Runtime { message, .. } => message.clone(),
            ReplitError::Config(message) => message.clone(),
            ReplitError::Io(e) => e.to_string(),
        }
    }

    /// `true` for errors detected before execution starts.
    pub fn is_static(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Lex | ErrorCategory::Parse | ErrorCategory::Resolve
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, ReplitError>;
