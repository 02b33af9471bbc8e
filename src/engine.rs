//! Embedding entry point.
//!
//! An [`Engine`] runs whole programs through scan → parse → resolve →
//! evaluate.  All static checks finish before the first statement runs, so a
//! program with a lexical, syntax or resolution error prints nothing.  One
//! engine keeps its globals between calls, which is what a REPL needs; the
//! free function [`run`] uses a fresh engine every time, on a worker thread
//! with the configured stack size.

use std::fmt;
use std::panic;
use std::thread;

use log::{debug, info};
use thiserror::Error;

use crate::config::Config;
use crate::error::{ErrorCategory, ReplitError, Result};
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::output::{Output, OutputSink};
use crate::parser::Parser;
use crate::resolver::{Resolution, Resolver, StaticGlobals};
use crate::scanner;
use crate::stmt::Stmt;
use crate::token::Token;
use crate::value::Value;

/// A failed run: the error plus whatever was printed before it happened.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ErrorReport {
    #[source]
    pub error: ReplitError,
    pub output: Output,
}

impl ErrorReport {
    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}

pub struct Engine<S: OutputSink = Output> {
    interpreter: Interpreter<S>,
    globals: StaticGlobals,
    next_id: usize,
}

impl Engine<Output> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_sink(Output::new(), config)
    }

    /// Run `source`, returning the lines it printed.
    pub fn run(&mut self, source: &str) -> std::result::Result<Output, ErrorReport> {
        let result: Result<()> = self.execute(source);
        let output: Output = self.interpreter.sink_mut().take();

        match result {
            Ok(()) => Ok(output),
            Err(error) => Err(ErrorReport { error, output }),
        }
    }
}

impl Default for Engine<Output> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> Engine<S> {
    pub fn with_sink(sink: S, config: Config) -> Self {
        info!("Engine created with {:?}", config);

        Self {
            interpreter: Interpreter::with_sink(sink, config),
            globals: StaticGlobals::new(),
            next_id: 0,
        }
    }

    /// Run a whole program, writing its output to the engine's sink.
    pub fn execute(&mut self, source: &str) -> Result<()> {
        let statements: Vec<Stmt> = self.parse_program(source)?;

        let resolution: Resolution = Resolver::new(&self.globals).resolve(&statements)?;
        self.commit(resolution);

        self.interpreter.interpret(&statements)
    }

    /// Evaluate a single expression against the engine's globals.
    pub fn evaluate(&mut self, source: &str) -> Result<Value> {
        let tokens: Vec<Token> = scanner::tokenize(source)?;
        let mut parser: Parser = Parser::new(&tokens).with_first_id(self.next_id);
        let expr: Expr = parser.parse_expression()?;
        self.next_id = parser.next_id();

        let resolution: Resolution = Resolver::new(&self.globals).resolve_expression(&expr)?;
        self.commit(resolution);

        self.interpreter.evaluate(&expr)
    }

    /// Scan and parse `source`, numbering its expressions after every
    /// program this engine has already seen.
    fn parse_program(&mut self, source: &str) -> Result<Vec<Stmt>> {
        let tokens: Vec<Token> = scanner::tokenize(source)?;
        let mut parser: Parser = Parser::new(&tokens).with_first_id(self.next_id);
        let statements: Vec<Stmt> = parser.parse()?;
        self.next_id = parser.next_id();

        debug!("Parsed {} statement(s), next id {}", statements.len(), self.next_id);
        Ok(statements)
    }

    fn commit(&mut self, resolution: Resolution) {
        self.globals = resolution.globals;
        self.interpreter.resolve(resolution.locals);
    }

    pub fn sink(&self) -> &S {
        self.interpreter.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.interpreter.sink_mut()
    }

    pub fn into_sink(self) -> S {
        self.interpreter.into_sink()
    }
}

impl<S: OutputSink> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("globals", &self.globals)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Run `source` on a fresh engine with the default [`Config`].
pub fn run(source: &str) -> std::result::Result<Output, ErrorReport> {
    run_with_config(source, Config::default())
}

/// Run `source` on a fresh engine, on a worker thread whose stack is
/// `config.stack_size_mib` large, so the call-depth limit is reached before
/// the native stack runs out whatever thread the caller is on.
pub fn run_with_config(
    source: &str,
    config: Config,
) -> std::result::Result<Output, ErrorReport> {
    let stack_size: usize = config.stack_size_mib.saturating_mul(1024 * 1024);

    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("replit-run".to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, move || Engine::with_config(config).run(source))
            .map_err(|e| ErrorReport {
                error: ReplitError::Io(e),
                output: Output::default(),
            })?;

        match worker.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    })
}
