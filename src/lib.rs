pub mod ast_printer;
pub mod class;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod natives;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

pub use engine::{run, run_with_config, Engine, ErrorReport};
pub use error::{ErrorCategory, ReplitError, RuntimeErrorKind};
pub use output::{Output, OutputSink};
