use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use replit_lang as replit;

use replit::ast_printer::Ast;
use replit::config::Config;
use replit::engine::Engine;
use replit::error::ReplitError;
use replit::output::WriterSink;
use replit::parser::Parser;
use replit::scanner::Scanner;

/// sysexits `EX_DATAERR`: the program text is malformed.
const EXIT_STATIC_ERROR: u8 = 65;
/// sysexits `EX_SOFTWARE`: the program failed while running.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Replit language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// JSON file with engine limits
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a program and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the AST as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a program
    Run { filename: PathBuf },

    /// Reads programs line by line from standard input, keeping globals
    Repl,
}

/// Reads a source file through a memory map.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file: File =
        File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // mapping a zero-length file fails on some platforms
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once and copied out before the function returns.
    let map: Mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text: &str = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(text.to_string())
}

fn init_logger() -> Result<()> {
    let log_file: File = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module: &str = record.module_path().unwrap_or("<unnamed>");
            let module: &str = module.strip_prefix("replit_lang::").unwrap_or(module);

            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn exit_code(error: &ReplitError) -> ExitCode {
    if error.is_static() {
        ExitCode::from(EXIT_STATIC_ERROR)
    } else {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<ExitCode> {
    let source: String = read_source(filename)?;
    let mut tokenized: bool = true;

    for result in Scanner::new(&source) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    Ok(ExitCode::SUCCESS)
}

fn parse(filename: &Path, json: bool) -> Result<ExitCode> {
    let source: String = read_source(filename)?;

    let tokens = match replit::scanner::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_code(&e));
        }
    };

    let (statements, errors) = Parser::new(&tokens).parse_with_recovery();

    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{}", e);
        }
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
    } else {
        let printer: Ast = Ast;
        for stmt in &statements {
            println!("{}", printer.print_stmt(stmt));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn evaluate(filename: &Path, config: Config) -> Result<ExitCode> {
    let source: String = read_source(filename)?;
    let mut engine = Engine::with_sink(WriterSink::new(io::stdout()), config);

    match engine.evaluate(&source) {
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(exit_code(&e))
        }
    }
}

fn run(filename: &Path, config: Config) -> Result<ExitCode> {
    let source: String = read_source(filename)?;
    let mut engine = Engine::with_sink(WriterSink::new(io::stdout()), config);

    match engine.execute(&source) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            debug!("Run failed: {}", e);
            eprintln!("{}", e);
            Ok(exit_code(&e))
        }
    }
}

fn repl(config: Config) -> Result<ExitCode> {
    let mut engine = Engine::with_sink(WriterSink::new(io::stdout()), config);
    let stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line: String = line.context("Failed to read from stdin")?;

        if !line.trim().is_empty() {
            if let Err(e) = engine.execute(&line) {
                eprintln!("{}", e);
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    println!();
    Ok(ExitCode::SUCCESS)
}

fn dispatch(commands: Commands, config: Config) -> Result<ExitCode> {
    match commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),
        Commands::Parse { filename, json } => parse(&filename, json),
        Commands::Evaluate { filename } => evaluate(&filename, config),
        Commands::Run { filename } => run(&filename, config),
        Commands::Repl => repl(config),
    }
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let config: Config = match &args.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => Config::default(),
    };

    // deep recursion in user programs needs more than the main thread's stack
    let stack_size: usize = config.stack_size_mib * 1024 * 1024;
    let commands: Commands = args.commands;

    let worker = thread::Builder::new()
        .name("replit-engine".to_string())
        .stack_size(stack_size)
        .spawn(move || dispatch(commands, config))
        .context("Failed to spawn engine thread")?;

    worker
        .join()
        .map_err(|_| anyhow!("Engine thread panicked"))?
}
