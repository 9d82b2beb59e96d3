use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::scanner::Scanner;
use rox::{LoxError, Session};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt (the default)
    Repl,
}

/// Reads a source file through a read-only memory map.
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    // SAFETY: the map is read-only and copied out before the file handle is
    // dropped; concurrent truncation by another process is not guarded.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&map)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// 65 for anything caught before execution, 70 for runtime failures.
fn exit_code(errors: &[LoxError]) -> i32 {
    if errors.iter().all(LoxError::is_static) {
        65
    } else {
        70
    }
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<()> {
    let source = read_file(filename)?;
    let (tokens, errors) = Scanner::new(&source).scan_all();

    for e in &errors {
        eprintln!("{}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code 65");
        process::exit(65);
    }

    Ok(())
}

fn run_file(filename: &PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut session = Session::new();

    if let Err(errors) = session.run(&source) {
        for e in &errors {
            eprintln!("{}", e);
        }

        let code = exit_code(&errors);
        debug!("Run failed, exiting with code {}", code);
        process::exit(code);
    }

    info!("Program executed successfully");
    Ok(())
}

/// Read-eval-print loop over stdin.  One session for the whole prompt, so
/// definitions carry over between lines; errors are reported and the loop
/// goes on.
fn repl() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }

        if let Err(errors) = session.run(&line) {
            for e in &errors {
                eprintln!("{}", e);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),
        Commands::Run { filename } => run_file(&filename),
        Commands::Repl => repl(),
    }
}
