//! # rela REPL
//!
//! Interactive shell and script runner for the relational algebra.
//!
//! ## Usage
//!
//! ```bash
//! rela                            # start the REPL
//! rela --load employees.csv      # preload a relation, then REPL
//! rela --script queries.rela     # run a script and exit
//! ```
//!
//! Inside the REPL:
//! - `E ? salary > 50000 # name` - evaluate a query
//! - `Big := E ? salary > 50000` - bind a result
//! - `.load <path> [name]` - load a CSV/TSV/JSON file
//! - `.rel [name]` - list relations, or show one
//! - `.save <path>` / `.open <path>` - workspace snapshots
//! - `.help` / `.quit`

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use rela::render::render_result;
use rela::{Config, Outcome, Session};

#[derive(ClapParser, Debug)]
#[command(name = "rela", version, about = "A terse relational algebra interpreter")]
struct Args {
    /// Configuration file (default: rela.toml + rela.local.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script file to execute instead of starting the REPL
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Data files to load before the first statement (CSV/TSV/JSON)
    #[arg(short, long)]
    load: Vec<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, &config.logging.format)?;

    let mut session = Session::with_data_dir(config.data.data_dir.clone());

    for path in &args.load {
        let outcome = session
            .execute(&format!(".load {}", path.display()))
            .map_err(|e| anyhow::anyhow!("loading {}: {e}", path.display()))?;
        print_outcome(&outcome);
    }

    if let Some(script) = &args.script {
        return run_script(&mut session, script);
    }

    run_repl(&mut session, &config)
}

fn init_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).with_context(|| format!("bad log level '{level}'"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn run_script(session: &mut Session, path: &PathBuf) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;

    for (index, line) in source.lines().enumerate() {
        match session.execute(line) {
            Ok(Outcome::Quit) => break,
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                anyhow::bail!("{}:{}: {e}", path.display(), index + 1);
            }
        }
    }
    Ok(())
}

fn run_repl(session: &mut Session, config: &Config) -> anyhow::Result<()> {
    println!("rela {}", env!("CARGO_PKG_VERSION"));
    println!("Type .help for commands, .quit to leave.\n");

    let mut editor = DefaultEditor::new().context("initializing readline")?;
    let history_file = &config.repl.history_file;
    let _ = editor.load_history(history_file);

    loop {
        match editor.readline(&config.repl.prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(&line);
                }
                match session.execute(&line) {
                    Ok(Outcome::Quit) => break,
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        }
    }

    let _ = editor.save_history(history_file);
    println!("Goodbye!");
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Empty => {}
        Outcome::Result(result) => print!("{}", render_result(result)),
        Outcome::Bound { name, tuples } => println!("{name} = {tuples} tuple(s)"),
        Outcome::Loaded { name, tuples } => println!("loaded {name} ({tuples} tuple(s))"),
        Outcome::Relations(list) => {
            if list.is_empty() {
                println!("no relations bound");
            }
            for (name, tuples, schema) in list {
                println!("{name} ({tuples} tuple(s)): {}", schema.join(", "));
            }
        }
        Outcome::Saved(path) => println!("workspace saved to {}", path.display()),
        Outcome::Opened { path, relations } => {
            println!("opened {} ({relations} relation(s))", path.display());
        }
        Outcome::Dropped(name) => println!("dropped {name}"),
        Outcome::Help => print_help(),
        Outcome::Quit => {}
    }
}

fn print_help() {
    println!("Statements:");
    println!("  <chain>                 evaluate a query, e.g. E ? salary > 50000 # name");
    println!("  <name> := <chain>       bind a query result");
    println!("  <name> |= <chain>       rebind through union");
    println!("  <name> -= <chain>       rebind through difference");
    println!("  <name> ?= <predicate>   rebind through a filter");
    println!();
    println!("Commands:");
    println!("  .load <path> [name]     load a CSV/TSV/JSON file as a relation");
    println!("  .rel [name]             list relations, or show one");
    println!("  .save <path>            save the workspace (JSON)");
    println!("  .open <path>            load a workspace, replacing the environment");
    println!("  .drop <name>            remove a relation");
    println!("  .help                   this help");
    println!("  .quit                   exit");
}
