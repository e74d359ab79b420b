//! Rill interpreter CLI.
//!
//! `rill <file>` evaluates a script; `rill` alone starts the interactive
//! prompt. Debug flags dump the stage outputs, `--backend` selects the
//! stack machine or the tree-walker, and `completions` generates shell
//! completion scripts.

mod config;
mod engine;
mod prompt;

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use config::{Backend, Config};
use engine::{Dumps, Engine, exit_code};
use rillc::Source;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "rill")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for the Rill programming language", long_about = None)]
struct Cli {
    /// Source file to evaluate; starts the interactive prompt if omitted
    file: Option<PathBuf>,

    /// Execution backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Path to a config file (defaults to rill.toml next to the script,
    /// or ~/.config/rill/config.toml for the prompt)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the token stream before running
    #[arg(long)]
    dump_tokens: bool,

    /// Print the resolved expression tree before running
    #[arg(long)]
    dump_ast: bool,

    /// Print the compiled bytecode before running
    #[arg(long)]
    dump_bytecode: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            use clap::error::ErrorKind;
            let code = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_code::OK,
                _ => exit_code::USAGE,
            };
            let _ = error.print();
            process::exit(code);
        }
    };

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut command = Cli::command();
        generate(*shell, &mut command, "rill", &mut io::stdout());
        process::exit(exit_code::OK);
    }

    process::exit(run_cli(cli));
}

fn run_cli(cli: Cli) -> i32 {
    let dumps = Dumps {
        tokens: cli.dump_tokens,
        ast: cli.dump_ast,
        bytecode: cli.dump_bytecode,
    };

    match cli.file {
        Some(file) => run_file(&file, cli.backend, cli.config.as_deref(), dumps),
        None => run_prompt(cli.backend, cli.config.as_deref(), dumps),
    }
}

fn run_file(file: &Path, backend: Option<Backend>, config: Option<&Path>, dumps: Dumps) -> i32 {
    let config = match load_config(config, Some(file)) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return exit_code::DATAERR;
        }
    };

    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(error) => {
            eprintln!("The file '{}' could not be read: {error}", file.display());
            return exit_code::IOERR;
        }
    };

    let backend = backend.or(config.run.backend).unwrap_or_default();
    let source = Source::new(file.display().to_string(), text);
    Engine::new(backend, dumps).run(&source)
}

fn run_prompt(backend: Option<Backend>, config: Option<&Path>, dumps: Dumps) -> i32 {
    let config = match load_config(config, None) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return exit_code::DATAERR;
        }
    };

    println!("Rill {} -- interactive prompt", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl-D to exit");

    let backend = backend.or(config.run.backend).unwrap_or_default();
    let mut engine = Engine::new(backend, dumps);
    prompt::run(&mut engine, &config.history_file())
}

fn load_config(explicit: Option<&Path>, script: Option<&Path>) -> Result<Config, String> {
    match (explicit, script) {
        (Some(path), _) => Config::load(path),
        (None, Some(script)) => Config::for_script(script),
        (None, None) => Config::for_prompt(),
    }
}
