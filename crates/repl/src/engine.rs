//! The pipeline driver.
//!
//! One [`Engine`] owns the execution backend for a session and pushes each
//! source through the stages: lex, parse, resolve, then either compile and
//! run on the stack machine or evaluate on the tree-walker. The engine is
//! reused across prompt lines, so definitions and heap objects persist for
//! the lifetime of the session.

use crate::config::Backend;
use rill_core::{Code, Error};
use rill_runtime::{Vm, Walker, disassemble};
use rillc::{Compiler, Lexer, Parser, Reporter, Source, TypeResolver};
use tracing::debug;

/// BSD sysexits-style process exit codes.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const USAGE: i32 = 64;
    pub const DATAERR: i32 = 65;
    pub const SOFTWARE: i32 = 70;
    pub const IOERR: i32 = 74;
}

/// Which stage outputs to print alongside the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dumps {
    pub tokens: bool,
    pub ast: bool,
    pub bytecode: bool,
}

enum BackendImpl {
    Vm(Vm),
    Walk(Walker),
}

pub struct Engine {
    backend: BackendImpl,
    dumps: Dumps,
}

impl Engine {
    pub fn new(backend: Backend, dumps: Dumps) -> Self {
        let backend = match backend {
            Backend::Vm => BackendImpl::Vm(Vm::new()),
            Backend::Walk => BackendImpl::Walk(Walker::new()),
        };
        Engine { backend, dumps }
    }

    /// Run one source through the pipeline, reporting diagnostics to
    /// stderr. Returns the process exit code for the run.
    pub fn run(&mut self, source: &Source) -> i32 {
        debug!(file = source.file(), "running source");

        let tokens = match Lexer::new(source).tokenize() {
            Ok(tokens) => tokens,
            Err(error) => {
                print_error(source, &error);
                return exit_code::DATAERR;
            }
        };
        if self.dumps.tokens {
            for token in &tokens {
                println!("{token}");
            }
        }

        let mut reporter = Reporter::new();
        let heap = match &mut self.backend {
            BackendImpl::Vm(vm) => vm.heap_mut(),
            BackendImpl::Walk(walker) => walker.heap_mut(),
        };
        let mut root = Parser::new(tokens, &mut reporter, heap).parse();
        if reporter.had_error() {
            eprint!("{}", reporter.render(source));
            return exit_code::DATAERR;
        }

        match &mut self.backend {
            BackendImpl::Vm(vm) => {
                TypeResolver::new(&mut reporter, vm.heap()).resolve_strict(&mut root);
                if reporter.had_error() {
                    eprint!("{}", reporter.render(source));
                    return exit_code::DATAERR;
                }
                if self.dumps.ast {
                    println!("{root:#?}");
                }

                let mut code = Code::new();
                Compiler::new(&mut code, &mut reporter).compile(&root);
                if reporter.had_error() {
                    eprint!("{}", reporter.render(source));
                    return exit_code::DATAERR;
                }
                if self.dumps.bytecode {
                    print!("{}", disassemble(&code, vm.heap()));
                }

                if let Err(error) = vm.run(&code) {
                    print_error(source, &error);
                    return exit_code::SOFTWARE;
                }
            }

            BackendImpl::Walk(walker) => {
                TypeResolver::new(&mut reporter, walker.heap()).resolve(&mut root);
                if reporter.had_error() {
                    eprint!("{}", reporter.render(source));
                    return exit_code::DATAERR;
                }
                if self.dumps.ast {
                    println!("{root:#?}");
                }

                if let Err(error) = walker.run(&root) {
                    print_error(source, &error);
                    return exit_code::SOFTWARE;
                }
            }
        }

        exit_code::OK
    }
}

fn print_error(source: &Source, error: &Error) {
    eprintln!("{}: {}", error.kind.name(), error.message);
    if let Some(location) = error.location {
        eprintln!("{}", source.format(location));
    }
}
