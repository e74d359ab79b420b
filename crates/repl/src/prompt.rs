//! The interactive prompt.

use crate::engine::{Engine, exit_code};
use rillc::Source;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::Path;

/// Read-eval-print against a persistent engine. History is loaded from and
/// saved to `history`.
pub fn run(engine: &mut Engine, history: &Path) -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("Failed to start the prompt: {error}");
            return exit_code::IOERR;
        }
    };
    let _ = editor.load_history(history);

    loop {
        match editor.readline("rill> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                let source = Source::new("<prompt>", line);
                // A failed line does not end the session
                engine.run(&source);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("Prompt error: {error}");
                break;
            }
        }
    }

    let _ = editor.save_history(history);
    exit_code::OK
}
