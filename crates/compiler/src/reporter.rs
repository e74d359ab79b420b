//! Collection and rendering of diagnostics.

use crate::source::Source;
use rill_core::Error;

/// Collects the diagnostics of a run.
///
/// The lexer stops at its first error; the parser reports and keeps going,
/// so a single run can carry several syntax errors here.
#[derive(Debug, Default)]
pub struct Reporter {
    errors: Vec<Error>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    pub fn report(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Render every diagnostic with its caret block against the source.
    pub fn render(&self, source: &Source) -> String {
        let mut rendered = String::new();
        for error in &self.errors {
            rendered.push_str(&format!("{}: {}\n", error.kind.name(), error.message));
            if let Some(location) = error.location {
                rendered.push_str(&source.format(location));
                rendered.push('\n');
            }
        }
        rendered
    }
}
