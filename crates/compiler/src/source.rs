//! Source text with a precomputed line index.

use rill_core::Location;

/// A source file: its path (or a pseudo-name like `<prompt>`) and its text,
/// split into lines once at construction. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct Source {
    file: String,
    text: String,
    lines: Vec<String>,
}

impl Source {
    /// Line terminators are `\r?\n`.
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Source {
            file: file.into(),
            text,
            lines,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Render a caret block pointing at `location`:
    ///
    /// ```text
    /// scratch.rill, line 2, col 8
    ///    2 │ echo 1 +
    ///      │        ^
    /// ```
    pub fn format(&self, location: Location) -> String {
        let Some(line) = self.line(location.line as usize) else {
            return format!("{}, {}", self.file, location);
        };
        let caret_pad = " ".repeat((location.col as usize).min(line.len()));
        format!(
            "{}, {}\n{:>4} │ {}\n     │ {}^",
            self.file,
            location,
            location.line + 1,
            line,
            caret_pad
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_splitting_handles_crlf() {
        let source = Source::new("a.rill", "one\r\ntwo\nthree");
        assert_eq!(source.lines(), &["one", "two", "three"]);
    }

    #[test]
    fn test_trailing_newline_yields_empty_last_line() {
        let source = Source::new("a.rill", "one\n");
        assert_eq!(source.lines(), &["one", ""]);
    }

    #[test]
    fn test_format_renders_caret_under_column() {
        let source = Source::new("a.rill", "echo 1 +\necho 2");
        let block = source.format(Location::new(0, 7));
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "a.rill, line 1, col 8");
        assert_eq!(lines[1], "   1 │ echo 1 +");
        assert_eq!(lines[2], "     │        ^");
    }

    #[test]
    fn test_format_out_of_range_degrades_gracefully() {
        let source = Source::new("a.rill", "echo 1");
        let block = source.format(Location::new(9, 0));
        assert_eq!(block, "a.rill, line 10, col 1");
    }
}
