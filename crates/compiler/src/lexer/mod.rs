//! The lexer: UTF-8 source text to a token stream.
//!
//! The source is split into lines first; indentation at the start of each
//! non-blank line is translated into INDENT/DEDENT tokens by the
//! [`indent::IndentTracker`], a NEWLINE token closes every scanned line,
//! and a final END token closes the stream. In-line scanning tries every
//! rule in [`rules::RULES`] at the current position and keeps the longest
//! match, breaking ties in favor of the rule listed first.
//!
//! The lexer stops at the first malformed input and returns the error; no
//! partial token stream reaches the parser.

pub mod indent;
pub mod rules;

use crate::source::Source;
use crate::token::{Token, TokenKind};
use indent::{IndentChange, IndentTracker};
use rill_core::{Error, ErrorKind, Location, Result};
use tracing::debug;

pub struct Lexer<'src> {
    source: &'src Source,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src Source) -> Self {
        Lexer { source }
    }

    /// Tokenize the whole source, ending with END.
    pub fn tokenize(&self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut indents = IndentTracker::new();
        let mut location = Location::default();

        for line in self.source.lines() {
            // A shebang is only allowed on the very first line
            if line.starts_with("#!") {
                if location.line != 0 {
                    return Err(Error::new(
                        ErrorKind::Syntax,
                        location,
                        "A shebang is only allowed at the first line of the source",
                    ));
                }
                location.next_line();
                continue;
            }

            // Blank and whitespace-only lines produce no tokens
            if line.trim_matches([' ', '\t', '\r']).is_empty() {
                location.next_line();
                continue;
            }

            let depth = line.bytes().take_while(|byte| *byte == b' ').count() as u32;
            match indents.step(depth) {
                Some(IndentChange::Open) => {
                    if location.line == 0 {
                        return Err(Error::new(
                            ErrorKind::Syntax,
                            location,
                            "The first line of the source should never be indented",
                        ));
                    }
                    tokens.push(Token::new(TokenKind::Indent, location));
                }
                Some(IndentChange::Close(count)) => {
                    for _ in 0..count {
                        tokens.push(Token::new(TokenKind::Dedent, location));
                    }
                }
                Some(IndentChange::Level) => {}
                None => {
                    return Err(Error::new(
                        ErrorKind::Syntax,
                        location,
                        "The indentation does not match any outer indentation level",
                    ));
                }
            }
            location.advance(depth);

            self.scan_line(line, &mut location, &mut tokens)?;

            tokens.push(Token::new(TokenKind::Newline, location));
            location.next_line();
        }

        for _ in 0..indents.finish() {
            tokens.push(Token::new(TokenKind::Dedent, location));
        }
        tokens.push(Token::new(TokenKind::End, location));

        debug!(tokens = tokens.len(), "lexed source");
        Ok(tokens)
    }

    /// Scan one line from the current column to its end.
    fn scan_line(&self, line: &str, location: &mut Location, tokens: &mut Vec<Token>) -> Result<()> {
        while (location.col as usize) < line.len() {
            let rest = &line[location.col as usize..];

            // A comment runs to the end of the line, unless a string lexeme
            // at this position matches a longer stretch
            if let Some(captures) = rules::COMMENT.captures(rest) {
                let comment_len = captures.get(0).map_or(0, |m| m.end());
                let string_len = rules::STRING.find(rest).map_or(0, |m| m.end());
                if string_len <= comment_len {
                    let body = captures.get(1).map_or("", |m| m.as_str());
                    tokens.push(Token::with_text(TokenKind::Comment, body, *location));
                    location.advance(comment_len as u32);
                    continue;
                }
            }

            // Insignificant whitespace
            if let Some(found) = rules::WHITESPACE.find(rest) {
                location.advance(found.end() as u32);
                continue;
            }

            // Try every rule; keep the longest match, first rule on ties
            let mut best: Option<(TokenKind, usize, String)> = None;
            for rule in rules::RULES.iter() {
                if let Some((length, text)) = rule.find(rest) {
                    if best.as_ref().is_none_or(|(_, best_len, _)| length > *best_len) {
                        best = Some((rule.kind, length, text));
                    }
                }
            }

            match best {
                Some((kind, length, text)) => {
                    tokens.push(Token::with_text(kind, text, *location));
                    location.advance(length as u32);
                }
                None => {
                    let offending = rest.chars().next().unwrap_or('\u{fffd}');
                    return Err(Error::new(
                        ErrorKind::Syntax,
                        *location,
                        format!("Invalid character '{offending}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}
