//! The lexer rule table.
//!
//! One rule per token kind, each an anchored regex tried at the current
//! scan position. Arbitration between simultaneous matches lives in the
//! scan loop: the longest match wins and ties fall back to table order.

use crate::token::TokenKind;
use regex::Regex;
use std::sync::LazyLock;

/// A single scan rule: a token kind, its anchored pattern, and the capture
/// group that carries the token text (if any).
pub struct LexRule {
    pub kind: TokenKind,
    pattern: Regex,
    group: Option<usize>,
}

impl LexRule {
    fn new(kind: TokenKind, pattern: &str) -> Self {
        LexRule {
            kind,
            pattern: anchored(pattern),
            group: None,
        }
    }

    fn with_group(kind: TokenKind, pattern: &str, group: usize) -> Self {
        LexRule {
            kind,
            pattern: anchored(pattern),
            group: Some(group),
        }
    }

    /// Match at the start of `rest`, returning the match length in bytes
    /// and the token text the rule captures.
    pub fn find(&self, rest: &str) -> Option<(usize, String)> {
        let captures = self.pattern.captures(rest)?;
        let length = captures.get(0)?.end();
        let text = match self.group {
            Some(group) => captures.get(group).map(|m| m.as_str().to_string())?,
            None => String::new(),
        };
        Some((length, text))
    }
}

fn anchored(pattern: &str) -> Regex {
    // Patterns in the table are written unanchored; anchoring them here
    // keeps the table readable.
    Regex::new(&format!("^(?:{pattern})")).expect("lexer rule pattern must compile")
}

/// A comment runs to the end of the line; group 1 is the comment body.
pub static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*--[ \t]*(.*)").expect("comment pattern must compile"));

/// A double-quoted string lexeme; checked before the comment rule so a
/// string is never swallowed as a comment.
pub static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(?:[^\\"]|\\.)*""#).expect("string pattern must compile"));

/// Insignificant spaces and tabs inside a line.
pub static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]+").expect("whitespace pattern must compile"));

/// The rule table, in arbitration order.
pub static RULES: LazyLock<Vec<LexRule>> = LazyLock::new(|| {
    vec![
        // Delimiters
        LexRule::new(TokenKind::ParenthesisLeft, r"\("),
        LexRule::new(TokenKind::ParenthesisRight, r"\)"),
        LexRule::new(TokenKind::SquareBracketLeft, r"\["),
        LexRule::new(TokenKind::SquareBracketRight, r"\]"),
        LexRule::new(TokenKind::CurlyBracketLeft, r"\{"),
        LexRule::new(TokenKind::CurlyBracketRight, r"\}"),
        // Symbols
        LexRule::new(TokenKind::SymbolColon, r":"),
        LexRule::new(TokenKind::SymbolComma, r","),
        LexRule::new(TokenKind::SymbolDot, r"\."),
        LexRule::new(TokenKind::SymbolBackslash, r"\\"),
        // Operators
        LexRule::new(TokenKind::OperatorMaybe, r"\?"),
        LexRule::new(TokenKind::OperatorIntersection, r"&"),
        LexRule::new(TokenKind::OperatorUnion, r"\|"),
        LexRule::new(TokenKind::OperatorLength, r"#"),
        LexRule::new(TokenKind::OperatorString, r"\$"),
        LexRule::new(TokenKind::OperatorMultiply, r"\*"),
        LexRule::new(TokenKind::OperatorDivide, r"/"),
        LexRule::new(TokenKind::OperatorQuotient, r"//"),
        LexRule::new(TokenKind::OperatorRemainder, r"%"),
        LexRule::new(TokenKind::OperatorAdd, r"\+"),
        LexRule::new(TokenKind::OperatorSubtract, r"-"),
        LexRule::new(TokenKind::OperatorRange, r"\.\."),
        LexRule::new(TokenKind::OperatorCompare, r"<=>"),
        LexRule::new(TokenKind::OperatorLess, r"<"),
        LexRule::new(TokenKind::OperatorLessEqual, r"<="),
        LexRule::new(TokenKind::OperatorGreater, r">"),
        LexRule::new(TokenKind::OperatorGreaterEqual, r">="),
        LexRule::new(TokenKind::OperatorMatch, r"=~"),
        LexRule::new(TokenKind::OperatorNotMatch, r"!~"),
        LexRule::new(TokenKind::OperatorEqual, r"=="),
        LexRule::new(TokenKind::OperatorNotEqual, r"!="),
        LexRule::new(TokenKind::OperatorIdentical, r"==="),
        LexRule::new(TokenKind::OperatorNotIdentical, r"!=="),
        LexRule::new(TokenKind::OperatorLogicNot, r"not"),
        LexRule::new(TokenKind::OperatorLogicAnd, r"and"),
        LexRule::new(TokenKind::OperatorLogicOr, r"or"),
        LexRule::new(TokenKind::OperatorAssign, r"="),
        // Keywords
        LexRule::new(TokenKind::KeywordDef, r"def"),
        LexRule::new(TokenKind::KeywordDo, r"do"),
        LexRule::new(TokenKind::KeywordEcho, r"echo"),
        LexRule::new(TokenKind::KeywordElse, r"else"),
        LexRule::new(TokenKind::KeywordFalse, r"false"),
        LexRule::new(TokenKind::KeywordFor, r"for"),
        LexRule::new(TokenKind::KeywordIf, r"if"),
        LexRule::new(TokenKind::KeywordIn, r"in"),
        LexRule::new(TokenKind::KeywordNothing, r"nothing"),
        LexRule::new(TokenKind::KeywordThen, r"then"),
        LexRule::new(TokenKind::KeywordTrue, r"true"),
        LexRule::new(TokenKind::KeywordUntil, r"until"),
        LexRule::new(TokenKind::KeywordWhile, r"while"),
        // Identifiers: a raw ASCII form and a backtick-quoted form whose
        // body (escapes intact) is the token text
        LexRule::with_group(TokenKind::Identifier, r"[A-Za-z_][A-Za-z0-9_]*", 0),
        LexRule::with_group(TokenKind::Identifier, r"`((?:[^\\`]|\\.)+)`", 1),
        // Literals; quote and slash delimiters are stripped by the capture
        LexRule::with_group(
            TokenKind::LiteralInt,
            r"0[Xx][0-9A-Fa-f][0-9A-Fa-f_]*|-?(?:0|[1-9][0-9_]*)",
            0,
        ),
        LexRule::with_group(
            TokenKind::LiteralReal,
            r"-?(?:0|[1-9][0-9_]*)(?:\.[0-9][0-9_]*(?:[Ee][+-]?(?:0|[1-9][0-9_]*))?|[Ee][+-]?(?:0|[1-9][0-9_]*))",
            0,
        ),
        LexRule::with_group(TokenKind::LiteralRune, r"'((?:[^\\']|\\.)*)'", 1),
        LexRule::with_group(TokenKind::LiteralString, r#""((?:[^\\"]|\\.)*)""#, 1),
        LexRule::with_group(TokenKind::LiteralRegex, r"/((?:[^\\/]|\\.)*)/[A-Za-z]*", 1),
    ]
});
