//! Tokens and token kinds.

use rill_core::Location;
use std::fmt;

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Lexer-specific
    End,
    Newline,
    Indent,
    Dedent,
    Comment,

    // Delimiters
    ParenthesisLeft,
    ParenthesisRight,
    SquareBracketLeft,
    SquareBracketRight,
    CurlyBracketLeft,
    CurlyBracketRight,

    // Symbols
    SymbolColon,
    SymbolComma,
    SymbolDot,
    SymbolBackslash,

    // Operators
    OperatorMaybe,
    OperatorIntersection,
    OperatorUnion,
    OperatorLength,
    OperatorString,
    OperatorMultiply,
    OperatorDivide,
    OperatorQuotient,
    OperatorRemainder,
    OperatorAdd,
    OperatorSubtract,
    OperatorRange,
    OperatorCompare,
    OperatorLess,
    OperatorLessEqual,
    OperatorGreater,
    OperatorGreaterEqual,
    OperatorMatch,
    OperatorNotMatch,
    OperatorEqual,
    OperatorNotEqual,
    OperatorIdentical,
    OperatorNotIdentical,
    OperatorLogicNot,
    OperatorLogicAnd,
    OperatorLogicOr,
    OperatorAssign,

    // Keywords
    KeywordDef,
    KeywordDo,
    KeywordEcho,
    KeywordElse,
    KeywordFalse,
    KeywordFor,
    KeywordIf,
    KeywordIn,
    KeywordNothing,
    KeywordThen,
    KeywordTrue,
    KeywordUntil,
    KeywordWhile,

    // Identifiers
    Identifier,

    // Literals
    LiteralInt,
    LiteralReal,
    LiteralRune,
    LiteralString,
    LiteralRegex,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::End => "end of tokens",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Comment => "comment",
            TokenKind::ParenthesisLeft => "'('",
            TokenKind::ParenthesisRight => "')'",
            TokenKind::SquareBracketLeft => "'['",
            TokenKind::SquareBracketRight => "']'",
            TokenKind::CurlyBracketLeft => "'{'",
            TokenKind::CurlyBracketRight => "'}'",
            TokenKind::SymbolColon => "':'",
            TokenKind::SymbolComma => "','",
            TokenKind::SymbolDot => "'.'",
            TokenKind::SymbolBackslash => "'\\'",
            TokenKind::OperatorMaybe => "maybe operator",
            TokenKind::OperatorIntersection => "intersection operator",
            TokenKind::OperatorUnion => "union operator",
            TokenKind::OperatorLength => "length operator",
            TokenKind::OperatorString => "string operator",
            TokenKind::OperatorMultiply => "multiply operator",
            TokenKind::OperatorDivide => "divide operator",
            TokenKind::OperatorQuotient => "quotient operator",
            TokenKind::OperatorRemainder => "remainder operator",
            TokenKind::OperatorAdd => "add operator",
            TokenKind::OperatorSubtract => "subtract operator",
            TokenKind::OperatorRange => "range operator",
            TokenKind::OperatorCompare => "compare operator",
            TokenKind::OperatorLess => "less than operator",
            TokenKind::OperatorLessEqual => "less than or equal operator",
            TokenKind::OperatorGreater => "greater than operator",
            TokenKind::OperatorGreaterEqual => "greater than or equal operator",
            TokenKind::OperatorMatch => "match operator",
            TokenKind::OperatorNotMatch => "not match operator",
            TokenKind::OperatorEqual => "equal operator",
            TokenKind::OperatorNotEqual => "not equal operator",
            TokenKind::OperatorIdentical => "identical operator",
            TokenKind::OperatorNotIdentical => "not identical operator",
            TokenKind::OperatorLogicNot => "logic not operator",
            TokenKind::OperatorLogicAnd => "logic and operator",
            TokenKind::OperatorLogicOr => "logic or operator",
            TokenKind::OperatorAssign => "assign operator",
            TokenKind::KeywordDef => "'def'",
            TokenKind::KeywordDo => "'do'",
            TokenKind::KeywordEcho => "'echo'",
            TokenKind::KeywordElse => "'else'",
            TokenKind::KeywordFalse => "'false'",
            TokenKind::KeywordFor => "'for'",
            TokenKind::KeywordIf => "'if'",
            TokenKind::KeywordIn => "'in'",
            TokenKind::KeywordNothing => "'nothing'",
            TokenKind::KeywordThen => "'then'",
            TokenKind::KeywordTrue => "'true'",
            TokenKind::KeywordUntil => "'until'",
            TokenKind::KeywordWhile => "'while'",
            TokenKind::Identifier => "identifier",
            TokenKind::LiteralInt => "int literal",
            TokenKind::LiteralReal => "real literal",
            TokenKind::LiteralRune => "rune literal",
            TokenKind::LiteralString => "string literal",
            TokenKind::LiteralRegex => "regex literal",
        };
        f.write_str(name)
    }
}

/// A token: its kind, the text it carries, and where it starts.
///
/// `text` is non-empty only for kinds whose lexeme carries information
/// (identifiers, literals, comments); punctuation and keywords carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location) -> Self {
        Token {
            kind,
            text: String::new(),
            location,
        }
    }

    pub fn with_text(kind: TokenKind, text: impl Into<String>, location: Location) -> Self {
        Token {
            kind,
            text: text.into(),
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{} at {}", self.kind, self.location)
        } else {
            write!(f, "{} \"{}\" at {}", self.kind, self.text, self.location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_text() {
        let plain = Token::new(TokenKind::KeywordEcho, Location::new(0, 0));
        assert_eq!(plain.to_string(), "'echo' at line 1, col 1");
        let ident = Token::with_text(TokenKind::Identifier, "count", Location::new(2, 4));
        assert_eq!(ident.to_string(), "identifier \"count\" at line 3, col 5");
    }
}
