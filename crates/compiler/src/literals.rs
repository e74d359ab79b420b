//! Decoding of literal token text.
//!
//! The lexer captures literal text verbatim (minus the delimiters); the
//! parser calls into this module to turn that text into values. Syntax
//! problems report `ValueMismatch`, range problems `ValueOverflow`.

use rill_core::{Error, ErrorKind, Result};
use std::num::IntErrorKind;

/// Which quote form a literal used, which decides the quote escape it may
/// contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// Rune literals: `\'` is valid, `\"` is not.
    Single,
    /// String literals: `\"` is valid, `\'` is not.
    Double,
}

/// Parse an int literal: decimal or `0x`/`0X` hexadecimal, with `_`
/// thousand separators.
pub fn parse_int(text: &str) -> Result<i64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    };
    parsed.map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::bare(
            ErrorKind::ValueOverflow,
            format!("The int literal '{text}' does not fit in an int value"),
        ),
        _ => Error::bare(
            ErrorKind::ValueMismatch,
            format!("Invalid int literal '{text}'"),
        ),
    })
}

/// Parse a real literal, with `_` thousand separators.
pub fn parse_real(text: &str) -> Result<f64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    digits.parse::<f64>().map_err(|_| {
        Error::bare(
            ErrorKind::ValueMismatch,
            format!("Invalid real literal '{text}'"),
        )
    })
}

/// Decode a rune literal body to its single code point.
pub fn parse_rune(text: &str) -> Result<char> {
    let decoded = unescape(text, QuoteKind::Single)?;
    let mut chars = decoded.chars();
    let Some(rune) = chars.next() else {
        return Err(Error::bare(
            ErrorKind::ValueMismatch,
            "Missing code point in rune literal",
        ));
    };
    if chars.next().is_some() {
        return Err(Error::bare(
            ErrorKind::ValueMismatch,
            "Unexpected extra code point(s) in rune literal",
        ));
    }
    Ok(rune)
}

/// Decode the escape sequences in a literal body.
///
/// Recognized escapes: `\\`, the matching quote (`\"` or `\'`), `\b`, `\f`,
/// `\n`, `\r`, `\t`, and `\u{H…}` with one to six hex digits.
pub fn unescape(text: &str, quote: QuoteKind) -> Result<String> {
    let mut decoded = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(Error::bare(
                ErrorKind::ValueMismatch,
                "Invalid escape sequence '\\' at end of literal",
            ));
        };
        match escape {
            '\\' => decoded.push('\\'),
            '"' if quote == QuoteKind::Double => decoded.push('"'),
            '\'' if quote == QuoteKind::Single => decoded.push('\''),
            'b' => decoded.push('\u{0008}'),
            'f' => decoded.push('\u{000c}'),
            'n' => decoded.push('\n'),
            'r' => decoded.push('\r'),
            't' => decoded.push('\t'),
            'u' => decoded.push(unescape_unicode(&mut chars)?),
            other => {
                return Err(Error::bare(
                    ErrorKind::ValueMismatch,
                    format!("Invalid escape sequence '\\{other}'"),
                ));
            }
        }
    }
    Ok(decoded)
}

/// Decode the `{H…}` tail of a `\u` escape.
fn unescape_unicode(chars: &mut std::str::Chars<'_>) -> Result<char> {
    if chars.next() != Some('{') {
        return Err(Error::bare(
            ErrorKind::ValueMismatch,
            "Expected '{' after '\\u' escape",
        ));
    }
    let mut digits = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            if digits.is_empty() || digits.len() > 6 {
                break;
            }
            let code = u32::from_str_radix(&digits, 16).map_err(|_| {
                Error::bare(
                    ErrorKind::ValueMismatch,
                    format!("Invalid unicode escape '\\u{{{digits}}}'"),
                )
            })?;
            return char::from_u32(code).ok_or_else(|| {
                Error::bare(
                    ErrorKind::ValueOverflow,
                    format!("The rune U+{code:06X} exceeds the valid rune range"),
                )
            });
        }
        digits.push(c);
        if digits.len() > 6 {
            break;
        }
    }
    Err(Error::bare(
        ErrorKind::ValueMismatch,
        "Expected one to six hex digits in '\\u{…}' escape",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_decimal() {
        assert_eq!(parse_int("0").unwrap(), 0);
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-17").unwrap(), -17);
        assert_eq!(parse_int("1_000_000").unwrap(), 1_000_000);
    }

    #[test]
    fn test_parse_int_hex() {
        assert_eq!(parse_int("0x10").unwrap(), 16);
        assert_eq!(parse_int("0XfF").unwrap(), 255);
        assert_eq!(parse_int("0xFFFF_FFFF_FFFF").unwrap(), (1 << 48) - 1);
    }

    #[test]
    fn test_parse_int_errors() {
        let err = parse_int("99999999999999999999999999").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOverflow);
        let err = parse_int("x1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("1.5").unwrap(), 1.5);
        assert_eq!(parse_real("-0.25").unwrap(), -0.25);
        assert_eq!(parse_real("2e3").unwrap(), 2000.0);
        assert_eq!(parse_real("1_000.5").unwrap(), 1000.5);
        assert!(parse_real("abc").is_err());
    }

    #[test]
    fn test_unescape_simple_escapes() {
        let decoded = unescape(r"a\tb\nc\\", QuoteKind::Double).unwrap();
        assert_eq!(decoded, "a\tb\nc\\");
        let decoded = unescape(r#"say \"hi\""#, QuoteKind::Double).unwrap();
        assert_eq!(decoded, "say \"hi\"");
        let decoded = unescape(r"it\'s", QuoteKind::Single).unwrap();
        assert_eq!(decoded, "it's");
    }

    #[test]
    fn test_unescape_quote_kind_mismatch() {
        assert!(unescape(r"\'", QuoteKind::Double).is_err());
        assert!(unescape(r#"\""#, QuoteKind::Single).is_err());
    }

    #[test]
    fn test_unescape_unicode() {
        assert_eq!(unescape(r"\u{41}", QuoteKind::Double).unwrap(), "A");
        assert_eq!(unescape(r"\u{1F600}", QuoteKind::Double).unwrap(), "😀");
        assert_eq!(unescape(r"\u{0}", QuoteKind::Double).unwrap(), "\0");
    }

    #[test]
    fn test_unescape_unicode_errors() {
        assert!(unescape(r"\u{}", QuoteKind::Double).is_err());
        assert!(unescape(r"\u{1234567}", QuoteKind::Double).is_err());
        assert!(unescape(r"\u41", QuoteKind::Double).is_err());
        let err = unescape(r"\u{D800}", QuoteKind::Double).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOverflow);
        let err = unescape(r"\u{110000}", QuoteKind::Double).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOverflow);
    }

    #[test]
    fn test_unescape_invalid_escape() {
        let err = unescape(r"\q", QuoteKind::Double).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
    }

    #[test]
    fn test_parse_rune() {
        assert_eq!(parse_rune("A").unwrap(), 'A');
        assert_eq!(parse_rune(r"\n").unwrap(), '\n');
        assert_eq!(parse_rune(r"\u{1F600}").unwrap(), '😀');
        assert!(parse_rune("").is_err());
        assert!(parse_rune("ab").is_err());
    }
}
