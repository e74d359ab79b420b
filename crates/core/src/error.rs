//! Diagnostic errors shared by every stage of the interpreter.
//!
//! Each stage reports errors with a kind, a message and the source location
//! the error points at. Fallible operations return [`Result`]; nothing in
//! the interpreter panics on malformed input.

use crate::location::Location;
use std::fmt;

/// The kind of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed source, misaligned indentation, unexpected token.
    Syntax,
    /// Literal text cannot be parsed in the expected form.
    ValueMismatch,
    /// A numeric literal or conversion result exceeds the legal range.
    ValueOverflow,
    /// The type resolver cannot satisfy an expected relationship.
    TypeMismatch,
    /// The type resolver cannot infer a type that was required.
    TypeUnresolved,
    /// Operand types forbid selecting a bytecode variant.
    Compiler,
    /// A well-formed construct whose backend implementation is a known gap.
    Unimplemented,
    /// The value stack cannot grow any further.
    StackOverflow,
    /// An instruction popped from an empty value stack.
    StackUnderflow,
    /// Integer division or remainder with a zero divisor.
    DivisionByZero,
    /// A real-to-int conversion was applied to NaN.
    Conversion,
    /// Invalid UTF-8 at string construction.
    Str,
}

impl ErrorKind {
    /// The name used when the diagnostic is reported.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::ValueMismatch => "ValueMismatchError",
            ErrorKind::ValueOverflow => "ValueOverflowError",
            ErrorKind::TypeMismatch => "TypeMismatchError",
            ErrorKind::TypeUnresolved => "TypeUnresolvedError",
            ErrorKind::Compiler => "CompilerError",
            ErrorKind::Unimplemented => "UnimplementedError",
            ErrorKind::StackOverflow => "StackOverflowError",
            ErrorKind::StackUnderflow => "StackUnderflowError",
            ErrorKind::DivisionByZero => "DivisionByZeroError",
            ErrorKind::Conversion => "ConversionError",
            ErrorKind::Str => "StringError",
        }
    }

    /// Whether this kind aborts a running virtual machine.
    pub fn is_runtime(self) -> bool {
        matches!(
            self,
            ErrorKind::StackOverflow
                | ErrorKind::StackUnderflow
                | ErrorKind::DivisionByZero
                | ErrorKind::Conversion
                | ErrorKind::ValueMismatch
                | ErrorKind::ValueOverflow
                | ErrorKind::Str
        )
    }
}

/// A diagnostic with a kind, a message and an optional source location.
///
/// Locations are attached at the first point that knows them: a value
/// constructor reports without a location and the lexer, parser or VM adds
/// the location of the offending lexeme or byte via [`Error::at`].
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl Error {
    pub fn new(kind: ErrorKind, location: Location, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            location: Some(location),
        }
    }

    /// An error whose location is not known yet.
    pub fn bare(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location if the error does not carry one already.
    pub fn at(mut self, location: Location) -> Self {
        self.location.get_or_insert(location);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} at {}: {}", self.kind.name(), location, self.message),
            None => write!(f, "{}: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
