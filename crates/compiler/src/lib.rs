//! Frontend and bytecode compiler for the Rill language.
//!
//! The stages live here in pipeline order: [`Source`] owns the text,
//! [`lexer`] turns it into tokens with synthesized indentation delimiters,
//! [`parser`] builds the expression tree, [`resolver`] annotates it with
//! types, and [`codegen`] lowers it to the bytecode executed by the runtime
//! crate. Diagnostics from every stage are collected by a [`Reporter`].

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod literals;
pub mod parser;
pub mod reporter;
pub mod resolver;
pub mod source;
pub mod token;

pub use ast::{Expr, ExprKind, Param, TypeExpr, TypeExprKind};
pub use codegen::Compiler;
pub use lexer::Lexer;
pub use parser::Parser;
pub use reporter::Reporter;
pub use resolver::TypeResolver;
pub use source::Source;
pub use token::{Token, TokenKind};
