//! Type resolution.
//!
//! Walks the expression tree and fills each node's resolved-type slot from
//! the literal and operator rules. Names, calls, gets and the control-flow
//! forms stay unresolved here; the bytecode compiler reports its own error
//! when an operand it needs has no type, and [`TypeResolver::resolve_strict`]
//! reports when the caller demanded a fully typed root.

use crate::ast::{Expr, ExprKind};
use crate::reporter::Reporter;
use crate::token::TokenKind;
use rill_core::{Error, ErrorKind, Heap, Type, TypeKind};

pub struct TypeResolver<'a> {
    reporter: &'a mut Reporter,
    heap: &'a Heap,
}

impl<'a> TypeResolver<'a> {
    pub fn new(reporter: &'a mut Reporter, heap: &'a Heap) -> Self {
        TypeResolver { reporter, heap }
    }

    /// Resolve and require a type on the root, reporting
    /// `TypeUnresolvedError` if none could be inferred.
    pub fn resolve_strict(&mut self, expr: &mut Expr) {
        self.resolve(expr);
        if expr.resolved.is_none() {
            self.reporter.report(Error::new(
                ErrorKind::TypeUnresolved,
                expr.location,
                "Could not infer the type of the expression",
            ));
        }
    }

    /// Resolve the type of an expression and its children.
    pub fn resolve(&mut self, expr: &mut Expr) {
        let resolved = match &mut expr.kind {
            ExprKind::Literal(value) => Some(value.type_of(self.heap)),

            ExprKind::Grouped { inner } => {
                self.resolve(inner);
                inner.resolved.clone()
            }

            ExprKind::Block { exprs } => {
                for sub in exprs.iter_mut() {
                    self.resolve(sub);
                }
                exprs.last().and_then(|last| last.resolved.clone())
            }

            ExprKind::Def { value, .. } => {
                self.resolve(value);
                value.resolved.clone()
            }

            ExprKind::Echo { inner } => {
                self.resolve(inner);
                Some(Type::nothing())
            }

            ExprKind::Unary { op, right } => {
                self.resolve(right);
                Self::unary_type(*op, right)
            }

            ExprKind::Binary { left, op, right } => {
                self.resolve(left);
                self.resolve(right);
                Self::binary_type(*op, left, right)
            }

            ExprKind::Sequence { items, .. } => {
                for item in items.iter_mut() {
                    self.resolve(item);
                }
                Some(Self::sequence_type(items))
            }

            ExprKind::Record { items, .. } => {
                for (_, item) in items.iter_mut() {
                    self.resolve(item);
                }
                Some(Type::record())
            }

            ExprKind::Function { body, .. } => {
                self.resolve(body);
                Some(Type::function())
            }

            // Open in the core: children resolve, the node itself does not
            ExprKind::Name { .. } => None,
            ExprKind::Call { callee, args, .. } => {
                self.resolve(callee);
                for arg in args.iter_mut() {
                    self.resolve(arg);
                }
                None
            }
            ExprKind::Get { object, .. } => {
                self.resolve(object);
                None
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve(condition);
                self.resolve(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve(else_branch);
                }
                None
            }
            ExprKind::For { iterable, body, .. } => {
                self.resolve(iterable);
                self.resolve(body);
                None
            }
            ExprKind::While { condition, body } | ExprKind::Until { condition, body } => {
                self.resolve(condition);
                self.resolve(body);
                None
            }
        };
        expr.resolved = resolved;
    }

    fn unary_type(op: TokenKind, right: &Expr) -> Option<Type> {
        match op {
            TokenKind::OperatorSubtract => {
                if right.has_type(TypeKind::Int) {
                    Some(Type::int())
                } else if right.has_type(TypeKind::Real) {
                    Some(Type::real())
                } else {
                    None
                }
            }
            TokenKind::OperatorLength => Some(Type::int()),
            TokenKind::OperatorString => Some(Type::string()),
            // `not` stays open alongside the logic operators
            _ => None,
        }
    }

    fn binary_type(op: TokenKind, left: &Expr, right: &Expr) -> Option<Type> {
        let both = |kind: TypeKind| left.has_type(kind) && right.has_type(kind);
        match op {
            TokenKind::OperatorMultiply
            | TokenKind::OperatorQuotient
            | TokenKind::OperatorRemainder
            | TokenKind::OperatorSubtract => {
                if both(TypeKind::Int) {
                    Some(Type::int())
                } else if both(TypeKind::Real) {
                    Some(Type::real())
                } else {
                    None
                }
            }

            // Integer division promotes to Real
            TokenKind::OperatorDivide => {
                if both(TypeKind::Int) || both(TypeKind::Real) {
                    Some(Type::real())
                } else {
                    None
                }
            }

            TokenKind::OperatorAdd => {
                if both(TypeKind::Int) {
                    Some(Type::int())
                } else if both(TypeKind::Real) {
                    Some(Type::real())
                } else if both(TypeKind::String) {
                    Some(Type::string())
                } else {
                    None
                }
            }

            TokenKind::OperatorCompare => Some(Type::int()),

            TokenKind::OperatorLess
            | TokenKind::OperatorLessEqual
            | TokenKind::OperatorGreater
            | TokenKind::OperatorGreaterEqual
            | TokenKind::OperatorMatch
            | TokenKind::OperatorNotMatch
            | TokenKind::OperatorEqual
            | TokenKind::OperatorNotEqual
            | TokenKind::OperatorIdentical
            | TokenKind::OperatorNotIdentical => Some(Type::bool()),

            // `..`, `and`, `or` have no resolved type in the core
            _ => None,
        }
    }

    /// Element-type inference for sequence literals: when every item
    /// resolved to the same type the sequence carries it as an inner type.
    fn sequence_type(items: &[Expr]) -> Type {
        let mut element: Option<&Type> = None;
        for item in items {
            match (&item.resolved, element) {
                (Some(ty), None) => element = Some(ty),
                (Some(ty), Some(seen)) if ty == seen => {}
                _ => return Type::sequence(),
            }
        }
        match element {
            Some(ty) => Type::new(TypeKind::Sequence, vec![ty.clone()]),
            None => Type::sequence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::source::Source;

    fn resolve(text: &str) -> (Expr, Reporter, Heap) {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(&source).tokenize().unwrap();
        let mut reporter = Reporter::new();
        let mut heap = Heap::new();
        let mut root = Parser::new(tokens, &mut reporter, &mut heap).parse();
        assert!(!reporter.had_error(), "{:?}", reporter.errors());
        TypeResolver::new(&mut reporter, &heap).resolve(&mut root);
        (root, reporter, heap)
    }

    fn line_type(text: &str) -> Option<Type> {
        let (root, _, _) = resolve(text);
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        exprs.into_iter().next().unwrap().resolved
    }

    fn operand_type(text: &str) -> Option<Type> {
        let (root, _, _) = resolve(text);
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        let ExprKind::Echo { inner } = &exprs[0].kind else {
            panic!("expected echo");
        };
        inner.resolved.clone()
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(operand_type("echo nothing"), Some(Type::nothing()));
        assert_eq!(operand_type("echo true"), Some(Type::bool()));
        assert_eq!(operand_type("echo 1"), Some(Type::int()));
        assert_eq!(operand_type("echo 1.5"), Some(Type::real()));
        assert_eq!(operand_type("echo 'a'"), Some(Type::rune()));
        assert_eq!(operand_type(r#"echo "s""#), Some(Type::string()));
    }

    #[test]
    fn test_arithmetic_types() {
        assert_eq!(operand_type("echo 1 + 2"), Some(Type::int()));
        assert_eq!(operand_type("echo 1.0 + 2.0"), Some(Type::real()));
        assert_eq!(operand_type("echo 1 * 2"), Some(Type::int()));
        assert_eq!(operand_type("echo 7 // 2"), Some(Type::int()));
        assert_eq!(operand_type("echo 7 % 2"), Some(Type::int()));
        // integer division promotes
        assert_eq!(operand_type("echo 1 / 2"), Some(Type::real()));
        assert_eq!(operand_type(r#"echo "a" + "b""#), Some(Type::string()));
        // mixed operands stay unresolved
        assert_eq!(operand_type("echo 1 + 2.0"), None);
    }

    #[test]
    fn test_comparison_types() {
        assert_eq!(operand_type("echo 1 <=> 2"), Some(Type::int()));
        assert_eq!(operand_type("echo 1 < 2"), Some(Type::bool()));
        assert_eq!(operand_type("echo 1 == 2"), Some(Type::bool()));
        assert_eq!(operand_type("echo 1 != 2"), Some(Type::bool()));
    }

    #[test]
    fn test_unary_types() {
        assert_eq!(operand_type("echo -(1)"), Some(Type::int()));
        assert_eq!(operand_type("echo -(1.5)"), Some(Type::real()));
        assert_eq!(operand_type(r#"echo #"abc""#), Some(Type::int()));
        assert_eq!(operand_type(r#"echo $"abc""#), Some(Type::string()));
    }

    #[test]
    fn test_echo_and_def_and_block() {
        assert_eq!(line_type("echo 1"), Some(Type::nothing()));
        assert_eq!(line_type("def x = 42"), Some(Type::int()));
        let (root, _, _) = resolve("def a = 1\necho a");
        // block type is the last sub-expression's type
        assert_eq!(root.resolved, Some(Type::nothing()));
    }

    #[test]
    fn test_open_nodes_stay_unresolved() {
        assert_eq!(operand_type("echo name"), None);
        assert_eq!(operand_type("echo 1 .. 5"), None);
        assert_eq!(line_type("if true then 1 else 2"), None);
    }

    #[test]
    fn test_sequence_element_inference() {
        assert_eq!(
            operand_type("echo [1, 2, 3]"),
            Some(Type::new(TypeKind::Sequence, vec![Type::int()]))
        );
        assert_eq!(operand_type("echo [1, 2.0]"), Some(Type::sequence()));
        assert_eq!(operand_type("echo { x: 1 }"), Some(Type::record()));
    }

    #[test]
    fn test_strict_reports_unresolved_root() {
        let source = Source::new("<test>", "name");
        let tokens = Lexer::new(&source).tokenize().unwrap();
        let mut reporter = Reporter::new();
        let mut heap = Heap::new();
        let mut root = Parser::new(tokens, &mut reporter, &mut heap).parse();
        TypeResolver::new(&mut reporter, &heap).resolve_strict(&mut root);
        assert!(reporter.had_error());
        assert_eq!(reporter.errors()[0].kind, ErrorKind::TypeUnresolved);
    }
}
