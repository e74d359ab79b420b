//! The expression tree.
//!
//! Expressions and type expressions are tagged sum types: one enum variant
//! per form and a single `match` wherever they are walked, so every walker
//! is checked for exhaustiveness. Each node carries its source location and
//! a slot for the type the resolver assigns.

use crate::token::{Token, TokenKind};
use rill_core::{Location, Type, Value};

/// A function parameter: a name and its declared type.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Token,
    pub ty: TypeExpr,
}

/// An expression node: the form, where it starts, and the resolved type
/// once the resolver has run.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
    pub resolved: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Expr {
            kind,
            location,
            resolved: None,
        }
    }

    /// Whether the resolver assigned this node the given type kind.
    pub fn has_type(&self, kind: rill_core::TypeKind) -> bool {
        self.resolved.as_ref().is_some_and(|ty| ty.kind == kind)
    }
}

/// The forms an expression can take.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal value.
    Literal(Value),
    /// A bare name.
    Name { name: Token },
    /// `[a, b, c]`
    Sequence { token: Token, items: Vec<Expr> },
    /// `{ key: value, … }`, keys in source order.
    Record { token: Token, items: Vec<(String, Expr)> },
    /// A lambda or the right-hand side of a function def.
    Function {
        token: Token,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Box<Expr>,
    },
    /// `( inner )`
    Grouped { inner: Box<Expr> },
    /// `callee(args…)`
    Call {
        callee: Box<Expr>,
        token: Token,
        args: Vec<Expr>,
    },
    /// `object.name`
    Get { object: Box<Expr>, name: Token },
    /// A prefix operator application.
    Unary { op: TokenKind, right: Box<Expr> },
    /// An infix operator application.
    Binary {
        left: Box<Expr>,
        op: TokenKind,
        right: Box<Expr>,
    },
    /// `echo inner`
    Echo { inner: Box<Expr> },
    /// `if condition then … (else …)?`
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    /// `for name in iterable do body`
    For {
        name: Token,
        iterable: Box<Expr>,
        body: Box<Expr>,
    },
    /// `while condition do body`
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    /// `until condition do body`
    Until {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    /// A run of lines at one indentation level.
    Block { exprs: Vec<Expr> },
    /// `def name (: type)? = value`, with any doc comment that preceded it.
    Def {
        name: Token,
        ty: Option<TypeExpr>,
        value: Box<Expr>,
        doc: Option<String>,
    },
}

/// A type expression node.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub location: Location,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, location: Location) -> Self {
        TypeExpr { kind, location }
    }
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// A named type.
    Name { name: Token },
    /// `( type )`
    Grouped { inner: Box<TypeExpr> },
    /// `Base[arg, …]`
    Generic {
        base: Box<TypeExpr>,
        args: Vec<TypeExpr>,
    },
    /// `type?`
    Maybe { base: Box<TypeExpr> },
    /// `left & right`
    Intersection {
        left: Box<TypeExpr>,
        right: Box<TypeExpr>,
    },
    /// `left | right`
    Union {
        left: Box<TypeExpr>,
        right: Box<TypeExpr>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::TypeKind;

    #[test]
    fn test_resolved_slot_starts_empty() {
        let expr = Expr::new(ExprKind::Literal(Value::NOTHING), Location::default());
        assert!(expr.resolved.is_none());
        assert!(!expr.has_type(TypeKind::Nothing));
    }

    #[test]
    fn test_has_type_checks_the_kind() {
        let mut expr = Expr::new(ExprKind::Literal(Value::TRUE), Location::default());
        expr.resolved = Some(Type::bool());
        assert!(expr.has_type(TypeKind::Bool));
        assert!(!expr.has_type(TypeKind::Int));
    }
}
