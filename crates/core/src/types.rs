//! Nominal types used by the resolver and the bytecode compiler.

use std::fmt;

/// The kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Nothing,
    Bool,
    Int,
    Real,
    Rune,
    String,
    Sequence,
    Record,
    Function,
    Type,
    Maybe,
    Intersection,
    Union,
}

impl TypeKind {
    /// The canonical name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Nothing => "Nothing",
            TypeKind::Bool => "Bool",
            TypeKind::Int => "Int",
            TypeKind::Real => "Real",
            TypeKind::Rune => "Rune",
            TypeKind::String => "String",
            TypeKind::Sequence => "Sequence",
            TypeKind::Record => "Record",
            TypeKind::Function => "Function",
            TypeKind::Type => "Type",
            TypeKind::Maybe => "Maybe",
            TypeKind::Intersection => "Intersection",
            TypeKind::Union => "Union",
        }
    }
}

/// A nominal type tag with an optional list of inner types.
///
/// Equality is structural: two types are equal when their kinds match and
/// their inner types are element-wise equal. The display name does not take
/// part in equality.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub name: String,
    pub inner: Vec<Type>,
}

impl Type {
    pub fn new(kind: TypeKind, inner: Vec<Type>) -> Self {
        Type {
            kind,
            name: kind.name().to_string(),
            inner,
        }
    }

    pub fn with_name(kind: TypeKind, name: impl Into<String>, inner: Vec<Type>) -> Self {
        Type {
            kind,
            name: name.into(),
            inner,
        }
    }

    pub fn nothing() -> Self {
        Type::new(TypeKind::Nothing, Vec::new())
    }

    pub fn bool() -> Self {
        Type::new(TypeKind::Bool, Vec::new())
    }

    pub fn int() -> Self {
        Type::new(TypeKind::Int, Vec::new())
    }

    pub fn real() -> Self {
        Type::new(TypeKind::Real, Vec::new())
    }

    pub fn rune() -> Self {
        Type::new(TypeKind::Rune, Vec::new())
    }

    pub fn string() -> Self {
        Type::new(TypeKind::String, Vec::new())
    }

    pub fn sequence() -> Self {
        Type::new(TypeKind::Sequence, Vec::new())
    }

    pub fn record() -> Self {
        Type::new(TypeKind::Record, Vec::new())
    }

    pub fn function() -> Self {
        Type::new(TypeKind::Function, Vec::new())
    }

    pub fn is(&self, kind: TypeKind) -> bool {
        self.kind == kind
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.inner == other.inner
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.inner.is_empty() {
            write!(f, "[")?;
            for (i, inner) in self.inner.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{inner}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
