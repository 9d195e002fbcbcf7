//! Expression AST node types for Telemark queries.
//!
//! The parser (outside this crate) produces normalised trees: no double
//! negations, predicate right-hand sides hold the literal, and combinators
//! have at least one child. Consumers dispatch structurally on the nodes;
//! there is no visitor hierarchy.

mod display;

use telemark_types::{Data, RelOp, Type};

/// The left-hand side of a predicate: what to extract from an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    /// A query over event metadata rather than event data (`#type`,
    /// `#field`).
    Meta(MetaKind),
    /// Matches any field whose fully-qualified name ends with the given
    /// suffix (`orig_h`, `id.orig_h`, `conn.id.orig_h`).
    Field(String),
    /// Matches any field of a given type (`:addr`); see the meta-index for
    /// the named/unnamed matching modes.
    Type(Type),
    /// A fully resolved column reference produced by the parser when layout
    /// and position are already known.
    Column {
        layout: String,
        column: usize,
        ty: Type,
    },
}

impl Extractor {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub const fn meta_type() -> Self {
        Self::Meta(MetaKind::Type)
    }

    #[must_use]
    pub const fn meta_field() -> Self {
        Self::Meta(MetaKind::Field)
    }
}

/// The kind of metadata a [`Extractor::Meta`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    /// The layout (top-level record type) name.
    Type,
    /// The existence of a field by name suffix.
    Field,
}

/// A relational comparison between an extractor and a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub lhs: Extractor,
    pub op: RelOp,
    pub rhs: Data,
}

impl Predicate {
    pub fn new(lhs: Extractor, op: RelOp, rhs: impl Into<Data>) -> Self {
        Self {
            lhs,
            op,
            rhs: rhs.into(),
        }
    }
}

/// A boolean query expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expression {
    Conjunction(Vec<Expression>),
    Disjunction(Vec<Expression>),
    Negation(Box<Expression>),
    Predicate(Predicate),
    /// The empty expression. Reaching the meta-index with a nil node is a
    /// caller bug and reported as an invalid expression.
    #[default]
    Nil,
}

impl Expression {
    pub fn conjunction(children: impl IntoIterator<Item = Expression>) -> Self {
        Self::Conjunction(children.into_iter().collect())
    }

    pub fn disjunction(children: impl IntoIterator<Item = Expression>) -> Self {
        Self::Disjunction(children.into_iter().collect())
    }

    #[must_use]
    pub fn negation(child: Expression) -> Self {
        Self::Negation(Box::new(child))
    }

    pub fn predicate(lhs: Extractor, op: RelOp, rhs: impl Into<Data>) -> Self {
        Self::Predicate(Predicate::new(lhs, op, rhs))
    }

    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

impl From<Predicate> for Expression {
    fn from(p: Predicate) -> Self {
        Self::Predicate(p)
    }
}
