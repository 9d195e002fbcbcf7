//! The algebraic type model and schema collections.
//!
//! A [`Type`] is a structural description of event data: a primitive kind or
//! a composite over other types, decorated with an optional display name and
//! an ordered set of string attributes. Two comparison modes exist: full
//! equality (`==`, includes decorations) and [`Type::congruent`], which
//! compares structure only. Per-type synopsis maps key on [`Type::strip`],
//! the recursively undecorated form.

use std::fmt;

use serde::{Deserialize, Serialize};
use telemark_error::{Result, TelemarkError};

/// One named field inside a record type.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordField {
    pub name: String,
    pub ty: Type,
}

impl RecordField {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The structural alternatives of the type model.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TypeKind {
    /// The untyped placeholder; used by type queries that match by name only.
    None,
    Bool,
    /// Signed 64-bit integer.
    Integer,
    /// Unsigned 64-bit integer.
    Count,
    /// IEEE 754 double.
    Real,
    /// A point in time (UTC).
    Time,
    /// A signed time span.
    Duration,
    String,
    Pattern,
    /// An IPv4 or IPv6 address.
    Address,
    /// An IP prefix.
    Subnet,
    /// A transport-layer port.
    Port,
    /// A closed set of named alternatives.
    Enumeration(Vec<String>),
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Record(Vec<RecordField>),
}

impl TypeKind {
    /// Whether values of this kind have a total order usable by range
    /// synopses and ordering comparisons.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Count
                | Self::Real
                | Self::Time
                | Self::Duration
                | Self::String
                | Self::Address
                | Self::Subnet
        )
    }
}

/// A type with its decorations.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Type {
    kind: TypeKind,
    name: Option<String>,
    attributes: Vec<String>,
}

impl Type {
    /// Wrap a structural kind without decorations.
    #[must_use]
    pub const fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: Vec::new(),
        }
    }

    pub const fn none() -> Self {
        Self::new(TypeKind::None)
    }

    pub const fn boolean() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub const fn integer() -> Self {
        Self::new(TypeKind::Integer)
    }

    pub const fn count() -> Self {
        Self::new(TypeKind::Count)
    }

    pub const fn real() -> Self {
        Self::new(TypeKind::Real)
    }

    pub const fn time() -> Self {
        Self::new(TypeKind::Time)
    }

    pub const fn duration() -> Self {
        Self::new(TypeKind::Duration)
    }

    pub const fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub const fn pattern() -> Self {
        Self::new(TypeKind::Pattern)
    }

    pub const fn address() -> Self {
        Self::new(TypeKind::Address)
    }

    pub const fn subnet() -> Self {
        Self::new(TypeKind::Subnet)
    }

    pub const fn port() -> Self {
        Self::new(TypeKind::Port)
    }

    pub fn enumeration(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(TypeKind::Enumeration(
            fields.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn list(element: Type) -> Self {
        Self::new(TypeKind::List(Box::new(element)))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Self::new(TypeKind::Map(Box::new(key), Box::new(value)))
    }

    pub fn record(fields: impl IntoIterator<Item = RecordField>) -> Self {
        Self::new(TypeKind::Record(fields.into_iter().collect()))
    }

    /// Attach or replace the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an attribute; duplicates are ignored.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.attributes.contains(&key) {
            self.attributes.push(key);
        }
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The display name, or `""` when unnamed.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a == key)
    }

    /// Structural comparison ignoring names and attributes at every level.
    #[must_use]
    pub fn congruent(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Enumeration(a), TypeKind::Enumeration(b)) => a == b,
            (TypeKind::List(a), TypeKind::List(b)) => a.congruent(b),
            (TypeKind::Map(ak, av), TypeKind::Map(bk, bv)) => {
                ak.congruent(bk) && av.congruent(bv)
            }
            (TypeKind::Record(a), TypeKind::Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.name == y.name && x.ty.congruent(&y.ty))
            }
            (a, b) => a == b,
        }
    }

    /// The type with names and attributes removed recursively.
    ///
    /// Used as the key of per-type synopsis maps so that decorated variants
    /// of the same structure share one fallback synopsis.
    #[must_use]
    pub fn strip(&self) -> Self {
        let kind = match &self.kind {
            TypeKind::List(e) => TypeKind::List(Box::new(e.strip())),
            TypeKind::Map(k, v) => TypeKind::Map(Box::new(k.strip()), Box::new(v.strip())),
            TypeKind::Record(fields) => TypeKind::Record(
                fields
                    .iter()
                    .map(|f| RecordField::new(f.name.clone(), f.ty.strip()))
                    .collect(),
            ),
            other => other.clone(),
        };
        Self::new(kind)
    }

    /// Enumerate `(fully_qualified_name, type)` pairs of all leaf fields.
    ///
    /// Only meaningful on records; any other kind yields nothing. Nested
    /// records contribute dotted paths (`id.orig_h`).
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, &Type)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Type)>) {
        if let TypeKind::Record(fields) = &self.kind {
            for field in fields {
                let path = if prefix.is_empty() {
                    field.name.clone()
                } else {
                    format!("{prefix}.{}", field.name)
                };
                if matches!(field.ty.kind, TypeKind::Record(_)) {
                    field.ty.flatten_into(&path, out);
                } else {
                    out.push((path, &field.ty));
                }
            }
        }
    }

    /// Look up a field by dotted path.
    ///
    /// Tries path traversal first (`a.b.c` descends through sub-records);
    /// when the first component does not name a sub-record, falls back to a
    /// flat match against a field that itself carries a dotted name.
    #[must_use]
    pub fn at(&self, path: &str) -> Option<&Type> {
        let TypeKind::Record(fields) = &self.kind else {
            return None;
        };
        if let Some((head, rest)) = path.split_once('.') {
            if let Some(sub) = fields
                .iter()
                .find(|f| f.name == head && matches!(f.ty.kind, TypeKind::Record(_)))
            {
                return sub.ty.at(rest);
            }
            // Flat fallback: a field whose stored name already contains dots.
            return fields.iter().find(|f| f.name == path).map(|f| &f.ty);
        }
        fields.iter().find(|f| f.name == path).map(|f| &f.ty)
    }
}

impl From<TypeKind> for Type {
    fn from(kind: TypeKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        match &self.kind {
            TypeKind::None => f.write_str("none"),
            TypeKind::Bool => f.write_str("bool"),
            TypeKind::Integer => f.write_str("int"),
            TypeKind::Count => f.write_str("count"),
            TypeKind::Real => f.write_str("real"),
            TypeKind::Time => f.write_str("time"),
            TypeKind::Duration => f.write_str("duration"),
            TypeKind::String => f.write_str("string"),
            TypeKind::Pattern => f.write_str("pattern"),
            TypeKind::Address => f.write_str("addr"),
            TypeKind::Subnet => f.write_str("subnet"),
            TypeKind::Port => f.write_str("port"),
            TypeKind::Enumeration(fields) => {
                write!(f, "enum {{{}}}", fields.join(", "))
            }
            TypeKind::List(e) => write!(f, "list<{e}>"),
            TypeKind::Map(k, v) => write!(f, "map<{k}, {v}>"),
            TypeKind::Record(fields) => {
                f.write_str("record {")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// An ordered collection of named top-level types.
///
/// Produced by the schema loader in the ingestion path; the meta-index never
/// consumes a full schema directly, only the qualified fields derived from
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    types: Vec<Type>,
}

impl Schema {
    #[must_use]
    pub const fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Add a named type. Returns `false` when the type is unnamed, the none
    /// type, or a type of that name already exists.
    pub fn add(&mut self, ty: Type) -> bool {
        if matches!(ty.kind(), TypeKind::None) || ty.name().is_empty() {
            return false;
        }
        if self.find(ty.name()).is_some() {
            return false;
        }
        self.types.push(ty);
        true
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Type> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Union of two schemas that rejects conflicting duplicates: a name
    /// bound to different types in both inputs is an error.
    pub fn merge(s1: &Self, s2: &Self) -> Result<Self> {
        let mut result = s2.clone();
        for t in &s1.types {
            match s2.find(t.name()) {
                Some(u) if t != u => {
                    return Err(TelemarkError::SchemaClash {
                        name: t.name().to_owned(),
                    });
                }
                Some(_) => {}
                None => result.types.push(t.clone()),
            }
        }
        Ok(result)
    }

    /// Union of two schemas where the right side wins on duplicates.
    #[must_use]
    pub fn combine(s1: &Self, s2: &Self) -> Self {
        let mut result = s1.clone();
        for t in &s2.types {
            if let Some(existing) = result.types.iter_mut().find(|x| x.name() == t.name()) {
                *existing = t.clone();
            } else {
                result.types.push(t.clone());
            }
        }
        result
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Type;
    type IntoIter = std::slice::Iter<'a, Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}
