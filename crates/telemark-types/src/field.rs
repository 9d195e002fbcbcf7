//! Qualified field keys used by partition synopses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Type;

/// Identifies one leaf field of one layout.
///
/// `layout_name` is the name of the top-level record (e.g. `conn`);
/// `field_name` is the dotted path from the record root to the leaf
/// (e.g. `id.orig_h`). Together they form the fully-qualified name
/// `conn.id.orig_h` that field extractors match by suffix.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QualifiedField {
    layout_name: String,
    field_name: String,
    ty: Type,
}

impl QualifiedField {
    pub fn new(
        layout_name: impl Into<String>,
        field_name: impl Into<String>,
        ty: Type,
    ) -> Self {
        Self {
            layout_name: layout_name.into(),
            field_name: field_name.into(),
            ty,
        }
    }

    /// Derive the qualified fields of a whole layout, one per leaf field.
    #[must_use]
    pub fn from_layout(layout: &Type) -> Vec<Self> {
        layout
            .flatten()
            .into_iter()
            .map(|(path, ty)| Self::new(layout.name(), path, ty.clone()))
            .collect()
    }

    #[must_use]
    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }

    /// The fully-qualified dotted name, `layout.path.to.leaf`.
    #[must_use]
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.layout_name, self.field_name)
    }
}

impl fmt::Display for QualifiedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.layout_name, self.field_name)
    }
}
