//! The per-partition collection of synopses.

use std::collections::BTreeMap;

use telemark_types::{Data, QualifiedField, Type};

use crate::synopsis::{Synopsis, SynopsisOptions};

/// All synopses for one sealed partition.
///
/// Built by the ingestion path while a partition is filling, then handed to
/// the meta-index on merge and never mutated afterwards. A field mapped to
/// `None` has no dedicated synopsis but stays visible to `#field` and
/// `#type` meta queries; the per-type map provides a fallback synopsis for
/// such fields, keyed by the field type stripped of names and attributes.
#[derive(Debug, Clone, Default)]
pub struct PartitionSynopsis {
    field_synopses: BTreeMap<QualifiedField, Option<Synopsis>>,
    type_synopses: BTreeMap<Type, Option<Synopsis>>,
}

impl PartitionSynopsis {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            field_synopses: BTreeMap::new(),
            type_synopses: BTreeMap::new(),
        }
    }

    /// Pre-populate entries for every leaf field of a layout, constructing
    /// the synopsis kind appropriate for each field type.
    #[must_use]
    pub fn for_layout(layout: &Type, options: &SynopsisOptions) -> Self {
        let mut result = Self::new();
        for field in QualifiedField::from_layout(layout) {
            let synopsis = Synopsis::for_type(field.ty(), options);
            result.put_field(field, synopsis);
        }
        result
    }

    /// Insert or replace the synopsis of one field.
    pub fn put_field(&mut self, field: QualifiedField, synopsis: Option<Synopsis>) {
        self.field_synopses.insert(field, synopsis);
    }

    /// Insert or replace a per-type fallback synopsis. The key is stored
    /// stripped of names and attributes.
    pub fn put_type(&mut self, ty: &Type, synopsis: Option<Synopsis>) {
        self.type_synopses.insert(ty.strip(), synopsis);
    }

    /// Record one observed value for a field, if that field has a synopsis.
    pub fn observe(&mut self, fqn: &str, value: &Data) {
        for (field, synopsis) in &mut self.field_synopses {
            if field.fqn() == fqn {
                if let Some(synopsis) = synopsis {
                    synopsis.add(value);
                }
                return;
            }
        }
    }

    /// Iterate all `(field, synopsis)` entries.
    pub fn fields(&self) -> impl Iterator<Item = (&QualifiedField, Option<&Synopsis>)> {
        self.field_synopses
            .iter()
            .map(|(field, synopsis)| (field, synopsis.as_ref()))
    }

    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.field_synopses.len()
    }

    /// The fallback synopsis for a field type, if one exists. Missing
    /// entries and entries without a synopsis are both `None`: either way
    /// the caller cannot rule anything out.
    #[must_use]
    pub fn type_synopsis(&self, ty: &Type) -> Option<&Synopsis> {
        self.type_synopses
            .get(&ty.strip())
            .and_then(Option::as_ref)
    }

    /// Sum of the retained bytes of all member synopses.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        let fields: u64 = self
            .field_synopses
            .values()
            .flatten()
            .map(Synopsis::memory_usage)
            .sum();
        let types: u64 = self
            .type_synopses
            .values()
            .flatten()
            .map(Synopsis::memory_usage)
            .sum();
        fields + types
    }
}

#[cfg(test)]
mod tests {
    use telemark_types::{RecordField, RelOp};

    use super::*;

    fn conn_layout() -> Type {
        Type::record([
            RecordField::new("orig_h", Type::address()),
            RecordField::new("orig_p", Type::count()),
            RecordField::new("established", Type::boolean()),
            RecordField::new("tags", Type::list(Type::string())),
        ])
        .with_name("conn")
    }

    #[test]
    fn for_layout_creates_entries_per_leaf() {
        let partition =
            PartitionSynopsis::for_layout(&conn_layout(), &SynopsisOptions::default());
        assert_eq!(partition.num_fields(), 4);
        // The list field gets an entry without a synopsis.
        let list_entry = partition
            .fields()
            .find(|(f, _)| f.field_name() == "tags")
            .unwrap();
        assert!(list_entry.1.is_none());
        let count_entry = partition
            .fields()
            .find(|(f, _)| f.field_name() == "orig_p")
            .unwrap();
        assert!(count_entry.1.is_some());
    }

    #[test]
    fn observe_feeds_the_field_synopsis() {
        let mut partition =
            PartitionSynopsis::for_layout(&conn_layout(), &SynopsisOptions::default());
        partition.observe("conn.orig_p", &Data::Count(80));
        partition.observe("conn.orig_p", &Data::Count(443));
        let (_, synopsis) = partition
            .fields()
            .find(|(f, _)| f.field_name() == "orig_p")
            .unwrap();
        assert_eq!(
            synopsis.unwrap().lookup(RelOp::Equal, &Data::Count(53)),
            Some(false)
        );
    }

    #[test]
    fn type_fallback_is_keyed_by_stripped_type() {
        let mut partition = PartitionSynopsis::new();
        let decorated = Type::time().with_name("timestamp").with_attribute("timestamp");
        let synopsis = Synopsis::for_type(&decorated, &SynopsisOptions::default());
        partition.put_type(&decorated, synopsis);
        // Lookup through a differently decorated but congruent type.
        let other = Type::time().with_name("ts");
        assert!(partition.type_synopsis(&other).is_some());
        assert!(partition.type_synopsis(&Type::count()).is_none());
    }

    #[test]
    fn memory_usage_sums_members() {
        let mut partition =
            PartitionSynopsis::for_layout(&conn_layout(), &SynopsisOptions::default());
        let field_only = partition.memory_usage();
        assert!(field_only > 0);
        partition.put_type(
            &Type::time(),
            Synopsis::for_type(&Type::time(), &SynopsisOptions::default()),
        );
        assert!(partition.memory_usage() > field_only);
    }
}
