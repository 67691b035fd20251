//! Relationship metadata.
//!
//! Relationships are declared once per model and stored on its schema. The
//! loader reads this metadata to issue one batched secondary query per
//! relationship instead of one per owner row.

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: `User` has one `Profile` (key lives on the related table).
    OneToOne,
    /// Many-to-one: many `Post`s belong to one `User` (key lives on the owner).
    #[default]
    ManyToOne,
    /// One-to-many: one `User` has many `Post`s.
    OneToMany,
}

impl RelationshipKind {
    /// How many related values each owner receives.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        match self {
            RelationshipKind::OneToMany => Cardinality::Many,
            RelationshipKind::OneToOne | RelationshipKind::ManyToOne => Cardinality::One,
        }
    }

    /// Whether the correlating column lives on the owner table.
    #[must_use]
    pub const fn key_on_owner(&self) -> bool {
        matches!(self, RelationshipKind::ManyToOne)
    }
}

/// Number of related values attached to each owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// First match, or the zero value when nothing matches.
    One,
    /// Every match in result order, possibly empty.
    Many,
}

/// Metadata about a relationship between models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship, used with `Query::with`.
    pub name: String,

    /// Type name of the related model.
    pub related_type: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Column on the owner table whose value is matched.
    ///
    /// Defaults to the owner's primary key for one-to-one/one-to-many and to
    /// `<related>_id` for many-to-one.
    pub local_key: Option<String>,

    /// Column on the related table that is matched against `local_key`.
    ///
    /// Defaults to `<owner>_id` for one-to-one/one-to-many and to the related
    /// primary key for many-to-one.
    pub remote_key: Option<String>,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        related_type: &'static str,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name: name.into(),
            related_type,
            kind,
            local_key: None,
            remote_key: None,
        }
    }

    /// Set the owner-side column.
    #[must_use]
    pub fn local_key(mut self, key: impl Into<String>) -> Self {
        self.local_key = Some(key.into());
        self
    }

    /// Set the related-side column.
    #[must_use]
    pub fn remote_key(mut self, key: impl Into<String>) -> Self {
        self.remote_key = Some(key.into());
        self
    }

    /// Cardinality implied by the kind.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.kind.cardinality()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_kind_default() {
        assert_eq!(RelationshipKind::default(), RelationshipKind::ManyToOne);
    }

    #[test]
    fn test_relationship_info_builder_chain() {
        let info = RelationshipInfo::new("author", "User", RelationshipKind::ManyToOne)
            .local_key("author_id")
            .remote_key("id");

        assert_eq!(info.name, "author");
        assert_eq!(info.related_type, "User");
        assert_eq!(info.local_key.as_deref(), Some("author_id"));
        assert_eq!(info.remote_key.as_deref(), Some("id"));
        assert_eq!(info.cardinality(), Cardinality::One);
    }

    #[test]
    fn test_cardinality_per_kind() {
        assert_eq!(RelationshipKind::OneToMany.cardinality(), Cardinality::Many);
        assert_eq!(RelationshipKind::OneToOne.cardinality(), Cardinality::One);
        assert!(RelationshipKind::ManyToOne.key_on_owner());
        assert!(!RelationshipKind::OneToMany.key_on_owner());
    }
}
