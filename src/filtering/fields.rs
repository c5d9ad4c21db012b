//! Field metadata used to decide how a filter key is compared.
//!
//! Every filterable entity exposes a [`FieldTable`]: a static list of its
//! columns and associations with their [`FieldKind`]. The table can be written
//! by hand or read off a Sea-ORM entity with [`FieldTable::from_entity`].

use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable};

/// Comparison class of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Text column, filtered with a substring match
    String,
    /// Integer column, filtered by equality or id list
    Integer,
    /// Relation to another entity, compared through its foreign key like an integer
    Association,
    /// Any other mapped column (boolean, date, decimal, ...), filtered by equality
    Scalar,
    /// Not present in the metadata
    Unknown,
}

impl FieldKind {
    /// Classify a Sea-ORM column type.
    #[must_use]
    pub fn from_column_type(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => Self::String,
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => Self::Integer,
            _ => Self::Scalar,
        }
    }

    /// Associations compare like integers.
    #[must_use]
    pub const fn is_integer_like(self) -> bool {
        matches!(self, Self::Integer | Self::Association)
    }
}

/// A resolved filter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Read access to an entity's field metadata.
pub trait EntityMetadata {
    /// Whether `name` is a scalar column of the entity.
    fn has_field(&self, name: &str) -> bool;

    /// Comparison class of a scalar column, `None` when it doesn't exist.
    fn field_type(&self, name: &str) -> Option<FieldKind>;

    /// Whether `name` is a relation of the entity.
    fn has_association(&self, name: &str) -> bool;

    /// Database column backing a field or association.
    fn column_name(&self, name: &str) -> Option<String> {
        (self.has_field(name) || self.has_association(name)).then(|| name.to_string())
    }
}

/// Resolve a filter key against entity metadata.
///
/// Scalar fields are looked up first, then associations. Anything else comes
/// back as [`FieldKind::Unknown`]; callers decide whether an unknown key is a
/// nested path or should be dropped.
pub fn resolve<M: EntityMetadata + ?Sized>(metadata: &M, key: &str) -> FieldDescriptor {
    let kind = if let Some(kind) = metadata.field_type(key) {
        kind
    } else if metadata.has_association(key) {
        FieldKind::Association
    } else {
        FieldKind::Unknown
    };

    FieldDescriptor {
        name: key.to_string(),
        kind,
    }
}

/// Whether `key` names an existing field or association.
pub fn field_exists<M: EntityMetadata + ?Sized>(metadata: &M, key: &str) -> bool {
    metadata.has_field(key) || metadata.has_association(key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldDef {
    name: String,
    kind: FieldKind,
    column: String,
}

/// Static field table for one entity.
///
/// ```rust,ignore
/// let fields = FieldTable::new()
///     .integer("id")
///     .string("name")
///     .scalar("updated_at")
///     .association("owner", "owner_id");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    fields: Vec<FieldDef>,
    associations: Vec<FieldDef>,
}

impl FieldTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the scalar part of the table from a Sea-ORM entity's columns.
    #[must_use]
    pub fn from_entity<E: EntityTrait>() -> Self {
        E::Column::iter().fold(Self::new(), |table, column| {
            let kind = FieldKind::from_column_type(column.def().get_column_type());
            table.field(column.as_str(), kind)
        })
    }

    /// Register a scalar field. A second registration of the same name replaces the first.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        self.fields.retain(|def| def.name != name);
        self.fields.push(FieldDef {
            column: name.clone(),
            name,
            kind,
        });
        self
    }

    #[must_use]
    pub fn string(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::String)
    }

    #[must_use]
    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Integer)
    }

    #[must_use]
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Scalar)
    }

    /// Register a relation filtered through its foreign key column.
    #[must_use]
    pub fn association(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let name = name.into();
        self.associations.retain(|def| def.name != name);
        self.associations.push(FieldDef {
            name,
            kind: FieldKind::Association,
            column: column.into(),
        });
        self
    }

    /// All entries, scalar fields first.
    pub fn descriptors(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        self.fields
            .iter()
            .chain(&self.associations)
            .map(|def| FieldDescriptor {
                name: def.name.clone(),
                kind: def.kind,
            })
    }
}

impl EntityMetadata for FieldTable {
    fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|def| def.name == name)
    }

    fn field_type(&self, name: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|def| def.name == name)
            .map(|def| def.kind)
    }

    fn has_association(&self, name: &str) -> bool {
        self.associations.iter().any(|def| def.name == name)
    }

    fn column_name(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .chain(&self.associations)
            .find(|def| def.name == name)
            .map(|def| def.column.clone())
    }
}
