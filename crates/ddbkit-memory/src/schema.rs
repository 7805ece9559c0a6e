//! Table and index key schemas.

use ddbkit_model::types::ScalarAttributeType;

/// A single key attribute definition with its name and scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    /// The attribute name.
    pub name: String,
    /// The scalar type (S, N, or B).
    pub attr_type: ScalarAttributeType,
}

impl KeyAttribute {
    /// A key attribute of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }

    /// A string key attribute.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ScalarAttributeType::S)
    }

    /// A number key attribute.
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ScalarAttributeType::N)
    }

    /// A binary key attribute.
    #[must_use]
    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, ScalarAttributeType::B)
    }
}

/// Partition key plus optional sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (HASH) key name and type.
    pub partition_key: KeyAttribute,
    /// Optional sort (RANGE) key name and type.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Returns `true` if `name` is one of this schema's key attributes.
    #[must_use]
    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.partition_key.name == name || self.sort_key.as_ref().is_some_and(|sk| sk.name == name)
    }

    /// Number of key attributes (1 or 2).
    #[must_use]
    pub fn len(&self) -> usize {
        1 + usize::from(self.sort_key.is_some())
    }

    /// Always `false`: a schema has at least a partition key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A global secondary index projecting all attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalIndex {
    /// Index name.
    pub name: String,
    /// Index key schema.
    pub key_schema: KeySchema,
}

/// Everything the memory store needs to know about a table.
///
/// ```
/// use ddbkit_memory::{KeyAttribute, TableDefinition};
///
/// let table = TableDefinition::new("Widget", KeyAttribute::string("ID")).with_global_index(
///     "WidgetGroup-WidgetId-index",
///     KeyAttribute::string("WidgetGroup"),
///     Some(KeyAttribute::string("WidgetId")),
/// );
/// assert!(table.index("WidgetGroup-WidgetId-index").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Primary key schema.
    pub key_schema: KeySchema,
    /// Global secondary indexes.
    pub global_indexes: Vec<GlobalIndex>,
}

impl TableDefinition {
    /// A table keyed by `partition_key` only.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            name: name.into(),
            key_schema: KeySchema {
                partition_key,
                sort_key: None,
            },
            global_indexes: Vec::new(),
        }
    }

    /// Add a sort key to the primary key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.key_schema.sort_key = Some(sort_key);
        self
    }

    /// Add a global secondary index.
    #[must_use]
    pub fn with_global_index(
        mut self,
        name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Self {
        self.global_indexes.push(GlobalIndex {
            name: name.into(),
            key_schema: KeySchema {
                partition_key,
                sort_key,
            },
        });
        self
    }

    /// Look up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&GlobalIndex> {
        self.global_indexes.iter().find(|idx| idx.name == name)
    }
}
