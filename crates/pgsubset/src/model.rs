//! Schema metadata as seen by the dump: columns, keys, and the export closure.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use pgsubset_sql::Name;

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Key used by the nullability cache.
    pub(crate) fn cache_key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Name(&self.table), Name(&self.column))
    }
}

impl From<&ColumnRef> for pgsubset_sql::ColumnRef {
    fn from(col: &ColumnRef) -> Self {
        pgsubset_sql::ColumnRef::qualified(&col.table, &col.column)
    }
}

/// One column mapping within a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnConstraintPair {
    /// The referencing column (child side).
    pub foreign_column: ColumnRef,
    /// The referenced column (parent side).
    pub referenced_column: ColumnRef,
}

/// A foreign key constraint, possibly spanning several columns.
///
/// All pairs share one foreign table and one referenced table. Pair order is
/// the constraint's ordinal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub pairs: Vec<ColumnConstraintPair>,
}

impl ForeignKeyConstraint {
    /// The table the constraint points at.
    pub fn referenced_table(&self) -> Option<&str> {
        self.pairs
            .first()
            .map(|p| p.referenced_column.table.as_str())
    }
}

/// Everything the dump needs to know about one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableMetadata {
    pub name: String,
    /// Columns in ordinal position order.
    pub columns: Vec<ColumnRef>,
    /// Primary key columns in key order.
    pub primary_key: Vec<ColumnRef>,
    /// Non-ignored foreign keys by constraint name.
    pub foreign_keys: IndexMap<String, ForeignKeyConstraint>,
}

/// The tables a dump has to cover.
///
/// Both sets keep discovery order for deterministic output; equality is set
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportClosure {
    pub seed_tables: IndexSet<String>,
    pub resolved_tables: IndexSet<String>,
}

impl ExportClosure {
    /// The table used in the `FROM` clause of every generated statement.
    pub fn from_table(&self) -> Option<&str> {
        self.seed_tables.first().map(String::as_str)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.resolved_tables.contains(table)
    }

    pub fn len(&self) -> usize {
        self.resolved_tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved_tables.is_empty()
    }
}
