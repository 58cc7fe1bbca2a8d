//! Schema introspection with per-instance memoization.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::model::{ColumnConstraintPair, ColumnRef, ForeignKeyConstraint, TableMetadata};
use crate::Result;

/// Reads table metadata from a [`Catalog`] and caches it.
///
/// The foreign key and nullability caches live as long as the introspector.
/// The ignore-list is fixed at construction: to change it, build a new
/// introspector (the old cache goes with the old instance).
pub struct SchemaIntrospector<'a, C: Catalog> {
    catalog: &'a C,
    schema: String,
    ignored_constraints: HashSet<String>,
    foreign_keys: HashMap<String, IndexMap<String, ForeignKeyConstraint>>,
    nullable: HashMap<String, bool>,
}

impl<'a, C: Catalog> SchemaIntrospector<'a, C> {
    pub fn new(
        catalog: &'a C,
        schema: impl Into<String>,
        ignored_constraints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            catalog,
            schema: schema.into(),
            ignored_constraints: ignored_constraints.into_iter().map(Into::into).collect(),
            foreign_keys: HashMap::new(),
            nullable: HashMap::new(),
        }
    }

    /// The schema all lookups are scoped to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn is_ignored(&self, constraint: &str) -> bool {
        self.ignored_constraints.contains(constraint)
    }

    /// Foreign keys of `table` by constraint name, ignored constraints
    /// excluded.
    ///
    /// Composite constraints arrive as one catalog row per column pair; rows
    /// sharing a name are folded into one constraint in ordinal order.
    pub async fn fetch_foreign_keys(
        &mut self,
        table: &str,
    ) -> Result<&IndexMap<String, ForeignKeyConstraint>> {
        if !self.foreign_keys.contains_key(table) {
            debug!(table, "fetching foreign keys");
            let rows = self.catalog.foreign_key_rows(&self.schema, table).await?;

            let mut constraints: IndexMap<String, ForeignKeyConstraint> = IndexMap::new();
            for row in rows {
                if self.ignored_constraints.contains(&row.constraint_name) {
                    trace!(constraint = %row.constraint_name, "ignored");
                    continue;
                }
                let pair = ColumnConstraintPair {
                    foreign_column: ColumnRef::new(row.foreign_table, row.foreign_column),
                    referenced_column: ColumnRef::new(row.referenced_table, row.referenced_column),
                };
                constraints
                    .entry(row.constraint_name.clone())
                    .or_insert_with(|| ForeignKeyConstraint {
                        name: row.constraint_name,
                        pairs: Vec::new(),
                    })
                    .pairs
                    .push(pair);
            }

            debug!(table, count = constraints.len(), "fetched foreign keys");
            self.foreign_keys.insert(table.to_owned(), constraints);
        } else {
            trace!(table, "foreign keys cached");
        }

        Ok(&self.foreign_keys[table])
    }

    /// Primary key columns of `table` in key order. Not cached.
    pub async fn fetch_primary_keys(&self, table: &str) -> Result<Vec<ColumnRef>> {
        let columns = self
            .catalog
            .primary_key_columns(&self.schema, table)
            .await?;
        debug!(table, ?columns, "fetched primary key");
        Ok(columns
            .into_iter()
            .map(|column| ColumnRef::new(table, column))
            .collect())
    }

    /// Columns of `table` in ordinal position order. Not cached.
    pub async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnRef>> {
        let columns = self.catalog.column_names(&self.schema, table).await?;
        debug!(table, count = columns.len(), "fetched columns");
        Ok(columns
            .into_iter()
            .map(|column| ColumnRef::new(table, column))
            .collect())
    }

    /// Whether `column` accepts NULL. Unknown columns count as not nullable.
    pub async fn is_nullable(&mut self, column: &ColumnRef) -> Result<bool> {
        let key = column.cache_key();
        if let Some(&nullable) = self.nullable.get(&key) {
            return Ok(nullable);
        }

        let nullable = self
            .catalog
            .column_nullable(&self.schema, &column.table, &column.column)
            .await?
            .unwrap_or(false);
        trace!(column = %key, nullable, "fetched nullability");
        self.nullable.insert(key, nullable);
        Ok(nullable)
    }

    /// Whether any foreign column of `constraint` accepts NULL.
    ///
    /// One nullable column makes the whole constraint optional.
    pub async fn is_constraint_nullable(
        &mut self,
        constraint: &ForeignKeyConstraint,
    ) -> Result<bool> {
        for pair in &constraint.pairs {
            if self.is_nullable(&pair.foreign_column).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Columns, primary key and foreign keys of `table` in one value.
    pub async fn describe(&mut self, table: &str) -> Result<TableMetadata> {
        let foreign_keys = self.fetch_foreign_keys(table).await?.clone();
        Ok(TableMetadata {
            name: table.to_owned(),
            columns: self.fetch_columns(table).await?,
            primary_key: self.fetch_primary_keys(table).await?,
            foreign_keys,
        })
    }
}
