//! SQL synthesis: the shared JOIN clause, per-table SELECTs and the
//! primary-key queries that drive DELETE generation.
//!
//! Every statement joins every related table, whether or not the target
//! table needs it. The statements share one FROM table and one JOIN clause,
//! so the filter means the same thing for every table in the dump.

use std::fmt;

use indexmap::IndexMap;
use pgsubset_sql::{
    ColumnRef as SqlColumnRef, Expr, Join, JoinKind, Joins, SelectColumn, SelectStmt, TableRef,
};
use tracing::debug;

use crate::catalog::Catalog;
use crate::introspect::SchemaIntrospector;
use crate::model::ForeignKeyConstraint;
use crate::{Error, Result};

/// The JOIN clause shared by every statement of a dump.
///
/// One join per non-ignored foreign key of every table, in table order then
/// constraint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinClause {
    joins: Vec<Join>,
}

impl JoinClause {
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// `(referenced table, join kind)` for each join, in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, JoinKind)> {
        self.joins.iter().map(|j| (j.table.name.as_str(), j.kind))
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Joins(&self.joins))
    }
}

/// Turn a user filter into a WHERE expression. Blank filters mean no WHERE.
fn filter_expr(filter: Option<&str>) -> Option<Expr> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(Expr::raw)
}

/// `a.x = b.y AND ...` over the constraint's pairs, in ordinal order.
fn join_condition(constraint: &ForeignKeyConstraint) -> Option<Expr> {
    Expr::all(constraint.pairs.iter().map(|pair| {
        Expr::Column(SqlColumnRef::from(&pair.foreign_column))
            .eq(Expr::Column(SqlColumnRef::from(&pair.referenced_column)))
    }))
}

/// Builds the statements of a dump from schema metadata.
pub struct StatementBuilder<'s, 'a, C: Catalog> {
    schema: &'s mut SchemaIntrospector<'a, C>,
}

impl<'s, 'a, C: Catalog> StatementBuilder<'s, 'a, C> {
    pub fn new(schema: &'s mut SchemaIntrospector<'a, C>) -> Self {
        Self { schema }
    }

    /// Join every foreign key of every table in `tables`, skipping
    /// constraints that point at a table in `excluded` (normally the FROM
    /// table, which must not be joined onto itself).
    ///
    /// A constraint with any nullable column becomes a `LEFT JOIN`, so rows
    /// with an unset optional reference are not filtered out.
    pub async fn generate_join_clause(
        &mut self,
        tables: impl IntoIterator<Item = impl AsRef<str>>,
        excluded: &[&str],
    ) -> Result<JoinClause> {
        let mut joins = Vec::new();

        for table in tables {
            let constraints: Vec<ForeignKeyConstraint> = self
                .schema
                .fetch_foreign_keys(table.as_ref())
                .await?
                .values()
                .cloned()
                .collect();

            for constraint in &constraints {
                let Some(referenced) = constraint.referenced_table() else {
                    continue;
                };
                if excluded.contains(&referenced) {
                    continue;
                }
                let Some(on) = join_condition(constraint) else {
                    continue;
                };

                let kind = if self.schema.is_constraint_nullable(constraint).await? {
                    JoinKind::Left
                } else {
                    JoinKind::Inner
                };
                joins.push(Join {
                    kind,
                    table: TableRef::new(referenced),
                    on,
                });
            }
        }

        let clause = JoinClause { joins };
        debug!(joins = clause.len(), clause = %clause, "generated join clause");
        Ok(clause)
    }

    /// `SELECT DISTINCT <target>.* FROM <from> <joins> [WHERE <filter>]`.
    ///
    /// DISTINCT is required: joining several one-to-many relations repeats
    /// rows of the target table.
    pub fn generate_select(
        &self,
        from_table: &str,
        target_table: &str,
        join: &JoinClause,
        filter: Option<&str>,
    ) -> String {
        let mut stmt = SelectStmt::new()
            .distinct()
            .column(SelectColumn::all_from(target_table))
            .from(TableRef::new(from_table))
            .joins(join.joins.iter().cloned());
        if let Some(filter) = filter_expr(filter) {
            stmt = stmt.where_(filter);
        }
        stmt.to_string()
    }

    /// Select the primary key of every `target_table` row the dump will
    /// contain, under the same joins and filter as its SELECT.
    pub async fn generate_primary_key_query(
        &self,
        from_table: &str,
        target_table: &str,
        join: &JoinClause,
        filter: Option<&str>,
    ) -> Result<String> {
        let primary_key = self.schema.fetch_primary_keys(target_table).await?;
        if primary_key.is_empty() {
            return Err(Error::MissingPrimaryKey {
                table: target_table.to_owned(),
            });
        }

        let mut stmt = SelectStmt::new()
            .distinct()
            .columns(
                primary_key
                    .iter()
                    .map(|col| SelectColumn::column(SqlColumnRef::from(col))),
            )
            .from(TableRef::new(from_table))
            .joins(join.joins.iter().cloned());
        if let Some(filter) = filter_expr(filter) {
            stmt = stmt.where_(filter);
        }
        Ok(stmt.to_string())
    }

    /// [`generate_select`](Self::generate_select) for each table, keyed by
    /// table in the given order.
    pub fn generate_all_select_statements(
        &self,
        tables: impl IntoIterator<Item = impl AsRef<str>>,
        from_table: &str,
        join: &JoinClause,
        filter: Option<&str>,
    ) -> IndexMap<String, String> {
        tables
            .into_iter()
            .map(|table| {
                let table = table.as_ref();
                let select = self.generate_select(from_table, table, join, filter);
                debug!(table, sql = %select, "select statement");
                (table.to_owned(), select)
            })
            .collect()
    }

    /// [`generate_primary_key_query`](Self::generate_primary_key_query) for
    /// each table, keyed by table in the given order.
    pub async fn generate_all_primary_key_queries(
        &self,
        tables: impl IntoIterator<Item = impl AsRef<str>>,
        from_table: &str,
        join: &JoinClause,
        filter: Option<&str>,
    ) -> Result<IndexMap<String, String>> {
        let mut queries = IndexMap::new();
        for table in tables {
            let table = table.as_ref();
            let query = self
                .generate_primary_key_query(from_table, table, join, filter)
                .await?;
            debug!(table, sql = %query, "primary key query");
            queries.insert(table.to_owned(), query);
        }
        Ok(queries)
    }
}
