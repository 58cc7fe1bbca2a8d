//! Raw catalog lookups.
//!
//! [`Catalog`] is the seam between the introspector and the database: it
//! returns catalog rows as they come, and [`SchemaIntrospector`] groups,
//! filters and caches them.
//!
//! [`SchemaIntrospector`]: crate::SchemaIntrospector

use std::future::Future;

use crate::{Error, Result, TracedClient};

/// One row of a foreign key, i.e. one column pair of a (possibly composite)
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Source of catalog metadata.
///
/// Every method is scoped to one schema. Unknown tables yield empty results,
/// not errors.
pub trait Catalog {
    /// Foreign key column pairs declared on `table`, ordered by constraint
    /// name then ordinal position.
    fn foreign_key_rows(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = Result<Vec<ForeignKeyRow>>>;

    /// Primary key column names in key order.
    fn primary_key_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = Result<Vec<String>>>;

    /// Column names in ordinal position order.
    fn column_names(&self, schema: &str, table: &str)
    -> impl Future<Output = Result<Vec<String>>>;

    /// Whether a column accepts NULL; `None` if the column does not exist.
    fn column_nullable(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<Option<bool>>>;
}

const FOREIGN_KEYS_SQL: &str = "\
SELECT
    kcu1.constraint_name::text,
    kcu1.table_name::text,
    kcu1.column_name::text,
    kcu2.table_name::text,
    kcu2.column_name::text
FROM information_schema.referential_constraints AS rc
INNER JOIN information_schema.key_column_usage AS kcu1
    ON kcu1.constraint_catalog = rc.constraint_catalog
    AND kcu1.constraint_schema = rc.constraint_schema
    AND kcu1.constraint_name = rc.constraint_name
INNER JOIN information_schema.key_column_usage AS kcu2
    ON kcu2.constraint_catalog = rc.unique_constraint_catalog
    AND kcu2.constraint_schema = rc.unique_constraint_schema
    AND kcu2.constraint_name = rc.unique_constraint_name
    AND kcu2.ordinal_position = kcu1.position_in_unique_constraint
WHERE kcu1.table_schema = $1 AND kcu1.table_name = $2
ORDER BY kcu1.constraint_name, kcu1.ordinal_position";

const PRIMARY_KEYS_SQL: &str = "\
SELECT kcu.column_name::text
FROM information_schema.table_constraints AS tc
INNER JOIN information_schema.key_column_usage AS kcu
    ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
    AND kcu.table_schema = tc.table_schema
    AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
ORDER BY kcu.ordinal_position";

const COLUMNS_SQL: &str = "\
SELECT column_name::text
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position";

const IS_NULLABLE_SQL: &str = "\
SELECT is_nullable::text = 'YES'
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2 AND column_name = $3";

fn schema_error(what: &'static str, table: &str) -> impl FnOnce(tokio_postgres::Error) -> Error {
    let table = table.to_owned();
    move |source| Error::SchemaQuery {
        what,
        table,
        source,
    }
}

impl Catalog for TracedClient {
    async fn foreign_key_rows(&self, schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let rows = self
            .query(FOREIGN_KEYS_SQL, &[&schema, &table])
            .await
            .map_err(schema_error("foreign keys", table))?;

        rows.iter()
            .map(|row| -> std::result::Result<_, tokio_postgres::Error> {
                Ok(ForeignKeyRow {
                    constraint_name: row.try_get(0)?,
                    foreign_table: row.try_get(1)?,
                    foreign_column: row.try_get(2)?,
                    referenced_table: row.try_get(3)?,
                    referenced_column: row.try_get(4)?,
                })
            })
            .collect::<std::result::Result<_, _>>()
            .map_err(schema_error("foreign keys", table))
    }

    async fn primary_key_columns(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let rows = self
            .query(PRIMARY_KEYS_SQL, &[&schema, &table])
            .await
            .map_err(schema_error("primary key", table))?;

        rows.iter()
            .map(|row| row.try_get(0))
            .collect::<std::result::Result<_, _>>()
            .map_err(schema_error("primary key", table))
    }

    async fn column_names(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let rows = self
            .query(COLUMNS_SQL, &[&schema, &table])
            .await
            .map_err(schema_error("columns", table))?;

        rows.iter()
            .map(|row| row.try_get(0))
            .collect::<std::result::Result<_, _>>()
            .map_err(schema_error("columns", table))
    }

    async fn column_nullable(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<bool>> {
        let rows = self
            .query(IS_NULLABLE_SQL, &[&schema, &table, &column])
            .await
            .map_err(schema_error("nullability", table))?;

        match rows.first() {
            Some(row) => row
                .try_get(0)
                .map(Some)
                .map_err(schema_error("nullability", table)),
            None => Ok(None),
        }
    }
}
