//! Script emission: DELETE blocks, COPY blocks and the preamble.

use std::fmt::Display;
use std::future::Future;

use futures::StreamExt;
use indexmap::IndexMap;
use pgsubset_sql::{
    ColumnRef as SqlColumnRef, CopyFromStdin, CopyToStdout, DeleteStmt, Expr, SetTriggers,
    TableRef, quote_ident,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::introspect::SchemaIntrospector;
use crate::value::SqlValue;
use crate::{Error, Result, TracedClient};

/// Written once at the top of every script.
pub const PREAMBLE: &str = "\
--
-- PostgreSQL database dump
--

-- Dumped by pgsubset

SET statement_timeout = 0;
SET lock_timeout = 0;
SET client_encoding = 'UTF8';
SET standard_conforming_strings = on;
SELECT pg_catalog.set_config('search_path', '', false);
SET check_function_bodies = false;
SET client_min_messages = warning;
SET row_security = off;

";

/// What the emitter needs from the database once statements are built.
pub trait DumpSession {
    /// Run a primary key query for `table` and decode every row.
    fn primary_key_rows(
        &self,
        sql: &str,
        table: &str,
    ) -> impl Future<Output = Result<Vec<Vec<SqlValue>>>>;

    /// Run a `COPY ... TO STDOUT` for `table` and stream its output into
    /// `sink` unchanged. Returns the number of bytes written.
    fn copy_out<W: AsyncWrite + Unpin>(
        &self,
        sql: &str,
        table: &str,
        sink: &mut W,
    ) -> impl Future<Output = Result<u64>>;
}

/// Re-select the key columns of `sql`, casting the ones `SqlValue` cannot
/// decode to text. Postgres coerces the quoted literal back on replay.
fn text_key_query<'a>(sql: &str, columns: impl IntoIterator<Item = (&'a str, bool)>) -> String {
    let columns: Vec<String> = columns
        .into_iter()
        .map(|(name, supported)| {
            let column = quote_ident(name);
            if supported {
                format!("pk.{column}")
            } else {
                format!("pk.{column}::text")
            }
        })
        .collect();
    format!("SELECT {} FROM ({sql}) AS pk", columns.join(", "))
}

async fn decoded_rows(client: &TracedClient, sql: &str) -> Result<Vec<Vec<SqlValue>>> {
    let query_error = |source| Error::Query {
        sql: sql.to_owned(),
        source,
    };
    let rows = client.query(sql, &[]).await.map_err(query_error)?;
    rows.iter()
        .map(|row| {
            (0..row.len())
                .map(|idx| SqlValue::from_column(row, idx))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(query_error)
        })
        .collect()
}

impl DumpSession for TracedClient {
    async fn primary_key_rows(&self, sql: &str, table: &str) -> Result<Vec<Vec<SqlValue>>> {
        let statement = self.prepare(sql).await.map_err(|source| Error::Query {
            sql: sql.to_owned(),
            source,
        })?;
        let columns = statement.columns();
        if columns.iter().all(|c| SqlValue::supports(c.type_())) {
            return decoded_rows(self, sql).await;
        }

        let text_sql = text_key_query(
            sql,
            columns
                .iter()
                .map(|c| (c.name(), SqlValue::supports(c.type_()))),
        );
        debug!(table, sql = %text_sql, "reading key columns as text");
        decoded_rows(self, &text_sql).await
    }

    async fn copy_out<W: AsyncWrite + Unpin>(
        &self,
        sql: &str,
        table: &str,
        sink: &mut W,
    ) -> Result<u64> {
        let copy_error = |source| Error::Copy {
            table: table.to_owned(),
            source,
        };
        let stream = TracedClient::copy_out(self, sql)
            .await
            .map_err(copy_error)?;
        tokio::pin!(stream);

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(copy_error)?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }
}

/// Counters for one dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub tables_copied: usize,
    pub delete_statements: usize,
    pub bytes_copied: u64,
}

/// Writes one dump script to `out`.
///
/// Every table block is bracketed by `ALTER TABLE ... DISABLE TRIGGER ALL`
/// and the matching `ENABLE`, so neither foreign key checks nor cascading
/// triggers fire while the script is replayed.
pub struct DumpEmitter<'e, 'c, S, C: Catalog, W> {
    session: &'e S,
    schema: &'e SchemaIntrospector<'c, C>,
    out: W,
    stats: EmitStats,
}

impl<'e, 'c, S, C, W> DumpEmitter<'e, 'c, S, C, W>
where
    S: DumpSession,
    C: Catalog,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: &'e S, schema: &'e SchemaIntrospector<'c, C>, out: W) -> Self {
        Self {
            session,
            schema,
            out,
            stats: EmitStats::default(),
        }
    }

    pub fn stats(&self) -> EmitStats {
        self.stats
    }

    fn table_ref(&self, table: &str) -> TableRef {
        TableRef::qualified(self.schema.schema(), table)
    }

    async fn line(&mut self, line: impl Display) -> Result<()> {
        self.out.write_all(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    pub async fn write_preamble(&mut self) -> Result<()> {
        self.out.write_all(PREAMBLE.as_bytes()).await?;
        Ok(())
    }

    /// Emit the COPY block of `table`, with rows produced by `select`.
    pub async fn dump(&mut self, table: &str, select: &str) -> Result<u64> {
        debug!(table, "dumping table");
        let columns = self.schema.fetch_columns(table).await?;
        let target = self.table_ref(table);

        self.line(format!("{};", SetTriggers::disable(target.clone())))
            .await?;
        self.line(format!("-- Table: {table}")).await?;
        let header = CopyFromStdin::new(target.clone(), columns.into_iter().map(|c| c.column));
        self.line(format!("{header};")).await?;

        let copy = CopyToStdout::new(select).skip_null_rows().to_string();
        let bytes = self.session.copy_out(&copy, table, &mut self.out).await?;

        self.out.write_all(b"\\.\n\n").await?;
        self.line(format!("{};", SetTriggers::enable(target)))
            .await?;

        self.stats.tables_copied += 1;
        self.stats.bytes_copied += bytes;
        debug!(table, bytes, "table dumped");
        Ok(bytes)
    }

    /// [`dump`](Self::dump) each table, in map order.
    pub async fn dump_tables(&mut self, selects: &IndexMap<String, String>) -> Result<()> {
        debug!(tables = ?selects.keys().collect::<Vec<_>>(), "dumping tables");
        for (table, select) in selects {
            self.dump(table, select).await?;
        }
        Ok(())
    }

    /// Emit a DELETE for every row `pk_query` returns, so replaying the
    /// script replaces those rows instead of colliding with them.
    pub async fn generate_primary_key_delete_statements(
        &mut self,
        table: &str,
        pk_query: &str,
    ) -> Result<usize> {
        debug!(table, "generating delete statements");
        let primary_key = self.schema.fetch_primary_keys(table).await?;
        if primary_key.is_empty() {
            return Err(Error::MissingPrimaryKey {
                table: table.to_owned(),
            });
        }
        let target = self.table_ref(table);

        self.line(format!(
            "-- delete statements for partial dump of table: {table}"
        ))
        .await?;
        self.line(format!("{};", SetTriggers::disable(target.clone())))
            .await?;

        let rows = self.session.primary_key_rows(pk_query, table).await?;
        let mut written = 0;
        for row in &rows {
            // A key that is entirely NULL comes from an unmatched LEFT JOIN.
            if row.iter().all(SqlValue::is_null) {
                continue;
            }
            let predicate = Expr::all(
                primary_key
                    .iter()
                    .zip(row)
                    .map(|(col, value)| Expr::Column(SqlColumnRef::from(col)).matches(value.to_expr())),
            );
            let mut delete = DeleteStmt::new(target.clone());
            if let Some(predicate) = predicate {
                delete = delete.where_(predicate);
            }
            self.line(format!("{delete};")).await?;
            written += 1;
        }

        self.line(format!("{};", SetTriggers::enable(target)))
            .await?;
        self.out.write_all(b"\n").await?;

        self.stats.delete_statements += written;
        debug!(table, count = written, "delete statements written");
        Ok(written)
    }

    /// [`generate_primary_key_delete_statements`](Self::generate_primary_key_delete_statements)
    /// for each table, in map order.
    pub async fn generate_all_delete_statements(
        &mut self,
        queries: &IndexMap<String, String>,
    ) -> Result<()> {
        for (table, query) in queries {
            self.generate_primary_key_delete_statements(table, query)
                .await?;
        }
        Ok(())
    }

    /// Flush and hand back the sink.
    pub async fn finish(mut self) -> Result<(W, EmitStats)> {
        self.out.flush().await?;
        info!(
            tables = self.stats.tables_copied,
            deletes = self.stats.delete_statements,
            bytes = self.stats.bytes_copied,
            "dump written"
        );
        Ok((self.out, self.stats))
    }
}
