//! In-memory stand-ins for the database, used by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::catalog::{Catalog, ForeignKeyRow};
use crate::emit::DumpSession;
use crate::value::SqlValue;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<(String, bool)>,
    primary_key: Vec<String>,
}

/// A schema described up front, with lookup counters.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: IndexMap<String, MemoryTable>,
    foreign_keys: Vec<ForeignKeyRow>,
    failing: HashSet<String>,
    fk_lookups: RefCell<HashMap<String, usize>>,
    nullable_lookups: RefCell<usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table: `(column, nullable)` in ordinal order, then the primary
    /// key columns in key order.
    pub fn table(mut self, name: &str, columns: &[(&str, bool)], primary_key: &[&str]) -> Self {
        self.tables.insert(
            name.to_owned(),
            MemoryTable {
                columns: columns
                    .iter()
                    .map(|(c, nullable)| (c.to_string(), *nullable))
                    .collect(),
                primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    /// Add a foreign key; `columns` and `referenced` pair up positionally.
    pub fn foreign_key(
        mut self,
        name: &str,
        table: &str,
        columns: &[&str],
        referenced_table: &str,
        referenced: &[&str],
    ) -> Self {
        assert_eq!(columns.len(), referenced.len(), "unbalanced foreign key {name}");
        for (column, referenced_column) in columns.iter().zip(referenced) {
            self.foreign_keys.push(ForeignKeyRow {
                constraint_name: name.to_owned(),
                foreign_table: table.to_owned(),
                foreign_column: column.to_string(),
                referenced_table: referenced_table.to_owned(),
                referenced_column: referenced_column.to_string(),
            });
        }
        self
    }

    /// Make every lookup touching `table` fail.
    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing.insert(table.to_owned());
        self
    }

    pub fn foreign_key_lookups(&self, table: &str) -> usize {
        self.fk_lookups.borrow().get(table).copied().unwrap_or(0)
    }

    pub fn nullable_lookups(&self) -> usize {
        *self.nullable_lookups.borrow()
    }

    /// Tables referenced by any foreign key of `table`, ignore-list aside.
    pub fn referenced_tables(&self, table: &str) -> Vec<String> {
        self.foreign_keys
            .iter()
            .filter(|row| row.foreign_table == table)
            .map(|row| row.referenced_table.clone())
            .collect()
    }

    fn check(&self, table: &str) -> Result<()> {
        if self.failing.contains(table) {
            return Err(Error::Io(std::io::Error::other(format!(
                "catalog unavailable for {table}"
            ))));
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    async fn foreign_key_rows(&self, _schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>> {
        *self
            .fk_lookups
            .borrow_mut()
            .entry(table.to_owned())
            .or_default() += 1;
        self.check(table)?;

        let mut rows: Vec<ForeignKeyRow> = self
            .foreign_keys
            .iter()
            .filter(|row| row.foreign_table == table)
            .cloned()
            .collect();
        // Stable: rows of one constraint keep their declared order.
        rows.sort_by(|a, b| a.constraint_name.cmp(&b.constraint_name));
        Ok(rows)
    }

    async fn primary_key_columns(&self, _schema: &str, table: &str) -> Result<Vec<String>> {
        self.check(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|t| t.primary_key.clone())
            .unwrap_or_default())
    }

    async fn column_names(&self, _schema: &str, table: &str) -> Result<Vec<String>> {
        self.check(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|(c, _)| c.clone()).collect())
            .unwrap_or_default())
    }

    async fn column_nullable(
        &self,
        _schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<bool>> {
        *self.nullable_lookups.borrow_mut() += 1;
        self.check(table)?;
        Ok(self.tables.get(table).and_then(|t| {
            t.columns
                .iter()
                .find(|(c, _)| c == column)
                .map(|(_, nullable)| *nullable)
        }))
    }
}

/// A session that answers with canned key rows and COPY payloads, and
/// records the SQL it was sent.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    key_rows: HashMap<String, Vec<Vec<SqlValue>>>,
    copy_data: HashMap<String, Vec<u8>>,
    statements: RefCell<Vec<String>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by the primary key query of `table`.
    pub fn key_rows(mut self, table: &str, rows: Vec<Vec<SqlValue>>) -> Self {
        self.key_rows.insert(table.to_owned(), rows);
        self
    }

    /// Bytes streamed by the copy-out of `table`.
    pub fn copy_data(mut self, table: &str, data: &str) -> Self {
        self.copy_data
            .insert(table.to_owned(), data.as_bytes().to_vec());
        self
    }

    /// Every statement sent so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }
}

impl DumpSession for ScriptedSession {
    async fn primary_key_rows(&self, sql: &str, table: &str) -> Result<Vec<Vec<SqlValue>>> {
        self.statements.borrow_mut().push(sql.to_owned());
        Ok(self.key_rows.get(table).cloned().unwrap_or_default())
    }

    async fn copy_out<W: AsyncWrite + Unpin>(
        &self,
        sql: &str,
        table: &str,
        sink: &mut W,
    ) -> Result<u64> {
        self.statements.borrow_mut().push(sql.to_owned());
        let data = self.copy_data.get(table).cloned().unwrap_or_default();
        sink.write_all(&data).await?;
        Ok(data.len() as u64)
    }
}
