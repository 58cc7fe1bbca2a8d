//! SQL statements.

use crate::expr::{ColumnRef, Expr};

/// A table reference, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

/// A SELECT statement.
#[derive(Debug, Clone, Default)]
pub struct SelectStmt {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_: Option<Expr>,
}

/// A column in a SELECT clause.
#[derive(Debug, Clone)]
pub enum SelectColumn {
    /// A single column
    Column(ColumnRef),

    /// All columns from a table: table.*
    AllFrom(String),
}

impl SelectColumn {
    pub fn column(col: ColumnRef) -> Self {
        SelectColumn::Column(col)
    }

    pub fn all_from(table: impl Into<String>) -> Self {
        SelectColumn::AllFrom(table.into())
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

/// Type of JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

// ============================================================================
// DELETE statement
// ============================================================================

/// A DELETE statement.
#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: TableRef,
    pub where_: Option<Expr>,
}

// ============================================================================
// COPY statements
// ============================================================================

/// `COPY <table> (<columns>) FROM stdin`, the header of a copy-in block.
///
/// Columns are always double-quoted so mixed-case names survive the reload.
#[derive(Debug, Clone)]
pub struct CopyFromStdin {
    pub table: TableRef,
    pub columns: Vec<String>,
}

/// `COPY (<query>) TO STDOUT`, the copy-out request sent to the server.
///
/// With `skip_null_rows`, rows whose fields are all NULL are filtered out
/// around the query. A table reached through a LEFT JOIN yields one such row
/// for every unmatched parent.
#[derive(Debug, Clone)]
pub struct CopyToStdout {
    pub query: String,
    pub skip_null_rows: bool,
}

// ============================================================================
// ALTER TABLE ... TRIGGER ALL
// ============================================================================

/// `ALTER TABLE <table> ENABLE|DISABLE TRIGGER ALL`.
#[derive(Debug, Clone)]
pub struct SetTriggers {
    pub table: TableRef,
    pub enabled: bool,
}

impl SetTriggers {
    pub fn disable(table: TableRef) -> Self {
        Self {
            table,
            enabled: false,
        }
    }

    pub fn enable(table: TableRef) -> Self {
        Self {
            table,
            enabled: true,
        }
    }
}

// ============================================================================
// Builder-style constructors
// ============================================================================

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn column(mut self, col: SelectColumn) -> Self {
        self.columns.push(col);
        self
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = SelectColumn>) -> Self {
        self.columns.extend(cols);
        self
    }

    pub fn from(mut self, from: TableRef) -> Self {
        self.from = Some(from);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn joins(mut self, joins: impl IntoIterator<Item = Join>) -> Self {
        self.joins.extend(joins);
        self
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }
}

impl DeleteStmt {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            where_: None,
        }
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }
}

impl CopyFromStdin {
    pub fn new(table: TableRef, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            table,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl CopyToStdout {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            skip_null_rows: false,
        }
    }

    pub fn skip_null_rows(mut self) -> Self {
        self.skip_null_rows = true;
        self
    }
}
