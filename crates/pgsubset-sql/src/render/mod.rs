//! Render SQL AST to string.
//!
//! Everything renders on a single line so statements can be embedded in
//! `COPY (...) TO STDOUT` and in one-statement-per-line dump output.

use std::fmt;

use crate::expr::{ColumnRef, Expr};
use crate::stmt::*;
use crate::{Ident, Name, escape_string};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(col) => write!(f, "{col}"),
            Expr::String(s) => {
                let escaped = escape_string(s);
                write!(f, "{escaped}")
            }
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Numeric(n) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Bytes(bytes) => {
                write!(f, "'\\x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                write!(f, "'::bytea")
            }
            Expr::Null => write!(f, "NULL"),
            Expr::BinOp { left, op, right } => {
                let op = op.as_str();
                write!(f, "{left} {op} {right}")
            }
            Expr::IsNull(expr) => write!(f, "{expr} IS NULL"),
            Expr::Raw(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            let table = Name(table);
            write!(f, "{table}.")?;
        }
        let column = Name(&self.column);
        write!(f, "{column}")
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            let schema = Name(schema);
            write!(f, "{schema}.")?;
        }
        let name = Name(&self.name);
        write!(f, "{name}")
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.as_str();
        let table = &self.table;
        let on = &self.on;
        write!(f, "{kind} {table} ON {on}")
    }
}

/// Space-separated list of joins.
pub struct Joins<'a>(pub &'a [Join]);

impl fmt::Display for Joins<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, join) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{join}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectColumn::Column(col) => write!(f, "{col}"),
            SelectColumn::AllFrom(table) => {
                let table = Name(table);
                write!(f, "{table}.*")
            }
        }
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT")?;
        if self.distinct {
            write!(f, " DISTINCT")?;
        }

        // Columns
        if self.columns.is_empty() {
            write!(f, " *")?;
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {col}")?;
            }
        }

        // FROM
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }

        // JOINs
        if !self.joins.is_empty() {
            write!(f, " {}", Joins(&self.joins))?;
        }

        // WHERE
        if let Some(where_) = &self.where_ {
            write!(f, " WHERE {where_}")?;
        }

        Ok(())
    }
}

impl fmt::Display for DeleteStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = &self.table;
        write!(f, "DELETE FROM {table}")?;

        // WHERE
        if let Some(where_) = &self.where_ {
            write!(f, " WHERE {where_}")?;
        }

        Ok(())
    }
}

impl fmt::Display for CopyFromStdin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = &self.table;
        write!(f, "COPY {table} (")?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let col = Ident(col);
            write!(f, "{col}")?;
        }
        write!(f, ") FROM stdin")
    }
}

impl fmt::Display for CopyToStdout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skip_null_rows {
            // `row IS NULL` holds only when every field is NULL.
            write!(
                f,
                "COPY (SELECT * FROM ({}) AS copied WHERE NOT (copied IS NULL)) TO STDOUT",
                self.query
            )
        } else {
            write!(f, "COPY ({}) TO STDOUT", self.query)
        }
    }
}

impl fmt::Display for SetTriggers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = &self.table;
        let action = if self.enabled { "ENABLE" } else { "DISABLE" };
        write!(f, "ALTER TABLE {table} {action} TRIGGER ALL")
    }
}
