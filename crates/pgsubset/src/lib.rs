//! Partial, referentially consistent dumps of a PostgreSQL database.
//!
//! Give it a few seed tables and an optional filter. pgsubset follows foreign
//! keys from the seeds to every table they depend on, joins them all so the
//! filter applies across the whole set, and writes a SQL script that deletes
//! the matching rows from a target database and copies them back in.
//!
//! # Example
//!
//! ```ignore
//! use pgsubset::{DumpOptions, Dumper};
//!
//! let options = DumpOptions::new()
//!     .filter("customers.id = 5")
//!     .output("customer-5.sql");
//! let dumper = Dumper::connect("postgresql://localhost/shop", options).await?;
//! let report = dumper.dump(["orders"]).await?;
//! println!("{} tables", report.tables.len());
//! ```

mod error;
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

mod model;
pub use model::*;

mod traced;
pub use traced::TracedClient;

mod catalog;
pub use catalog::{Catalog, ForeignKeyRow};

mod introspect;
pub use introspect::SchemaIntrospector;

mod closure;
pub use closure::resolve;

mod statements;
pub use statements::{JoinClause, StatementBuilder};

mod value;
pub use value::SqlValue;

mod order;
pub use order::{Phases, TableOrder, parents_first};

mod emit;
pub use emit::{DumpEmitter, DumpSession, EmitStats, PREAMBLE};

mod dumper;
pub use dumper::{DumpOptions, DumpReport, Dumper, dump_with};

#[cfg(test)]
mod fixtures;
