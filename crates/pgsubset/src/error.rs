use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not connect to postgres: {0}")]
    Connection(#[source] tokio_postgres::Error),

    #[error("catalog lookup of {what} for table {table:?} failed: {source}")]
    SchemaQuery {
        what: &'static str,
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("query failed: {source}\n  sql: {sql}")]
    Query {
        sql: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("COPY of table {table:?} failed: {source}")]
    Copy {
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("writing dump output: {0}")]
    Io(#[from] std::io::Error),

    #[error("no seed tables given")]
    NoSeedTables,

    #[error("table {table:?} has no primary key, cannot generate delete statements")]
    MissingPrimaryKey { table: String },
}
