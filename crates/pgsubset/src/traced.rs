//! Traced database session wrapper.
//!
//! Wraps a tokio-postgres client and logs all statements via tracing.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, CopyOutStream, Error, NoTls, Row, Statement};
use tracing::Instrument;

/// A traced database session.
///
/// Owns the one `tokio_postgres::Client` a dump runs on. Introspection,
/// primary-key enumeration and copy-out all go through here, one statement
/// at a time.
///
/// # Example
///
/// ```ignore
/// use pgsubset::TracedClient;
///
/// let client = TracedClient::connect("postgresql://localhost/shop").await?;
///
/// // All queries are automatically traced
/// let rows = client.query("SELECT id FROM orders WHERE id = $1", &[&id]).await?;
/// ```
pub struct TracedClient {
    inner: Client,
}

impl TracedClient {
    /// Wrap an already-connected client.
    pub fn new(client: Client) -> Self {
        Self { inner: client }
    }

    /// Connect without TLS and spawn the connection driver on the current
    /// runtime.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let span = tracing::debug_span!("db.connect");
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .instrument(span)
            .await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });

        Ok(Self::new(client))
    }

    /// Prepare a statement, to look at its result columns.
    pub async fn prepare(&self, sql: &str) -> Result<Statement, Error> {
        let span = tracing::debug_span!("db.prepare", sql = %sql);
        self.inner.prepare(sql).instrument(span).await
    }

    /// Execute a query, returning all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let rows = self
            .inner
            .query(sql, params)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Start a `COPY ... TO STDOUT` and return the data stream.
    pub async fn copy_out(&self, sql: &str) -> Result<CopyOutStream, Error> {
        let span = tracing::debug_span!("db.copy_out", sql = %sql);
        self.inner.copy_out(sql).instrument(span).await
    }

    /// Get the inner client (for cases where you need the raw client).
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}
