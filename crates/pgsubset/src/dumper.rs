//! The dump pipeline: closure, statements, then the script.

use std::path::{Path, PathBuf};

use pgsubset_sql::quote_ident;
use tokio::io::{AsyncWrite, BufWriter};
use tracing::{Instrument, debug, info};

use crate::catalog::Catalog;
use crate::closure::resolve;
use crate::emit::{DumpEmitter, DumpSession, EmitStats};
use crate::introspect::SchemaIntrospector;
use crate::order::TableOrder;
use crate::statements::{JoinClause, StatementBuilder};
use crate::{Error, Result, TracedClient};

/// Knobs for a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Schema every table lives in.
    pub schema: String,
    /// Raw SQL condition appended as `WHERE` to every statement.
    pub filter: Option<String>,
    /// Foreign key constraints to pretend do not exist.
    pub ignored_constraints: Vec<String>,
    pub order: TableOrder,
    /// Where [`Dumper::dump`] writes the script.
    pub output: PathBuf,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_owned(),
            filter: None,
            ignored_constraints: Vec::new(),
            order: TableOrder::Discovery,
            output: PathBuf::from("dump.sql"),
        }
    }
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn ignore(mut self, constraint: impl Into<String>) -> Self {
        self.ignored_constraints.push(constraint.into());
        self
    }

    pub fn ignored_constraints(
        mut self,
        constraints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ignored_constraints = constraints.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(mut self, order: TableOrder) -> Self {
        self.order = order;
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

/// What a dump covered.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpReport {
    /// The FROM table of every statement.
    pub from_table: String,
    /// Every table in the dump, in closure discovery order.
    pub tables: Vec<String>,
    pub join: JoinClause,
    pub stats: EmitStats,
}

/// Dumps a consistent subset of a database.
///
/// Holds one session. Options can be changed between dumps; each dump reads
/// the schema afresh.
pub struct Dumper {
    client: TracedClient,
    options: DumpOptions,
}

impl Dumper {
    pub async fn connect(url: &str, options: DumpOptions) -> Result<Self> {
        let client = TracedClient::connect(url)
            .await
            .map_err(Error::Connection)?;
        Ok(Self::new(client, options))
    }

    pub fn new(client: TracedClient, options: DumpOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DumpOptions {
        &mut self.options
    }

    pub fn set_options(&mut self, options: DumpOptions) {
        self.options = options;
    }

    pub fn client(&self) -> &TracedClient {
        &self.client
    }

    /// Dump `seed_tables` and everything they reference to
    /// [`DumpOptions::output`].
    pub async fn dump(
        &self,
        seed_tables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<DumpReport> {
        let seeds = collect_seeds(seed_tables)?;
        let path = &self.options.output;
        let file = create_output(path).await?;
        let report = self.dump_to(seeds, BufWriter::new(file)).await?;
        info!(path = %path.display(), "dump saved");
        Ok(report)
    }

    /// Like [`dump`](Self::dump), into any writer.
    pub async fn dump_to<W: AsyncWrite + Unpin>(
        &self,
        seed_tables: impl IntoIterator<Item = impl Into<String>>,
        out: W,
    ) -> Result<DumpReport> {
        let seeds = collect_seeds(seed_tables)?;

        let sql = "SELECT pg_catalog.set_config('search_path', $1, false)";
        self.client
            .query(sql, &[&search_path(&self.options.schema)])
            .await
            .map_err(|source| Error::Query {
                sql: sql.to_owned(),
                source,
            })?;

        let (_, report) = dump_with(&self.client, &self.client, &self.options, seeds, out).await?;
        Ok(report)
    }
}

/// The `search_path` value naming exactly `schema`. Quoted, since Postgres
/// folds bare names in a search path to lower case.
fn search_path(schema: &str) -> String {
    quote_ident(schema)
}

fn collect_seeds(seed_tables: impl IntoIterator<Item = impl Into<String>>) -> Result<Vec<String>> {
    let seeds: Vec<String> = seed_tables.into_iter().map(Into::into).collect();
    if seeds.is_empty() {
        return Err(Error::NoSeedTables);
    }
    Ok(seeds)
}

async fn create_output(path: &Path) -> Result<tokio::fs::File> {
    debug!(path = %path.display(), "opening output");
    Ok(tokio::fs::File::create(path).await?)
}

/// Run the whole pipeline against any catalog and session.
///
/// Returns the writer so callers that dump into memory can read it back.
pub async fn dump_with<C, S, W>(
    catalog: &C,
    session: &S,
    options: &DumpOptions,
    seed_tables: Vec<String>,
    out: W,
) -> Result<(W, DumpReport)>
where
    C: Catalog,
    S: DumpSession,
    W: AsyncWrite + Unpin,
{
    let from_table = seed_tables.first().cloned().ok_or(Error::NoSeedTables)?;
    let span = tracing::info_span!("dump", from = %from_table, schema = %options.schema);

    async move {
        let mut schema = SchemaIntrospector::new(
            catalog,
            options.schema.clone(),
            options.ignored_constraints.iter().cloned(),
        );
        let closure = resolve(&mut schema, seed_tables).await?;
        info!(tables = closure.len(), "resolved related tables");

        let phases = options
            .order
            .phases(&mut schema, &closure.resolved_tables)
            .await?;
        let filter = options.filter.as_deref();

        let mut builder = StatementBuilder::new(&mut schema);
        let join = builder
            .generate_join_clause(&closure.resolved_tables, &[from_table.as_str()])
            .await?;
        let selects = builder.generate_all_select_statements(&phases.copy, &from_table, &join, filter);
        let pk_queries = builder
            .generate_all_primary_key_queries(&phases.delete, &from_table, &join, filter)
            .await?;

        let mut emitter = DumpEmitter::new(session, &schema, out);
        emitter.write_preamble().await?;
        emitter.generate_all_delete_statements(&pk_queries).await?;
        emitter.dump_tables(&selects).await?;
        let (out, stats) = emitter.finish().await?;

        let report = DumpReport {
            from_table,
            tables: closure.resolved_tables.into_iter().collect(),
            join,
            stats,
        };
        Ok::<_, Error>((out, report))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{MemoryCatalog, ScriptedSession};
    use crate::value::SqlValue;

    fn shop() -> MemoryCatalog {
        MemoryCatalog::new()
            .table("customers", &[("id", false), ("name", false)], &["id"])
            .table(
                "orders",
                &[("id", false), ("customer_id", false), ("coupon_id", true)],
                &["id"],
            )
            .table("coupons", &[("id", false)], &["id"])
            .foreign_key("orders_customer_fk", "orders", &["customer_id"], "customers", &["id"])
            .foreign_key("orders_coupon_fk", "orders", &["coupon_id"], "coupons", &["id"])
    }

    fn session() -> ScriptedSession {
        ScriptedSession::new()
            .key_rows("orders", vec![vec![SqlValue::I32(1)]])
            .key_rows("customers", vec![vec![SqlValue::I32(5)]])
            .copy_data("orders", "1\t5\t\\N\n")
            .copy_data("customers", "5\tAda\n")
    }

    async fn run(
        catalog: &MemoryCatalog,
        session: &ScriptedSession,
        options: &DumpOptions,
        seeds: &[&str],
    ) -> Result<(String, DumpReport)> {
        let seeds = seeds.iter().map(|s| s.to_string()).collect();
        let (out, report) = dump_with(catalog, session, options, seeds, Vec::new()).await?;
        Ok((String::from_utf8(out).unwrap(), report))
    }

    #[tokio::test]
    async fn dumps_seed_and_referenced_tables() {
        let catalog = shop();
        let session = session();
        let options = DumpOptions::new().filter("customers.id = 5");

        let (script, report) = run(&catalog, &session, &options, &["orders"]).await.unwrap();

        assert_eq!(report.from_table, "orders");
        assert_eq!(report.tables, ["orders", "coupons", "customers"]);
        insta::assert_snapshot!(report.join, @"LEFT JOIN coupons ON orders.coupon_id = coupons.id INNER JOIN customers ON orders.customer_id = customers.id");
        assert_eq!(report.stats.tables_copied, 3);
        assert_eq!(report.stats.delete_statements, 2);

        let statements = session.statements();
        assert_eq!(statements.len(), 6);
        insta::assert_snapshot!(statements[0], @"SELECT DISTINCT orders.id FROM orders LEFT JOIN coupons ON orders.coupon_id = coupons.id INNER JOIN customers ON orders.customer_id = customers.id WHERE customers.id = 5");
        insta::assert_snapshot!(statements[5], @"COPY (SELECT * FROM (SELECT DISTINCT customers.* FROM orders LEFT JOIN coupons ON orders.coupon_id = coupons.id INNER JOIN customers ON orders.customer_id = customers.id WHERE customers.id = 5) AS copied WHERE NOT (copied IS NULL)) TO STDOUT");

        assert!(script.starts_with(crate::emit::PREAMBLE));
        assert!(script.contains("DELETE FROM public.orders WHERE orders.id = 1;\n"));
        assert!(script.contains("COPY public.orders (\"id\", \"customer_id\", \"coupon_id\") FROM stdin;\n1\t5\t\\N\n\\.\n"));
    }

    #[tokio::test]
    async fn every_delete_precedes_every_copy() {
        let catalog = shop();
        let session = session();

        let (script, _) = run(&catalog, &session, &DumpOptions::new(), &["orders"])
            .await
            .unwrap();

        let last_delete = script.rfind("-- delete statements").unwrap();
        let first_copy = script.find("-- Table:").unwrap();
        assert!(last_delete < first_copy);
    }

    #[tokio::test]
    async fn ignored_constraints_leave_joins_and_closure() {
        let catalog = shop();
        let session = session();
        let options = DumpOptions::new().ignore("orders_coupon_fk");

        let (_, report) = run(&catalog, &session, &options, &["orders"]).await.unwrap();

        assert_eq!(report.tables, ["orders", "customers"]);
        assert!(!report.join.to_string().contains("coupons"));
        assert!(session.statements().iter().all(|s| !s.contains("coupons")));
    }

    #[tokio::test]
    async fn dependency_order_copies_parents_first() {
        let catalog = shop();
        let session = session();
        let options = DumpOptions::new().order(TableOrder::Dependency);

        let (script, report) = run(&catalog, &session, &options, &["orders"]).await.unwrap();

        assert_eq!(report.tables, ["orders", "coupons", "customers"]);
        let copies: Vec<&str> = script
            .lines()
            .filter_map(|l| l.strip_prefix("-- Table: "))
            .collect();
        assert_eq!(copies, ["coupons", "customers", "orders"]);
        let deletes: Vec<&str> = script
            .lines()
            .filter_map(|l| l.strip_prefix("-- delete statements for partial dump of table: "))
            .collect();
        assert_eq!(deletes, ["orders", "customers", "coupons"]);
    }

    #[tokio::test]
    async fn empty_seed_list_is_rejected() {
        let catalog = shop();
        let session = session();

        let err = run(&catalog, &session, &DumpOptions::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSeedTables));
        assert!(collect_seeds(Vec::<String>::new()).is_err());
    }

    #[tokio::test]
    async fn missing_primary_key_aborts_before_any_output() {
        let catalog = shop().table("audit", &[("at", false)], &[]);
        let session = session();

        let err = run(&catalog, &session, &DumpOptions::new(), &["audit"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingPrimaryKey { table } if table == "audit"));
        assert!(session.statements().is_empty());
    }

    #[test]
    fn search_path_keeps_schema_case() {
        assert_eq!(search_path("Sales"), r#""Sales""#);
        assert_eq!(search_path("public"), r#""public""#);
    }

    #[test]
    fn options_builder() {
        let options = DumpOptions::new()
            .schema("sales")
            .ignored_constraints(["a_fk", "b_fk"])
            .ignore("c_fk")
            .output("-");
        assert_eq!(options.schema, "sales");
        assert_eq!(options.ignored_constraints, ["a_fk", "b_fk", "c_fk"]);
        assert_eq!(options.filter, None);
        assert_eq!(options.order, TableOrder::Discovery);
        assert_eq!(options.output, PathBuf::from("-"));
        assert_eq!(DumpOptions::default().schema, "public");
    }
}
