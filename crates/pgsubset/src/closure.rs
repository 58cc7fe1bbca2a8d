//! Foreign key closure: which tables a partial dump must include.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::introspect::SchemaIntrospector;
use crate::model::ExportClosure;
use crate::Result;

/// Compute every table reachable from `seed_tables` by following foreign
/// keys from the referencing table to the referenced one.
///
/// Only the parent side is followed: a table that merely references a seed
/// table is not pulled in. Cycles are fine, each table is visited once.
/// Resolved tables come out in breadth-first discovery order.
pub async fn resolve<C: Catalog>(
    schema: &mut SchemaIntrospector<'_, C>,
    seed_tables: impl IntoIterator<Item = impl Into<String>>,
) -> Result<ExportClosure> {
    let seed_tables: IndexSet<String> = seed_tables.into_iter().map(Into::into).collect();
    debug!(seeds = ?seed_tables, "resolving foreign key closure");

    let mut visited: IndexSet<String> = IndexSet::new();
    let mut queue: VecDeque<String> = seed_tables.iter().cloned().collect();

    while let Some(table) = queue.pop_front() {
        if !visited.insert(table.clone()) {
            continue;
        }

        let foreign_keys = schema.fetch_foreign_keys(&table).await?;
        for constraint in foreign_keys.values() {
            for pair in &constraint.pairs {
                let referenced = &pair.referenced_column.table;
                trace!(from = %table, to = %referenced, constraint = %constraint.name, "edge");
                if !visited.contains(referenced) {
                    queue.push_back(referenced.clone());
                }
            }
        }
    }

    debug!(tables = ?visited, "resolved closure");
    Ok(ExportClosure {
        seed_tables,
        resolved_tables: visited,
    })
}
