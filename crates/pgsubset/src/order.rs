//! Order in which tables are written to the script.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::Result;
use crate::catalog::Catalog;
use crate::introspect::SchemaIntrospector;

/// How tables are ordered in the DELETE and COPY phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TableOrder {
    /// Closure discovery order for both phases.
    #[default]
    Discovery,

    /// Parents before children for COPY, children before parents for
    /// DELETE.
    Dependency,
}

impl TableOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            TableOrder::Discovery => "discovery",
            TableOrder::Dependency => "dependency",
        }
    }

    /// Tables in DELETE order and in COPY order.
    pub async fn phases<C: Catalog>(
        self,
        schema: &mut SchemaIntrospector<'_, C>,
        tables: &IndexSet<String>,
    ) -> Result<Phases> {
        let discovery: Vec<String> = tables.iter().cloned().collect();
        let phases = match self {
            TableOrder::Discovery => Phases {
                delete: discovery.clone(),
                copy: discovery,
            },
            TableOrder::Dependency => {
                let mut parents: IndexMap<String, IndexSet<String>> = IndexMap::new();
                for table in tables {
                    let referenced = schema
                        .fetch_foreign_keys(table)
                        .await?
                        .values()
                        .filter_map(|fk| fk.referenced_table())
                        .filter(|t| *t != table.as_str() && tables.contains(*t))
                        .map(str::to_owned)
                        .collect();
                    parents.insert(table.clone(), referenced);
                }

                let copy = parents_first(tables, &parents);
                let mut delete = copy.clone();
                delete.reverse();
                Phases { delete, copy }
            }
        };
        debug!(order = self.as_str(), ?phases, "table order");
        Ok(phases)
    }
}

impl fmt::Display for TableOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(TableOrder::Discovery),
            "dependency" => Ok(TableOrder::Dependency),
            other => Err(format!(
                "unknown table order {other:?}, expected discovery or dependency"
            )),
        }
    }
}

/// Table lists for the two phases of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phases {
    pub delete: Vec<String>,
    pub copy: Vec<String>,
}

/// Topological order over `parents` (table -> tables it references), ties
/// broken by discovery order. Tables left on a cycle go last, in discovery
/// order.
pub fn parents_first(
    tables: &IndexSet<String>,
    parents: &IndexMap<String, IndexSet<String>>,
) -> Vec<String> {
    let no_parents = IndexSet::new();
    let parents_of = |table: &str| parents.get(table).unwrap_or(&no_parents);

    let mut pending: IndexMap<&str, usize> = tables
        .iter()
        .map(|t| (t.as_str(), parents_of(t).len()))
        .collect();
    let mut ready: VecDeque<&str> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(t, _)| *t)
        .collect();

    let mut ordered: IndexSet<&str> = IndexSet::new();
    while let Some(table) = ready.pop_front() {
        if !ordered.insert(table) {
            continue;
        }
        for child in tables {
            if ordered.contains(child.as_str()) || !parents_of(child).contains(table) {
                continue;
            }
            if let Some(n) = pending.get_mut(child.as_str()) {
                *n -= 1;
                if *n == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    for table in tables {
        ordered.insert(table);
    }
    ordered.into_iter().map(str::to_owned).collect()
}
