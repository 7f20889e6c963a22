//! Statement rewriter: renders one SQL string per routed sub-table and
//! groups them by the node the sub-table lives on.

use std::fmt;

use fnv::FnvHashMap;
use tracing::error;

use super::plan::{Plan, PlanBuilder};
use super::Error;
use crate::sql::{Delete, Insert, RenderSql, Replace, Select, TableName, Update};

/// Physical sub-table reference: the logical table with the four-digit
/// index suffix (`orders` -> `orders_0007`).
struct SubTable<'a> {
    table: &'a TableName,
    index: usize,
}

impl fmt::Display for SubTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:04}", self.table, self.index)
    }
}

pub(super) fn select(builder: PlanBuilder, stmt: &Select) -> Result<Plan, Error> {
    generate(builder, &stmt.from, None, |table: &dyn fmt::Display| {
        stmt.sql_with_table(table)
    })
}

pub(super) fn insert(builder: PlanBuilder, stmt: &Insert) -> Result<Plan, Error> {
    generate(builder, &stmt.table, Some(Error::InsertInMulti), |table: &dyn fmt::Display| {
        stmt.sql_with_table(table)
    })
}

pub(super) fn update(builder: PlanBuilder, stmt: &Update) -> Result<Plan, Error> {
    generate(builder, &stmt.table, Some(Error::UpdateInMulti), |table: &dyn fmt::Display| {
        stmt.sql_with_table(table)
    })
}

pub(super) fn delete(builder: PlanBuilder, stmt: &Delete) -> Result<Plan, Error> {
    generate(builder, &stmt.table, Some(Error::DeleteInMulti), |table: &dyn fmt::Display| {
        stmt.sql_with_table(table)
    })
}

pub(super) fn replace(builder: PlanBuilder, stmt: &Replace) -> Result<Plan, Error> {
    generate(builder, &stmt.table, Some(Error::ReplaceInMulti), |table: &dyn fmt::Display| {
        stmt.sql_with_table(table)
    })
}

/// Shared rewrite skeleton. With no routed sub-tables the original
/// statement goes, untouched, to the default rule's single node. A write
/// may span sub-tables but never nodes; `single_node` carries the
/// family-specific refusal.
fn generate<F>(
    builder: PlanBuilder,
    table: &TableName,
    single_node: Option<Error>,
    render: F,
) -> Result<Plan, Error>
where
    F: Fn(&dyn fmt::Display) -> String,
{
    if builder.route_node_indexes().is_empty() {
        return Err(Error::NoRouteNode);
    }

    let mut sqls: FnvHashMap<String, Vec<String>> = FnvHashMap::default();
    if builder.route_table_indexes().is_empty() {
        let node = builder.rule().nodes()[0].clone();
        sqls.insert(node, vec![render(table)]);
    } else {
        if builder.route_node_indexes().len() > 1 {
            if let Some(err) = single_node {
                error!("statement for table \"{}\" refused: {}", table, err);
                return Err(err);
            }
        }
        let rule = builder.rule();
        let count = builder.route_table_indexes().len();
        for &index in builder.route_table_indexes() {
            let node = rule.nodes()[rule.table_to_node()[index]].clone();
            let sql = render(&SubTable { table, index });
            sqls.entry(node)
                .or_insert_with(|| Vec::with_capacity(count))
                .push(sql);
        }
    }
    Ok(builder.freeze(sqls))
}
