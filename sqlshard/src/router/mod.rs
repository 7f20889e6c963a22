//! Rule registry and routing plan construction.
//!
//! A [`Router`] is built once from a schema's configuration and is
//! immutable afterwards; it can be queried from any number of threads.
//! [`Router::build_plan`] turns a parsed statement into a [`Plan`]: the
//! sub-tables and nodes the statement must reach, plus the rewritten SQL
//! for each node.

pub mod error;
pub mod plan;
mod rewrite;
pub mod sharding;

pub use error::Error;
pub use plan::{Criteria, Plan};

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use fnv::FnvHashMap;
use tracing::{debug, error};

use sqlshard_config::{SchemaConfig, ShardConfig, ShardType};

use crate::sql::table::normalize;
use crate::sql::{Assignment, Expr, InsertRows, Statement, TableName, Value};
use plan::PlanBuilder;
use sharding::{HashShard, NumRangeShard, ShardFunction};

/// Sub-table indices render as a four-digit suffix, which bounds how many
/// a rule may define.
pub const MAX_SUB_TABLES: usize = 10_000;

/// How a rule places rows across its sub-tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Default,
    Hash,
    Range,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Default => write!(f, "default"),
            RuleKind::Hash => write!(f, "hash"),
            RuleKind::Range => write!(f, "range"),
        }
    }
}

/// Sharding rule for one logical table: the shard key, the shard
/// function, and the placement of sub-tables onto nodes.
#[derive(Debug)]
pub struct Rule {
    db: String,
    table: String,
    key: String,
    kind: RuleKind,
    nodes: Vec<String>,
    table_to_node: Vec<usize>,
    shard: ShardFunction,
}

impl Rule {
    /// The implicit rule for unsharded tables: one sub-table on the
    /// schema's default node.
    fn default_rule(db: &str, node: &str) -> Self {
        Self {
            db: db.to_owned(),
            table: String::new(),
            key: String::new(),
            kind: RuleKind::Default,
            nodes: vec![node.to_owned()],
            table_to_node: vec![0],
            shard: ShardFunction::Default,
        }
    }

    fn from_config(db: &str, config: &ShardConfig) -> Result<Self, Error> {
        if config.locations.len() != config.nodes.len() {
            return Err(Error::LocationsCount(config.table.clone()));
        }
        let total: usize = config.locations.iter().sum();
        if total > MAX_SUB_TABLES {
            return Err(Error::TableCount(config.table.clone(), total));
        }

        let mut table_to_node = Vec::with_capacity(total);
        for (node_index, &count) in config.locations.iter().enumerate() {
            table_to_node.extend(std::iter::repeat(node_index).take(count));
        }

        let (kind, shard) = match config.shard_type {
            ShardType::Hash => (RuleKind::Hash, ShardFunction::Hash(HashShard::new(total))),
            ShardType::Range => {
                if config.table_row_limit == 0 {
                    return Err(Error::TableRowLimit(config.table.clone()));
                }
                (
                    RuleKind::Range,
                    ShardFunction::NumRange(NumRangeShard::new(
                        &config.locations,
                        config.table_row_limit,
                    )),
                )
            }
        };

        Ok(Self {
            db: db.to_owned(),
            table: normalize(&config.table),
            key: normalize(&config.key),
            kind,
            nodes: config.nodes.clone(),
            table_to_node,
            shard,
        })
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_default(&self) -> bool {
        self.kind == RuleKind::Default
    }

    /// Whether a column is this rule's shard key, spelling differences
    /// aside.
    pub fn is_key(&self, column: &str) -> bool {
        !self.key.is_empty() && normalize(column) == self.key
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// For each sub-table index, the index into [`nodes`](Self::nodes)
    /// where it lives.
    pub fn table_to_node(&self) -> &[usize] {
        &self.table_to_node
    }

    pub fn table_count(&self) -> usize {
        self.table_to_node.len()
    }

    pub fn shard(&self) -> &ShardFunction {
        &self.shard
    }

    /// Sub-table index holding a key value.
    pub fn find_table_index(&self, key: &Value) -> Result<usize, Error> {
        Ok(self.shard.find_for_key(key)?)
    }

    /// Node index holding a key value.
    pub fn find_node_index(&self, key: &Value) -> Result<usize, Error> {
        Ok(self.table_to_node[self.find_table_index(key)?])
    }

    /// Node identifier holding a key value.
    pub fn find_node(&self, key: &Value) -> Result<&str, Error> {
        Ok(&self.nodes[self.find_node_index(key)?])
    }

    /// Assignments may not move rows between nodes: on a multi-node rule
    /// the shard key is read-only.
    pub fn check_update_exprs(&self, exprs: &[Assignment]) -> Result<(), Error> {
        if self.is_default() || self.nodes.len() == 1 {
            return Ok(());
        }
        for assignment in exprs {
            if self.is_key(&assignment.column) {
                return Err(Error::UpdateKey);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}?key={}&shard={}&nodes={}",
            self.db,
            self.table,
            self.key,
            self.kind,
            self.nodes.join(", ")
        )
    }
}

/// Per-schema routing table.
#[derive(Debug)]
pub struct Router {
    db: String,
    nodes: Vec<String>,
    rules: FnvHashMap<String, Arc<Rule>>,
    default_rule: Arc<Rule>,
}

impl Router {
    /// Validate a schema configuration and build its router.
    pub fn new(schema: &SchemaConfig) -> Result<Self, Error> {
        if !schema.nodes.contains(&schema.rules.default) {
            return Err(Error::DefaultNode(schema.rules.default.clone()));
        }

        let default_rule = Arc::new(Rule::default_rule(&schema.db, &schema.rules.default));
        let mut rules: FnvHashMap<String, Arc<Rule>> = FnvHashMap::default();

        for config in &schema.rules.shard {
            for node in &config.nodes {
                if !schema.nodes.contains(node) {
                    return Err(Error::NodeNotInSchema {
                        table: config.table.clone(),
                        node: node.clone(),
                    });
                }
            }
            let rule = Rule::from_config(&schema.db, config)?;
            let table = rule.table().to_owned();
            if rules.insert(table.clone(), Arc::new(rule)).is_some() {
                return Err(Error::DuplicateTable(table));
            }
        }

        debug!(
            "router for schema \"{}\": {} shard rules over {} nodes",
            schema.db,
            rules.len(),
            schema.nodes.len()
        );

        Ok(Self {
            db: schema.db.clone(),
            nodes: schema.nodes.clone(),
            rules,
            default_rule,
        })
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn default_rule(&self) -> &Arc<Rule> {
        &self.default_rule
    }

    pub fn rules(&self) -> &FnvHashMap<String, Arc<Rule>> {
        &self.rules
    }

    /// The rule for a table, or the default rule if it has none.
    pub fn rule(&self, table: &TableName) -> &Arc<Rule> {
        self.rules.get(&table.key()).unwrap_or(&self.default_rule)
    }

    /// Build the routing plan for a statement.
    pub fn build_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        match stmt {
            Statement::Select(_) => self.build_select_plan(stmt),
            Statement::Insert(_) => self.build_insert_plan(stmt),
            Statement::Replace(_) => self.build_replace_plan(stmt),
            Statement::Update(_) => self.build_update_plan(stmt),
            Statement::Delete(_) => self.build_delete_plan(stmt),
            _ => Err(Error::NoPlan),
        }
    }

    fn build_select_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        let Statement::Select(select) = stmt else {
            return Err(Error::StmtConvert);
        };
        let (rule, criteria) = match &select.where_clause {
            Some(expr) => (self.rule(&select.from).clone(), Criteria::Where(expr.clone())),
            None => (self.default_rule.clone(), Criteria::None),
        };

        let mut builder = PlanBuilder::new(rule, criteria);
        builder
            .calc_route_indexes()
            .inspect_err(|err| error!("select routing failed: {}", err))?;
        builder
            .check_criteria()
            .inspect_err(|err| error!("select routing failed: {}", err))?;
        rewrite::select(builder, select)
    }

    fn build_insert_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        let Statement::Insert(insert) = stmt else {
            return Err(Error::StmtConvert);
        };
        if matches!(insert.rows, InsertRows::Select(_)) {
            return Err(Error::SelectInInsert);
        }

        let rule = self.rule(&insert.table).clone();
        if !insert.on_dup.is_empty() {
            rule.check_update_exprs(&insert.on_dup)?;
        }
        let criteria = insert_criteria(&rule, &insert.columns, &insert.rows)?;

        let mut builder = PlanBuilder::new(rule, criteria);
        builder
            .calc_route_indexes()
            .inspect_err(|err| error!("insert routing failed: {}", err))?;
        rewrite::insert(builder, insert)
    }

    fn build_update_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        let Statement::Update(update) = stmt else {
            return Err(Error::StmtConvert);
        };
        let rule = self.rule(&update.table).clone();
        rule.check_update_exprs(&update.exprs)?;

        let (rule, criteria) = match &update.where_clause {
            Some(expr) => (rule, Criteria::Where(expr.clone())),
            None => (self.default_rule.clone(), Criteria::None),
        };

        let mut builder = PlanBuilder::new(rule, criteria);
        builder
            .calc_route_indexes()
            .inspect_err(|err| error!("update routing failed: {}", err))?;
        builder
            .check_criteria()
            .inspect_err(|err| error!("update routing failed: {}", err))?;
        rewrite::update(builder, update)
    }

    fn build_delete_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        let Statement::Delete(delete) = stmt else {
            return Err(Error::StmtConvert);
        };
        let (rule, criteria) = match &delete.where_clause {
            Some(expr) => (self.rule(&delete.table).clone(), Criteria::Where(expr.clone())),
            None => (self.default_rule.clone(), Criteria::None),
        };

        let mut builder = PlanBuilder::new(rule, criteria);
        builder
            .calc_route_indexes()
            .inspect_err(|err| error!("delete routing failed: {}", err))?;
        builder
            .check_criteria()
            .inspect_err(|err| error!("delete routing failed: {}", err))?;
        rewrite::delete(builder, delete)
    }

    fn build_replace_plan(&self, stmt: &Statement) -> Result<Plan, Error> {
        let Statement::Replace(replace) = stmt else {
            return Err(Error::StmtConvert);
        };
        if matches!(replace.rows, InsertRows::Select(_)) {
            return Err(Error::SelectInReplace);
        }

        let rule = self.rule(&replace.table).clone();
        let criteria = insert_criteria(&rule, &replace.columns, &replace.rows)?;

        let mut builder = PlanBuilder::new(rule, criteria);
        builder
            .calc_route_indexes()
            .inspect_err(|err| error!("replace routing failed: {}", err))?;
        rewrite::replace(builder, replace)
    }
}

/// Project the `VALUES` rows of an insert or replace onto the rule's
/// shard key.
fn insert_criteria(rule: &Rule, columns: &[String], rows: &InsertRows) -> Result<Criteria, Error> {
    if rule.is_default() {
        return Ok(Criteria::None);
    }
    let InsertRows::Values(rows) = rows else {
        return Err(Error::StmtConvert);
    };
    let position = columns
        .iter()
        .position(|column| rule.is_key(column))
        .ok_or(Error::ColumnMissing)?;

    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        match row.get(position) {
            Some(Expr::Literal(value)) => keys.push(value.clone()),
            Some(expr) => {
                return Err(sharding::Error::KeyTypeMismatch(expr.to_string()).into());
            }
            None => return Err(Error::ColumnMissing),
        }
    }
    Ok(Criteria::Keys(keys))
}

/// Shared slot a dispatcher reads its router from. A configuration
/// reload builds a fresh [`Router`] and swaps it in; readers holding the
/// previous one keep it alive until their plans are done.
pub struct RouterHandle {
    inner: ArcSwap<Router>,
}

impl RouterHandle {
    pub fn new(router: Router) -> Self {
        Self {
            inner: ArcSwap::from_pointee(router),
        }
    }

    pub fn load(&self) -> Arc<Router> {
        self.inner.load_full()
    }

    pub fn replace(&self, router: Router) {
        self.inner.store(Arc::new(router));
    }
}
