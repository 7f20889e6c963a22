use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// Per-schema routing configuration: the logical database, the global node
/// pool, and the shard rules.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SchemaConfig {
    /// Logical database name clients connect to.
    pub db: String,

    /// Backend node identifiers. Every node referenced by a rule must
    /// appear here.
    pub nodes: Vec<String>,

    /// Routing rules for this schema.
    pub rules: RulesConfig,
}

impl SchemaConfig {
    /// Parse a schema configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let schema: SchemaConfig = toml::from_str(text)?;
        debug!(
            "schema \"{}\": {} nodes, {} shard rules",
            schema.db,
            schema.nodes.len(),
            schema.rules.shard.len()
        );
        Ok(schema)
    }
}

/// The default node and the sharded tables of a schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RulesConfig {
    /// Node receiving every statement that no shard rule claims.
    pub default: String,

    /// Shard rules, one per logical table.
    #[serde(default)]
    pub shard: Vec<ShardConfig>,
}

/// One sharded logical table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ShardConfig {
    /// Logical table name.
    pub table: String,

    /// Column whose value selects the sub-table.
    pub key: String,

    /// Shard function.
    #[serde(rename = "type")]
    pub shard_type: ShardType,

    /// Nodes hosting this table's sub-tables, in placement order.
    pub nodes: Vec<String>,

    /// Sub-table count per node; `locations[i]` sub-tables live on
    /// `nodes[i]`, laid out consecutively.
    pub locations: Vec<usize>,

    /// Rows per sub-table. Range rules only.
    #[serde(default)]
    pub table_row_limit: usize,
}

/// Shard function selector. The default (unsharded) placement is implicit
/// and cannot be configured as a rule.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShardType {
    Hash,
    Range,
}

impl Display for ShardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardType::Hash => write!(f, "hash"),
            ShardType::Range => write!(f, "range"),
        }
    }
}
