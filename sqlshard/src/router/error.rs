use thiserror::Error;

use super::sharding;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("statement type cannot be routed")]
    NoPlan,

    #[error("no routing criteria for sharded table")]
    NoCriteria,

    #[error("no route node")]
    NoRouteNode,

    #[error("insert touches more than one node")]
    InsertInMulti,

    #[error("update touches more than one node")]
    UpdateInMulti,

    #[error("delete touches more than one node")]
    DeleteInMulti,

    #[error("replace touches more than one node")]
    ReplaceInMulti,

    #[error("select in insert is not allowed")]
    SelectInInsert,

    #[error("select in replace is not allowed")]
    SelectInReplace,

    #[error("updating the sharding key is not allowed")]
    UpdateKey,

    #[error("statement does not match the rewriter family")]
    StmtConvert,

    #[error("insert or replace is missing the sharding column")]
    ColumnMissing,

    #[error("locations count does not match nodes count for table \"{0}\"")]
    LocationsCount(String),

    #[error("default node \"{0}\" is not in the schema nodes list")]
    DefaultNode(String),

    #[error("node \"{node}\" of table \"{table}\" is not in the schema nodes list")]
    NodeNotInSchema { table: String, node: String },

    #[error("duplicate rule for table \"{0}\"")]
    DuplicateTable(String),

    #[error("table \"{0}\" defines {1} sub-tables, the maximum is 10000")]
    TableCount(String, usize),

    #[error("range rule for table \"{0}\" requires a positive table_row_limit")]
    TableRowLimit(String),

    #[error("{0}")]
    Sharding(#[from] sharding::Error),
}
