//! Sharding router core for a SQL proxy.
//!
//! Given a parsed statement and a schema's shard rules, the router decides
//! which backend nodes and which physical sub-tables must execute it,
//! rewrites the statement once per sub-table, and returns the rewritten
//! SQL grouped by node. Dispatch and result merging happen elsewhere.

pub mod router;
pub mod sql;

pub use router::{Error, Plan, Router, RouterHandle, Rule};
