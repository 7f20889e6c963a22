//! Schema and shard rule configuration.

pub mod error;
pub mod sharding;

pub use error::Error;
pub use sharding::{RulesConfig, SchemaConfig, ShardConfig, ShardType};
