//! Shard functions: map a shard-key value to a sub-table index, and lift
//! to index sets for range predicates.

pub mod error;
pub mod range;

pub use error::Error;
pub use range::{NumKeyRange, NumRangeShard};

use std::hash::Hasher;
use std::ops::Bound;

use fnv::FnvHasher;

use crate::sql::Value;

/// The shard function of a rule, sized to the rule's sub-table count at
/// construction.
#[derive(Debug, Clone)]
pub enum ShardFunction {
    /// Single sub-table, everything maps to index 0.
    Default,
    /// `hash(key) mod shard_num`.
    Hash(HashShard),
    /// Consecutive integer intervals, one per sub-table.
    NumRange(NumRangeShard),
}

impl ShardFunction {
    /// Sub-table index for a single key value.
    pub fn find_for_key(&self, value: &Value) -> Result<usize, Error> {
        match self {
            ShardFunction::Default => Ok(0),
            ShardFunction::Hash(shard) => shard.find_for_key(value),
            ShardFunction::NumRange(shard) => shard.find_for_key(value),
        }
    }

    /// Sub-table indices whose key space intersects the given bounds.
    /// Callers check [`supports_range`](Self::supports_range) first; the
    /// hash arm answers with every index since a hash cannot narrow a
    /// range.
    pub fn find_for_range(
        &self,
        low: Bound<&Value>,
        high: Bound<&Value>,
    ) -> Result<Vec<usize>, Error> {
        match self {
            ShardFunction::Default => Ok(vec![0]),
            ShardFunction::Hash(shard) => Ok((0..shard.shard_num()).collect()),
            ShardFunction::NumRange(shard) => shard.find_for_range(low, high),
        }
    }

    /// Whether a range predicate over the key can narrow the index set.
    pub fn supports_range(&self) -> bool {
        !matches!(self, ShardFunction::Hash(_))
    }
}

/// Modulo hashing over a fixed sub-table count.
#[derive(Debug, Clone)]
pub struct HashShard {
    shard_num: usize,
}

impl HashShard {
    pub fn new(shard_num: usize) -> Self {
        Self { shard_num }
    }

    pub fn shard_num(&self) -> usize {
        self.shard_num
    }

    pub fn find_for_key(&self, value: &Value) -> Result<usize, Error> {
        Ok((hash_value(value)? % self.shard_num as u64) as usize)
    }
}

/// Hash a key value to an unsigned 64-bit integer. Integers map to their
/// two's-complement bit pattern; strings hash byte-wise with FNV-1a, which
/// is stable across platforms and releases.
pub(crate) fn hash_value(value: &Value) -> Result<u64, Error> {
    match value {
        Value::Integer(value) => Ok(*value as u64),
        Value::Text(value) => {
            let mut hasher = FnvHasher::default();
            hasher.write(value.as_bytes());
            Ok(hasher.finish())
        }
        Value::Null => Err(Error::KeyTypeMismatch(value.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_shard() {
        let shard = ShardFunction::Default;
        assert_eq!(shard.find_for_key(&Value::Integer(42)).unwrap(), 0);
        assert_eq!(
            shard
                .find_for_range(Bound::Unbounded, Bound::Unbounded)
                .unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_hash_integer() {
        let shard = HashShard::new(4);
        assert_eq!(shard.find_for_key(&Value::Integer(7)).unwrap(), 3);
        assert_eq!(shard.find_for_key(&Value::Integer(8)).unwrap(), 0);
    }

    #[test]
    fn test_hash_negative_integer_is_unsigned() {
        // -1 hashes as u64::MAX.
        let shard = HashShard::new(4);
        assert_eq!(shard.find_for_key(&Value::Integer(-1)).unwrap(), 3);
    }

    #[test]
    fn test_hash_text_vectors() {
        // FNV-1a 64 reference values; these pin the on-wire placement of
        // string keys.
        assert_eq!(
            hash_value(&Value::Text("abc".into())).unwrap(),
            16654208175385433931
        );
        assert_eq!(
            hash_value(&Value::Text("user_1001".into())).unwrap(),
            11490728967804066057
        );

        let shard = HashShard::new(4);
        assert_eq!(shard.find_for_key(&Value::Text("abc".into())).unwrap(), 3);
        assert_eq!(
            shard
                .find_for_key(&Value::Text("user_1001".into()))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_hash_null_fails() {
        let shard = HashShard::new(4);
        assert_eq!(
            shard.find_for_key(&Value::Null),
            Err(Error::KeyTypeMismatch("null".into()))
        );
    }

    #[test]
    fn test_hash_cannot_narrow_range() {
        let shard = ShardFunction::Hash(HashShard::new(4));
        assert!(!shard.supports_range());
        assert_eq!(
            shard
                .find_for_range(
                    Bound::Included(&Value::Integer(0)),
                    Bound::Included(&Value::Integer(1))
                )
                .unwrap(),
            vec![0, 1, 2, 3]
        );
    }
}
