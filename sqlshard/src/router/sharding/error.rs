use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("sharding key value {0} has an unsupported type")]
    KeyTypeMismatch(String),

    #[error("sharding key value {0} is out of range")]
    KeyOutOfRange(i64),
}
