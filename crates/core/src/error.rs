//! Errors raised while parsing exchange names.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),
}
