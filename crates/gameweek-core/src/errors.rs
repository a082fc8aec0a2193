//! Shared error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    #[error("unknown gameweek status: {0}")]
    UnknownStatus(String),

    #[error("unknown match status: {0}")]
    UnknownMatchStatus(String),

    #[error("unknown position: {0}")]
    UnknownPosition(String),
}
