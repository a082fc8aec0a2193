mod gameweeks;
mod notifications;

pub use gameweeks::*;
pub use notifications::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("problem querying db: {0}")]
    DbError(#[from] sqlx::Error),
    #[error("gameweek {gameweek} cannot be finalized, {pending} match(es) not completed")]
    IncompleteMatches { gameweek: i64, pending: i64 },
    #[error("settlement failed for team {team_id}: {reason}")]
    Settlement { team_id: i64, reason: String },
    #[error("background thread died: {0}")]
    Thread(String),
}
