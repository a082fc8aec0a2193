mod manager;
mod settlement;
mod store;

pub use manager::*;
pub use settlement::*;
pub use store::*;

use gameweek_core::{Boundaries, GameweekStatus, MatchStatus, Position, TeamScore, TimelineEntry};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::OffsetDateTime;

use crate::infra::db::{parse_enum, parse_optional_datetime, parse_required_datetime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gameweek {
    pub number: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub status: GameweekStatus,
    pub is_current: bool,
    pub is_next: bool,
    /// Set only when the gameweek was settled through the finalizer
    #[serde(with = "time::serde::rfc3339::option")]
    pub finalized_at: Option<OffsetDateTime>,
}

impl Gameweek {
    pub fn boundaries(&self) -> Boundaries {
        Boundaries {
            deadline_time: self.deadline_time,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn timeline_entry(&self) -> TimelineEntry {
        TimelineEntry {
            number: self.number,
            status: self.status,
            boundaries: self.boundaries(),
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Gameweek {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Gameweek {
            number: row.try_get("number")?,
            deadline_time: parse_required_datetime(row, "deadline_time")?,
            start_time: parse_required_datetime(row, "start_time")?,
            end_time: parse_required_datetime(row, "end_time")?,
            status: parse_enum(row, "status")?,
            is_current: row.try_get("is_current")?,
            is_next: row.try_get("is_next")?,
            finalized_at: parse_optional_datetime(row, "finalized_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGameweek {
    pub number: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

impl NewGameweek {
    pub fn validate(&self) -> Result<(), String> {
        if self.number < 1 {
            return Err(format!("gameweek number must be positive, got {}", self.number));
        }
        if self.deadline_time > self.start_time {
            return Err(String::from("deadline_time must not be after start_time"));
        }
        if self.start_time > self.end_time {
            return Err(String::from("start_time must not be after end_time"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealMatch {
    pub id: i64,
    pub gameweek: i64,
    pub home_team: String,
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub kickoff_time: OffsetDateTime,
    pub status: MatchStatus,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

impl<'r> FromRow<'r, SqliteRow> for RealMatch {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(RealMatch {
            id: row.try_get("id")?,
            gameweek: row.try_get("gameweek")?,
            home_team: row.try_get("home_team")?,
            away_team: row.try_get("away_team")?,
            kickoff_time: parse_required_datetime(row, "kickoff_time")?,
            status: parse_enum(row, "status")?,
            home_score: row.try_get("home_score")?,
            away_score: row.try_get("away_score")?,
        })
    }
}

/// Fixture data pushed in by the ingest job, keyed by the provider's match id.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchResult {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    pub kickoff_time: OffsetDateTime,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_score: Option<i64>,
    #[serde(default)]
    pub away_score: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerScore {
    pub player_id: i64,
    pub points: i32,
    pub minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub id: i64,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub club: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFantasyTeam {
    pub name: String,
    pub league_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RosterEntry {
    pub player_id: i64,
    pub is_starter: bool,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FantasyTeam {
    pub id: i64,
    pub name: String,
    pub league_id: Option<i64>,
    pub total_points: i64,
    pub current_gameweek_points: i64,
    pub current_gameweek: i64,
    pub transfers_used: i64,
    pub banked_transfers: i64,
    pub rank: Option<i64>,
}

/// One settled row of the per team, per gameweek ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameweekPoints {
    pub fantasy_team_id: i64,
    pub gameweek: i64,
    pub points: i64,
    pub league_rank: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub calculated_at: OffsetDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for GameweekPoints {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(GameweekPoints {
            fantasy_team_id: row.try_get("fantasy_team_id")?,
            gameweek: row.try_get("gameweek")?,
            points: row.try_get("points")?,
            league_rank: row.try_get("league_rank")?,
            calculated_at: parse_required_datetime(row, "calculated_at")?,
        })
    }
}

/// Freshly computed points for a team, nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPoints {
    pub team_id: i64,
    pub gameweek: i64,
    pub points: i32,
    pub breakdown: TeamScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameweekStats {
    pub gameweek: i64,
    pub total_matches: i64,
    pub completed_matches: i64,
    pub live_matches: i64,
    pub scheduled_matches: i64,
    pub postponed_matches: i64,
    pub total_teams: i64,
    pub settled_teams: i64,
}

impl GameweekStats {
    pub fn all_matches_completed(&self) -> bool {
        self.completed_matches == self.total_matches
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizeSummary {
    pub gameweek: i64,
    pub teams_settled: usize,
    pub current_gameweek: Option<i64>,
    pub next_gameweek: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub finalized_at: OffsetDateTime,
}
