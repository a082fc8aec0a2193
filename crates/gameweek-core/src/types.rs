//! Types shared between the store, the orchestrator and the API

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

use crate::CoreError;

/// Lifecycle of a gameweek.
///
/// ```text
/// Upcoming ──deadline──> Locked ──start──> Active ──end──> Finalized
/// ```
///
/// `Finalized` is terminal, nothing time based moves a gameweek out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameweekStatus {
    Upcoming,
    Locked,
    Active,
    Finalized,
}

impl GameweekStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Locked => "locked",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// Still waiting on its matches to kick off.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Upcoming | Self::Locked)
    }
}

impl fmt::Display for GameweekStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameweekStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "locked" => Ok(Self::Locked),
            "active" => Ok(Self::Active),
            "finalized" => Ok(Self::Finalized),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Completed,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Completed => "completed",
            Self::Postponed => "postponed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "completed" => Ok(Self::Completed),
            "postponed" => Ok(Self::Postponed),
            other => Err(CoreError::UnknownMatchStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goalkeeper => "GK",
            Self::Defender => "DEF",
            Self::Midfielder => "MID",
            Self::Forward => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Position {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GK" => Ok(Self::Goalkeeper),
            "DEF" => Ok(Self::Defender),
            "MID" => Ok(Self::Midfielder),
            "FWD" => Ok(Self::Forward),
            other => Err(CoreError::UnknownPosition(other.to_string())),
        }
    }
}

/// The three instants that drive a gameweek through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundaries {
    /// Roster lock
    #[serde(with = "time::serde::rfc3339")]
    pub deadline_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

/// Minimal view of a gameweek needed to resolve the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub number: i64,
    pub status: GameweekStatus,
    pub boundaries: Boundaries,
}

/// Outcome of resolving one gameweek against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGameweek {
    pub number: i64,
    pub status: GameweekStatus,
    pub is_current: bool,
    pub is_next: bool,
}

/// One player on a fantasy roster, joined with their numbers for a single gameweek.
///
/// Missing score records are represented as zero points and zero minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterPick {
    pub player_id: i64,
    pub position: Position,
    pub is_starter: bool,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub points: i32,
    pub minutes: i32,
}
