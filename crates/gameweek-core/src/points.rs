//! Fantasy points for one roster in one gameweek
//!
//! Scoring runs in two passes. First every starter is resolved to a contribution,
//! swapping in a bench player of the same position when the starter did not play.
//! Then the captaincy bonus is applied on top of the resolved contributions, so a
//! captain who was substituted doubles the substitute's score.

use serde::Serialize;
use std::collections::HashSet;

use crate::{CoreError, RosterPick};

/// A bench player brought on for a starter who played no minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub out_player_id: i64,
    pub in_player_id: i64,
    pub points: i32,
}

/// Score breakdown for one roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamScore {
    pub total: i32,
    /// Sum of starter (or substitute) contributions
    pub base: i32,
    pub captain_bonus: i32,
    pub vice_captain_bonus: i32,
    pub substitutions: Vec<Substitution>,
}

/// Rosters with entries need exactly one captain and one vice-captain, on different players.
pub fn validate_roster(picks: &[RosterPick]) -> Result<(), CoreError> {
    if picks.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = picks.iter().find(|pick| !seen.insert(pick.player_id)) {
        return Err(CoreError::InvalidRoster(format!(
            "player {} appears more than once",
            duplicate.player_id
        )));
    }

    let captains: Vec<&RosterPick> = picks.iter().filter(|p| p.is_captain).collect();
    let vice_captains: Vec<&RosterPick> = picks.iter().filter(|p| p.is_vice_captain).collect();

    if captains.len() != 1 {
        return Err(CoreError::InvalidRoster(format!(
            "expected exactly one captain, found {}",
            captains.len()
        )));
    }
    if vice_captains.len() != 1 {
        return Err(CoreError::InvalidRoster(format!(
            "expected exactly one vice-captain, found {}",
            vice_captains.len()
        )));
    }
    if captains[0].player_id == vice_captains[0].player_id {
        return Err(CoreError::InvalidRoster(format!(
            "player {} cannot be both captain and vice-captain",
            captains[0].player_id
        )));
    }

    Ok(())
}

pub fn score_roster(picks: &[RosterPick]) -> TeamScore {
    let mut starters: Vec<&RosterPick> = picks.iter().filter(|p| p.is_starter).collect();
    if starters.is_empty() {
        return TeamScore::default();
    }
    starters.sort_by_key(|p| p.player_id);

    // best bench option first, lowest id wins a tie
    let mut bench: Vec<&RosterPick> = picks
        .iter()
        .filter(|p| !p.is_starter && p.minutes > 0)
        .collect();
    bench.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut used_bench = HashSet::new();
    let mut substitutions = Vec::new();
    let mut base = 0;
    let mut captain_contribution = 0;

    for starter in starters {
        let contribution = if starter.minutes > 0 {
            starter.points
        } else {
            match bench
                .iter()
                .find(|b| b.position == starter.position && !used_bench.contains(&b.player_id))
            {
                Some(sub) => {
                    used_bench.insert(sub.player_id);
                    substitutions.push(Substitution {
                        out_player_id: starter.player_id,
                        in_player_id: sub.player_id,
                        points: sub.points,
                    });
                    sub.points
                }
                None => 0,
            }
        };

        if starter.is_captain {
            captain_contribution = contribution;
        }
        base += contribution;
    }

    let captain_bonus = captain_contribution.max(0);
    let vice_captain_bonus = if captain_bonus == 0 {
        picks
            .iter()
            .find(|p| p.is_vice_captain)
            .map(|p| p.points.max(0))
            .unwrap_or(0)
    } else {
        0
    };

    TeamScore {
        total: base + captain_bonus + vice_captain_bonus,
        base,
        captain_bonus,
        vice_captain_bonus,
        substitutions,
    }
}
