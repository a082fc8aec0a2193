use gameweek_core::{rank_teams, score_roster, validate_roster, RosterPick};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

use crate::domain::Error;

use super::FantasyTeam;

/// Everything loaded for one team before a gameweek is settled.
#[derive(Debug, Clone)]
pub struct SettlementInput {
    pub team: FantasyTeam,
    pub picks: Vec<RosterPick>,
    /// Points already written to the ledger for this team and gameweek, if it was settled before
    pub previous_points: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSettlement {
    pub team_id: i64,
    pub points: i64,
    pub total_points: i64,
    pub league_rank: Option<i64>,
    pub overall_rank: i64,
    pub banked_transfers: i64,
}

#[derive(Debug, Clone)]
pub struct SettlementBatch {
    pub gameweek: i64,
    pub teams: Vec<TeamSettlement>,
}

/// Compute the full settlement of a gameweek in memory.
///
/// Nothing here touches the database, a returned error means no team is settled.
pub fn build_settlement(
    gameweek: i64,
    inputs: Vec<SettlementInput>,
    max_banked_transfers: i64,
) -> Result<SettlementBatch, Error> {
    let mut teams = Vec::with_capacity(inputs.len());
    let mut leagues: HashMap<i64, Option<i64>> = HashMap::with_capacity(inputs.len());

    for input in inputs {
        let team_id = input.team.id;
        validate_roster(&input.picks).map_err(|e| Error::Settlement {
            team_id,
            reason: e.to_string(),
        })?;

        let points = i64::from(score_roster(&input.picks).total);
        let total_points =
            input.team.total_points - input.previous_points.unwrap_or_default() + points;
        let banked_transfers = (input.team.banked_transfers + 1).min(max_banked_transfers);

        leagues.insert(team_id, input.team.league_id);
        teams.push(TeamSettlement {
            team_id,
            points,
            total_points,
            league_rank: None,
            overall_rank: 0,
            banked_transfers,
        });
    }

    let league_ranks: HashMap<i64, i64> = teams
        .iter()
        .filter_map(|team| {
            leagues
                .get(&team.team_id)
                .copied()
                .flatten()
                .map(|league_id| (league_id, (team.team_id, team.points)))
        })
        .into_group_map()
        .into_values()
        .flat_map(rank_teams)
        .map(|ranked| (ranked.team_id, ranked.rank))
        .collect();

    let overall_ranks: HashMap<i64, i64> =
        rank_teams(teams.iter().map(|team| (team.team_id, team.total_points)))
            .into_iter()
            .map(|ranked| (ranked.team_id, ranked.rank))
            .collect();

    for team in teams.iter_mut() {
        team.league_rank = league_ranks.get(&team.team_id).copied();
        team.overall_rank = overall_ranks
            .get(&team.team_id)
            .copied()
            .unwrap_or_default();
    }

    let batch = SettlementBatch { gameweek, teams };
    validate_batch(&batch, &leagues)?;
    Ok(batch)
}

/// Each team settles once and every league table (and the overall table) ranks `1..=n`.
pub fn validate_batch(
    batch: &SettlementBatch,
    leagues: &HashMap<i64, Option<i64>>,
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for team in &batch.teams {
        if !seen.insert(team.team_id) {
            return Err(Error::Settlement {
                team_id: team.team_id,
                reason: String::from("team appears more than once in the batch"),
            });
        }
        if leagues.get(&team.team_id).copied().flatten().is_some() != team.league_rank.is_some() {
            return Err(Error::Settlement {
                team_id: team.team_id,
                reason: String::from("league rank does not match league membership"),
            });
        }
    }

    let overall: Vec<(i64, i64)> = batch
        .teams
        .iter()
        .map(|team| (team.team_id, team.overall_rank))
        .collect();
    check_contiguous(&overall)?;

    let by_league = batch
        .teams
        .iter()
        .filter_map(|team| {
            let league_id = leagues.get(&team.team_id).copied().flatten()?;
            Some((league_id, (team.team_id, team.league_rank.unwrap_or_default())))
        })
        .into_group_map();
    for ranks in by_league.values() {
        check_contiguous(ranks)?;
    }

    Ok(())
}

fn check_contiguous(ranks: &[(i64, i64)]) -> Result<(), Error> {
    let sorted: Vec<&(i64, i64)> = ranks.iter().sorted_by_key(|(_, rank)| *rank).collect();
    for (expected, (team_id, rank)) in (1_i64..).zip(sorted) {
        if *rank != expected {
            return Err(Error::Settlement {
                team_id: *team_id,
                reason: format!("rank {} out of sequence, expected {}", rank, expected),
            });
        }
    }
    Ok(())
}
