use gameweek_core::{
    resolve_timeline, score_roster, transfers_allowed_at, validate_roster, ResolvedGameweek,
    RosterPick,
};
use log::{debug, info, warn};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, Transaction};
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::{
    domain::Error,
    infra::db::{format_datetime, parse_enum, parse_optional_datetime, DBConnection},
};

use super::{
    build_settlement, FantasyTeam, FinalizeSummary, Gameweek, GameweekPoints, GameweekStats,
    MatchResult, NewFantasyTeam, NewGameweek, NewPlayer, PlayerScore, RealMatch, RosterEntry,
    SettlementBatch, SettlementInput, TeamPoints,
};

const GAMEWEEK_COLUMNS: &str = "number, deadline_time, start_time, end_time, status, is_current, is_next, finalized_at";
const TEAM_COLUMNS: &str = "id, name, league_id, total_points, current_gameweek_points, current_gameweek, transfers_used, banked_transfers, rank";

#[derive(Debug, Clone)]
pub struct GameweekStore {
    db_connection: DBConnection,
    max_banked_transfers: i64,
}

impl GameweekStore {
    pub fn new(db_connection: DBConnection) -> Self {
        Self {
            db_connection,
            max_banked_transfers: 1,
        }
    }

    pub fn with_max_banked_transfers(mut self, max_banked_transfers: i64) -> Self {
        self.max_banked_transfers = max_banked_transfers;
        self
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.db_connection.ping().await
    }

    pub async fn close(&self) {
        self.db_connection.close().await;
    }

    pub async fn add_gameweek(&self, gameweek: NewGameweek) -> Result<Gameweek, Error> {
        gameweek.validate().map_err(Error::BadRequest)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT number FROM gameweeks WHERE number = ?")
            .bind(gameweek.number)
            .fetch_optional(self.db_connection.read())
            .await?;
        if exists.is_some() {
            return Err(Error::BadRequest(format!(
                "gameweek {} already exists",
                gameweek.number
            )));
        }

        let query = format!(
            "INSERT INTO gameweeks (number, deadline_time, start_time, end_time)
             VALUES (?, ?, ?, ?)
             RETURNING {}",
            GAMEWEEK_COLUMNS
        );
        let created = sqlx::query_as::<_, Gameweek>(&query)
            .bind(gameweek.number)
            .bind(format_datetime(gameweek.deadline_time)?)
            .bind(format_datetime(gameweek.start_time)?)
            .bind(format_datetime(gameweek.end_time)?)
            .fetch_one(self.db_connection.write())
            .await?;

        info!("added gameweek {}", created.number);
        Ok(created)
    }

    pub async fn list_gameweeks(&self) -> Result<Vec<Gameweek>, Error> {
        let query = format!("SELECT {} FROM gameweeks ORDER BY number", GAMEWEEK_COLUMNS);
        let gameweeks = sqlx::query_as::<_, Gameweek>(&query)
            .fetch_all(self.db_connection.read())
            .await?;
        Ok(gameweeks)
    }

    pub async fn get_gameweek(&self, number: i64) -> Result<Gameweek, Error> {
        let query = format!("SELECT {} FROM gameweeks WHERE number = ?", GAMEWEEK_COLUMNS);
        sqlx::query_as::<_, Gameweek>(&query)
            .bind(number)
            .fetch_optional(self.db_connection.read())
            .await?
            .ok_or_else(|| Error::NotFound(format!("gameweek {} not found", number)))
    }

    pub async fn current_gameweek(&self) -> Result<Option<Gameweek>, Error> {
        let query = format!("SELECT {} FROM gameweeks WHERE is_current = 1", GAMEWEEK_COLUMNS);
        let gameweek = sqlx::query_as::<_, Gameweek>(&query)
            .fetch_optional(self.db_connection.read())
            .await?;
        Ok(gameweek)
    }

    pub async fn next_gameweek(&self) -> Result<Option<Gameweek>, Error> {
        let query = format!("SELECT {} FROM gameweeks WHERE is_next = 1", GAMEWEEK_COLUMNS);
        let gameweek = sqlx::query_as::<_, Gameweek>(&query)
            .fetch_optional(self.db_connection.read())
            .await?;
        Ok(gameweek)
    }

    /// Bring every gameweek's status and the current/next flags in line with `now`.
    ///
    /// Runs as one write transaction, readers see either the old flags or the new ones.
    pub async fn resolve_gameweek_status(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ResolvedGameweek>, Error> {
        let mut tx = self.db_connection.write().begin().await?;

        let query = format!("SELECT {} FROM gameweeks", GAMEWEEK_COLUMNS);
        let gameweeks = sqlx::query_as::<_, Gameweek>(&query)
            .fetch_all(&mut *tx)
            .await?;
        let stored: HashMap<i64, Gameweek> = gameweeks
            .into_iter()
            .map(|gameweek| (gameweek.number, gameweek))
            .collect();

        let entries: Vec<_> = stored.values().map(Gameweek::timeline_entry).collect();
        let resolved = resolve_timeline(now, &entries);

        for gameweek in &resolved {
            let Some(previous) = stored.get(&gameweek.number) else {
                continue;
            };
            if previous.status != gameweek.status {
                debug!(
                    "gameweek {} moved from {} to {}",
                    gameweek.number, previous.status, gameweek.status
                );
                sqlx::query("UPDATE gameweeks SET status = ? WHERE number = ?")
                    .bind(gameweek.status.as_str())
                    .bind(gameweek.number)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query("UPDATE gameweeks SET is_current = 0, is_next = 0 WHERE is_current = 1 OR is_next = 1")
            .execute(&mut *tx)
            .await?;

        if let Some(current) = resolved.iter().find(|gameweek| gameweek.is_current) {
            sqlx::query("UPDATE gameweeks SET is_current = 1 WHERE number = ?")
                .bind(current.number)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(next) = resolved.iter().find(|gameweek| gameweek.is_next) {
            sqlx::query("UPDATE gameweeks SET is_next = 1 WHERE number = ?")
                .bind(next.number)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            "resolved {} gameweek(s), current: {:?}",
            resolved.len(),
            resolved.iter().find(|g| g.is_current).map(|g| g.number)
        );
        Ok(resolved)
    }

    /// Transfer gate, evaluated against the clock rather than the stored statuses.
    pub async fn transfers_allowed(&self, now: OffsetDateTime) -> Result<bool, Error> {
        let query = format!("SELECT {} FROM gameweeks", GAMEWEEK_COLUMNS);
        let entries: Vec<_> = sqlx::query_as::<_, Gameweek>(&query)
            .fetch_all(self.db_connection.read())
            .await?
            .iter()
            .map(Gameweek::timeline_entry)
            .collect();

        let allowed = transfers_allowed_at(now, &entries);
        debug!("transfers allowed at {}: {}", now, allowed);
        Ok(allowed)
    }

    /// Points a team would score for a gameweek right now. Nothing is written.
    pub async fn calculate_team_points(
        &self,
        team_id: i64,
        gameweek: i64,
    ) -> Result<TeamPoints, Error> {
        self.get_fantasy_team(team_id).await?;
        self.get_gameweek(gameweek).await?;

        let picks = load_team_picks(self.db_connection.read(), team_id, gameweek).await?;
        if let Err(e) = validate_roster(&picks) {
            warn!("team {} roster is not valid for scoring: {}", team_id, e);
        }

        let breakdown = score_roster(&picks);
        Ok(TeamPoints {
            team_id,
            gameweek,
            points: breakdown.total,
            breakdown,
        })
    }

    /// Settle a gameweek: score every team, write the ledger, totals and ranks,
    /// then hand the current flag to the following gameweek. Settling it again later
    /// corrects points and ranks without moving the season.
    ///
    /// All of it commits together or not at all.
    pub async fn finalize_gameweek(&self, gameweek: i64) -> Result<FinalizeSummary, Error> {
        let mut tx = self.db_connection.write().begin().await?;

        let Some(target) = sqlx::query("SELECT finalized_at FROM gameweeks WHERE number = ?")
            .bind(gameweek)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Err(Error::NotFound(format!("gameweek {} not found", gameweek)));
        };
        let settled_at = parse_optional_datetime(&target, "finalized_at")?;

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM real_matches WHERE gameweek = ? AND status != 'completed'",
        )
        .bind(gameweek)
        .fetch_one(&mut *tx)
        .await?;
        if pending > 0 {
            warn!(
                "refusing to finalize gameweek {}, {} match(es) not completed",
                gameweek, pending
            );
            return Err(Error::IncompleteMatches { gameweek, pending });
        }

        let query = format!("SELECT {} FROM fantasy_teams ORDER BY id", TEAM_COLUMNS);
        let teams = sqlx::query_as::<_, FantasyTeam>(&query)
            .fetch_all(&mut *tx)
            .await?;

        let mut picks = load_all_picks(&mut *tx, gameweek).await?;

        let previous: HashMap<i64, i64> = sqlx::query(
            "SELECT fantasy_team_id, points FROM fantasy_team_gameweek_points WHERE gameweek = ?",
        )
        .bind(gameweek)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| -> Result<(i64, i64), sqlx::Error> {
            Ok((row.try_get("fantasy_team_id")?, row.try_get("points")?))
        })
        .collect::<Result<_, _>>()?;

        let inputs = teams
            .into_iter()
            .map(|team| SettlementInput {
                picks: picks.remove(&team.id).unwrap_or_default(),
                previous_points: previous.get(&team.id).copied(),
                team,
            })
            .collect();

        let batch = build_settlement(gameweek, inputs, self.max_banked_transfers)?;

        let calculated_at = format_datetime(OffsetDateTime::now_utc())?;
        for team in &batch.teams {
            sqlx::query(
                "INSERT INTO fantasy_team_gameweek_points
                    (fantasy_team_id, gameweek, points, league_rank, calculated_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (fantasy_team_id, gameweek) DO UPDATE SET
                    points = excluded.points,
                    league_rank = excluded.league_rank,
                    calculated_at = excluded.calculated_at",
            )
            .bind(team.team_id)
            .bind(gameweek)
            .bind(team.points)
            .bind(team.league_rank)
            .bind(&calculated_at)
            .execute(&mut *tx)
            .await?;
        }

        let summary = match settled_at {
            None => Self::settle_first_time(&mut tx, gameweek, &batch).await?,
            Some(finalized_at) => {
                Self::resettle(&mut tx, gameweek, &batch, finalized_at).await?
            }
        };

        tx.commit().await?;

        info!(
            "finalized gameweek {}, settled {} team(s)",
            gameweek, summary.teams_settled
        );

        Ok(summary)
    }

    /// First settlement of a gameweek: teams move on to the following gameweek with a
    /// fresh transfer allowance and the season flags advance.
    async fn settle_first_time(
        tx: &mut Transaction<'_, Sqlite>,
        gameweek: i64,
        batch: &SettlementBatch,
    ) -> Result<FinalizeSummary, Error> {
        let finalized_at = OffsetDateTime::now_utc();
        let finalized_at_str = format_datetime(finalized_at)?;

        for team in &batch.teams {
            sqlx::query(
                "UPDATE fantasy_teams SET
                    total_points = ?,
                    current_gameweek_points = ?,
                    current_gameweek = ?,
                    transfers_used = 0,
                    banked_transfers = ?,
                    rank = ?
                 WHERE id = ?",
            )
            .bind(team.total_points)
            .bind(team.points)
            .bind(gameweek + 1)
            .bind(team.banked_transfers)
            .bind(team.overall_rank)
            .bind(team.team_id)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            "UPDATE gameweeks SET status = 'finalized', finalized_at = ?, is_current = 0, is_next = 0
             WHERE number = ?",
        )
        .bind(&finalized_at_str)
        .bind(gameweek)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE gameweeks SET is_current = 0, is_next = 0 WHERE is_current = 1 OR is_next = 1")
            .execute(&mut **tx)
            .await?;

        // a gameweek that was already settled keeps its status
        let promoted = sqlx::query(
            "UPDATE gameweeks SET
                status = CASE WHEN status = 'finalized' THEN status ELSE 'active' END,
                is_current = 1
             WHERE number = ?",
        )
        .bind(gameweek + 1)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        let next = sqlx::query("UPDATE gameweeks SET is_next = 1 WHERE number = ?")
            .bind(gameweek + 2)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(FinalizeSummary {
            gameweek,
            teams_settled: batch.teams.len(),
            current_gameweek: (promoted > 0).then_some(gameweek + 1),
            next_gameweek: (next > 0).then_some(gameweek + 2),
            finalized_at,
        })
    }

    /// Settling a gameweek again only corrects points and ranks. Team pointers, transfer
    /// counters and season flags were advanced the first time and stay where they are.
    /// `current_gameweek_points` is rewritten only while no later gameweek has been settled.
    async fn resettle(
        tx: &mut Transaction<'_, Sqlite>,
        gameweek: i64,
        batch: &SettlementBatch,
        finalized_at: OffsetDateTime,
    ) -> Result<FinalizeSummary, Error> {
        let later_settled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gameweeks WHERE number > ? AND finalized_at IS NOT NULL",
        )
        .bind(gameweek)
        .fetch_one(&mut **tx)
        .await?;
        let latest = later_settled == 0;
        if !latest {
            info!(
                "gameweek {} is settled again after later gameweeks, only points and ranks change",
                gameweek
            );
        }

        for team in &batch.teams {
            sqlx::query(
                "UPDATE fantasy_teams SET
                    total_points = ?,
                    current_gameweek_points = CASE WHEN ? THEN ? ELSE current_gameweek_points END,
                    rank = ?
                 WHERE id = ?",
            )
            .bind(team.total_points)
            .bind(latest)
            .bind(team.points)
            .bind(team.overall_rank)
            .bind(team.team_id)
            .execute(&mut **tx)
            .await?;
        }

        let current: Option<i64> =
            sqlx::query_scalar("SELECT number FROM gameweeks WHERE is_current = 1")
                .fetch_optional(&mut **tx)
                .await?;
        let next: Option<i64> = sqlx::query_scalar("SELECT number FROM gameweeks WHERE is_next = 1")
            .fetch_optional(&mut **tx)
            .await?;

        Ok(FinalizeSummary {
            gameweek,
            teams_settled: batch.teams.len(),
            current_gameweek: current,
            next_gameweek: next,
            finalized_at,
        })
    }

    pub async fn latest_finalized_gameweek(&self) -> Result<i64, Error> {
        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(number) FROM gameweeks WHERE status = 'finalized'")
                .fetch_one(self.db_connection.read())
                .await?;
        Ok(latest.unwrap_or_default())
    }

    /// Gameweek the UI should show: the current one, else the latest settled one, else the first.
    pub async fn display_gameweek(&self) -> Result<i64, Error> {
        if let Some(current) = self.current_gameweek().await? {
            return Ok(current.number);
        }

        let latest = self.latest_finalized_gameweek().await?;
        if latest > 0 {
            return Ok(latest);
        }

        let first: Option<i64> = sqlx::query_scalar("SELECT MIN(number) FROM gameweeks")
            .fetch_one(self.db_connection.read())
            .await?;
        Ok(first.unwrap_or_default())
    }

    pub async fn gameweek_stats(&self, gameweek: i64) -> Result<GameweekStats, Error> {
        self.get_gameweek(gameweek).await?;

        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total_matches,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed_matches,
                COALESCE(SUM(CASE WHEN status = 'live' THEN 1 ELSE 0 END), 0) AS live_matches,
                COALESCE(SUM(CASE WHEN status = 'scheduled' THEN 1 ELSE 0 END), 0) AS scheduled_matches,
                COALESCE(SUM(CASE WHEN status = 'postponed' THEN 1 ELSE 0 END), 0) AS postponed_matches
             FROM real_matches
             WHERE gameweek = ?",
        )
        .bind(gameweek)
        .fetch_one(self.db_connection.read())
        .await?;

        let total_teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fantasy_teams")
            .fetch_one(self.db_connection.read())
            .await?;
        let settled_teams: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fantasy_team_gameweek_points WHERE gameweek = ?",
        )
        .bind(gameweek)
        .fetch_one(self.db_connection.read())
        .await?;

        Ok(GameweekStats {
            gameweek,
            total_matches: row.try_get("total_matches")?,
            completed_matches: row.try_get("completed_matches")?,
            live_matches: row.try_get("live_matches")?,
            scheduled_matches: row.try_get("scheduled_matches")?,
            postponed_matches: row.try_get("postponed_matches")?,
            total_teams,
            settled_teams,
        })
    }

    pub async fn upsert_match(&self, gameweek: i64, result: MatchResult) -> Result<RealMatch, Error> {
        self.get_gameweek(gameweek).await?;

        let real_match = sqlx::query_as::<_, RealMatch>(
            "INSERT INTO real_matches
                (id, gameweek, home_team, away_team, kickoff_time, status, home_score, away_score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                gameweek = excluded.gameweek,
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                kickoff_time = excluded.kickoff_time,
                status = excluded.status,
                home_score = excluded.home_score,
                away_score = excluded.away_score
             RETURNING id, gameweek, home_team, away_team, kickoff_time, status, home_score, away_score",
        )
        .bind(result.id)
        .bind(gameweek)
        .bind(&result.home_team)
        .bind(&result.away_team)
        .bind(format_datetime(result.kickoff_time)?)
        .bind(result.status.as_str())
        .bind(result.home_score)
        .bind(result.away_score)
        .fetch_one(self.db_connection.write())
        .await?;

        debug!(
            "stored match {} for gameweek {} as {}",
            real_match.id, gameweek, real_match.status
        );
        Ok(real_match)
    }

    pub async fn list_matches(&self, gameweek: i64) -> Result<Vec<RealMatch>, Error> {
        let matches = sqlx::query_as::<_, RealMatch>(
            "SELECT id, gameweek, home_team, away_team, kickoff_time, status, home_score, away_score
             FROM real_matches WHERE gameweek = ? ORDER BY kickoff_time, id",
        )
        .bind(gameweek)
        .fetch_all(self.db_connection.read())
        .await?;
        Ok(matches)
    }

    pub async fn upsert_player_score(&self, gameweek: i64, score: PlayerScore) -> Result<(), Error> {
        self.upsert_player_scores(gameweek, vec![score]).await?;
        Ok(())
    }

    /// Store a batch of scores from the scoring feed. Either every score is written or none.
    pub async fn upsert_player_scores(
        &self,
        gameweek: i64,
        scores: Vec<PlayerScore>,
    ) -> Result<usize, Error> {
        if let Some(score) = scores.iter().find(|score| score.minutes < 0) {
            return Err(Error::BadRequest(format!(
                "minutes cannot be negative for player {}",
                score.player_id
            )));
        }

        let mut tx = self.db_connection.write().begin().await?;

        let known: Option<i64> = sqlx::query_scalar("SELECT number FROM gameweeks WHERE number = ?")
            .bind(gameweek)
            .fetch_optional(&mut *tx)
            .await?;
        if known.is_none() {
            return Err(Error::NotFound(format!("gameweek {} not found", gameweek)));
        }

        for score in &scores {
            let player: Option<i64> = sqlx::query_scalar("SELECT id FROM players WHERE id = ?")
                .bind(score.player_id)
                .fetch_optional(&mut *tx)
                .await?;
            if player.is_none() {
                return Err(Error::NotFound(format!("player {} not found", score.player_id)));
            }

            sqlx::query(
                "INSERT INTO gameweek_scores (player_id, gameweek, points, minutes)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (player_id, gameweek) DO UPDATE SET
                    points = excluded.points,
                    minutes = excluded.minutes",
            )
            .bind(score.player_id)
            .bind(gameweek)
            .bind(score.points)
            .bind(score.minutes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("stored {} score(s) for gameweek {}", scores.len(), gameweek);

        Ok(scores.len())
    }

    pub async fn add_league(&self, name: &str) -> Result<i64, Error> {
        let id: i64 = sqlx::query_scalar("INSERT INTO leagues (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(self.db_connection.write())
            .await?;
        Ok(id)
    }

    pub async fn add_player(&self, player: NewPlayer) -> Result<i64, Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO players (id, name, position, club) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(player.position.as_str())
        .bind(&player.club)
        .fetch_one(self.db_connection.write())
        .await?;
        Ok(id)
    }

    pub async fn add_fantasy_team(&self, team: NewFantasyTeam) -> Result<FantasyTeam, Error> {
        let query = format!(
            "INSERT INTO fantasy_teams (name, league_id) VALUES (?, ?) RETURNING {}",
            TEAM_COLUMNS
        );
        let team = sqlx::query_as::<_, FantasyTeam>(&query)
            .bind(&team.name)
            .bind(team.league_id)
            .fetch_one(self.db_connection.write())
            .await?;
        Ok(team)
    }

    pub async fn get_fantasy_team(&self, team_id: i64) -> Result<FantasyTeam, Error> {
        let query = format!("SELECT {} FROM fantasy_teams WHERE id = ?", TEAM_COLUMNS);
        sqlx::query_as::<_, FantasyTeam>(&query)
            .bind(team_id)
            .fetch_optional(self.db_connection.read())
            .await?
            .ok_or_else(|| Error::NotFound(format!("fantasy team {} not found", team_id)))
    }

    /// Replace a team's roster in one go.
    pub async fn set_roster(&self, team_id: i64, entries: Vec<RosterEntry>) -> Result<(), Error> {
        self.get_fantasy_team(team_id).await?;

        let mut tx = self.db_connection.write().begin().await?;
        sqlx::query("DELETE FROM rosters WHERE fantasy_team_id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO rosters (fantasy_team_id, player_id, is_starter, is_captain, is_vice_captain)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(team_id)
            .bind(entry.player_id)
            .bind(entry.is_starter)
            .bind(entry.is_captain)
            .bind(entry.is_vice_captain)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn team_gameweek_points(
        &self,
        team_id: i64,
        gameweek: i64,
    ) -> Result<Option<GameweekPoints>, Error> {
        let points = sqlx::query_as::<_, GameweekPoints>(
            "SELECT fantasy_team_id, gameweek, points, league_rank, calculated_at
             FROM fantasy_team_gameweek_points
             WHERE fantasy_team_id = ? AND gameweek = ?",
        )
        .bind(team_id)
        .bind(gameweek)
        .fetch_optional(self.db_connection.read())
        .await?;
        Ok(points)
    }
}

const PICK_QUERY: &str = "SELECT
        r.fantasy_team_id,
        r.player_id,
        p.position,
        r.is_starter,
        r.is_captain,
        r.is_vice_captain,
        COALESCE(s.points, 0) AS points,
        COALESCE(s.minutes, 0) AS minutes
     FROM rosters r
     JOIN players p ON p.id = r.player_id
     LEFT JOIN gameweek_scores s ON s.player_id = r.player_id AND s.gameweek = ?";

fn pick_from_row(row: &SqliteRow) -> Result<(i64, RosterPick), sqlx::Error> {
    Ok((
        row.try_get("fantasy_team_id")?,
        RosterPick {
            player_id: row.try_get("player_id")?,
            position: parse_enum(row, "position")?,
            is_starter: row.try_get("is_starter")?,
            is_captain: row.try_get("is_captain")?,
            is_vice_captain: row.try_get("is_vice_captain")?,
            points: row.try_get("points")?,
            minutes: row.try_get("minutes")?,
        },
    ))
}

async fn load_team_picks<'e, E>(
    executor: E,
    team_id: i64,
    gameweek: i64,
) -> Result<Vec<RosterPick>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("{} WHERE r.fantasy_team_id = ?", PICK_QUERY);
    sqlx::query(&query)
        .bind(gameweek)
        .bind(team_id)
        .fetch_all(executor)
        .await?
        .iter()
        .map(|row| pick_from_row(row).map(|(_, pick)| pick))
        .collect()
}

async fn load_all_picks<'e, E>(
    executor: E,
    gameweek: i64,
) -> Result<HashMap<i64, Vec<RosterPick>>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut picks: HashMap<i64, Vec<RosterPick>> = HashMap::new();
    for row in sqlx::query(PICK_QUERY)
        .bind(gameweek)
        .fetch_all(executor)
        .await?
    {
        let (team_id, pick) = pick_from_row(&row)?;
        picks.entry(team_id).or_default().push(pick);
    }
    Ok(picks)
}
