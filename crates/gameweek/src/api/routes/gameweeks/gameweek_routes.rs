use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::ErrorResponse,
    Json,
};
use gameweek_core::ResolvedGameweek;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;

use crate::{
    domain::{
        Error, FinalizeSummary, Gameweek, GameweekSnapshot, GameweekStats, MatchResult,
        NewGameweek, PlayerScore, RealMatch, TeamPoints, TransferGate,
    },
    startup::AppState,
};

#[derive(Debug, Serialize)]
pub struct GameweekNumber {
    pub gameweek: i64,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct IngestedScores {
    pub gameweek: i64,
    pub stored: usize,
}

pub async fn list_gameweeks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Gameweek>>, ErrorResponse> {
    state.store.list_gameweeks().await.map(Json).map_err(|e| {
        error!("error listing gameweeks: {:?}", e);
        e.into()
    })
}

// Admin only, gameweeks are laid out before the season starts
pub async fn create_gameweek(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewGameweek>,
) -> Result<(StatusCode, Json<Gameweek>), ErrorResponse> {
    state
        .store
        .add_gameweek(body)
        .await
        .map(|gameweek| (StatusCode::CREATED, Json(gameweek)))
        .map_err(|e| {
            error!("error creating gameweek: {:?}", e);
            e.into()
        })
}

pub async fn get_current_gameweek(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Gameweek>, ErrorResponse> {
    match state.store.current_gameweek().await {
        Ok(Some(gameweek)) => Ok(Json(gameweek)),
        Ok(None) => Err(Error::NotFound(String::from("no current gameweek")).into()),
        Err(e) => {
            error!("error getting current gameweek: {:?}", e);
            Err(e.into())
        }
    }
}

pub async fn get_next_gameweek(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Gameweek>, ErrorResponse> {
    match state.store.next_gameweek().await {
        Ok(Some(gameweek)) => Ok(Json(gameweek)),
        Ok(None) => Err(Error::NotFound(String::from("no next gameweek")).into()),
        Err(e) => {
            error!("error getting next gameweek: {:?}", e);
            Err(e.into())
        }
    }
}

pub async fn get_latest_finalized_gameweek(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GameweekNumber>, ErrorResponse> {
    state
        .store
        .latest_finalized_gameweek()
        .await
        .map(|gameweek| Json(GameweekNumber { gameweek }))
        .map_err(|e| {
            error!("error getting latest finalized gameweek: {:?}", e);
            e.into()
        })
}

pub async fn get_display_gameweek(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GameweekNumber>, ErrorResponse> {
    state
        .store
        .display_gameweek()
        .await
        .map(|gameweek| Json(GameweekNumber { gameweek }))
        .map_err(|e| {
            error!("error getting display gameweek: {:?}", e);
            e.into()
        })
}

pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<GameweekSnapshot> {
    Json(state.manager.snapshot().await)
}

pub async fn resolve_gameweeks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ResolvedGameweek>>, ErrorResponse> {
    state
        .manager
        .trigger_resolve(OffsetDateTime::now_utc())
        .await
        .map(Json)
        .map_err(|e| {
            error!("error resolving gameweeks: {:?}", e);
            e.into()
        })
}

pub async fn get_gameweek_stats(
    State(state): State<Arc<AppState>>,
    Path(gameweek): Path<i64>,
) -> Result<Json<GameweekStats>, ErrorResponse> {
    state
        .store
        .gameweek_stats(gameweek)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error getting stats for gameweek {}: {:?}", gameweek, e);
            e.into()
        })
}

pub async fn finalize_gameweek(
    State(state): State<Arc<AppState>>,
    Path(gameweek): Path<i64>,
    Json(body): Json<FinalizeRequest>,
) -> Result<Json<FinalizeSummary>, ErrorResponse> {
    info!(
        "finalize requested for gameweek {}, confirmed: {}",
        gameweek, body.confirm
    );
    state
        .manager
        .finalize(gameweek, body.confirm)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error finalizing gameweek {}: {:?}", gameweek, e);
            e.into()
        })
}

// Called by the results feed, not exposed publicly
pub async fn ingest_match(
    State(state): State<Arc<AppState>>,
    Path(gameweek): Path<i64>,
    Json(body): Json<MatchResult>,
) -> Result<Json<RealMatch>, ErrorResponse> {
    state
        .store
        .upsert_match(gameweek, body)
        .await
        .map(Json)
        .map_err(|e| {
            error!("error storing match for gameweek {}: {:?}", gameweek, e);
            e.into()
        })
}

// Called by the scoring feed, not exposed publicly
pub async fn ingest_scores(
    State(state): State<Arc<AppState>>,
    Path(gameweek): Path<i64>,
    Json(body): Json<Vec<PlayerScore>>,
) -> Result<Json<IngestedScores>, ErrorResponse> {
    state
        .store
        .upsert_player_scores(gameweek, body)
        .await
        .map(|stored| Json(IngestedScores { gameweek, stored }))
        .map_err(|e| {
            error!("error storing scores for gameweek {}: {:?}", gameweek, e);
            e.into()
        })
}

pub async fn get_transfers_allowed(State(state): State<Arc<AppState>>) -> Json<TransferGate> {
    Json(
        state
            .manager
            .transfers_allowed(OffsetDateTime::now_utc())
            .await,
    )
}

pub async fn get_team_points(
    State(state): State<Arc<AppState>>,
    Path((team_id, gameweek)): Path<(i64, i64)>,
) -> Result<Json<TeamPoints>, ErrorResponse> {
    state
        .manager
        .recalculate(team_id, gameweek)
        .await
        .map(Json)
        .map_err(|e| {
            error!(
                "error calculating points for team {} in gameweek {}: {:?}",
                team_id, gameweek, e
            );
            e.into()
        })
}
