use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use gameweek::{
    app,
    domain::{
        FinalizeSummary, Gameweek, GameweekManager, GameweekOps, GameweekStats, GameweekStore,
        NewFantasyTeam, NewGameweek, NewPlayer, RosterEntry, TeamPoints,
    },
    AppState, DBConnection, GameweekError as Error,
};
use gameweek_core::{GameweekStatus, Position, ResolvedGameweek};
use mockall::mock;
use serde_json::Value;
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use time::{macros::datetime, Duration, OffsetDateTime};
use tower::ServiceExt;

mock! {
    #[derive(Send, Sync)]
    pub Store { }

    #[async_trait]
    impl GameweekOps for Store {
        async fn resolve_gameweek_status(&self, now: OffsetDateTime) -> Result<Vec<ResolvedGameweek>, Error>;
        async fn transfers_allowed(&self, now: OffsetDateTime) -> Result<bool, Error>;
        async fn calculate_team_points(&self, team_id: i64, gameweek: i64) -> Result<TeamPoints, Error>;
        async fn finalize_gameweek(&self, gameweek: i64) -> Result<FinalizeSummary, Error>;
        async fn current_gameweek(&self) -> Result<Option<Gameweek>, Error>;
        async fn next_gameweek(&self) -> Result<Option<Gameweek>, Error>;
        async fn latest_finalized_gameweek(&self) -> Result<i64, Error>;
        async fn display_gameweek(&self) -> Result<i64, Error>;
        async fn gameweek_stats(&self, gameweek: i64) -> Result<GameweekStats, Error>;
    }
}

/// Far enough ahead that refreshes driven by the real clock see the season as not started.
pub const SEASON_START: OffsetDateTime = datetime!(2099-08-16 17:30 UTC);

pub fn store_unavailable() -> Error {
    Error::DbError(sqlx::Error::PoolTimedOut)
}

pub fn gameweek(number: i64, status: GameweekStatus) -> Gameweek {
    let new = new_gameweek(number);
    Gameweek {
        number,
        deadline_time: new.deadline_time,
        start_time: new.start_time,
        end_time: new.end_time,
        status,
        is_current: false,
        is_next: false,
        finalized_at: None,
    }
}

/// Gameweeks one week apart: deadline, kick off 90 minutes later, end three days later.
pub fn new_gameweek(number: i64) -> NewGameweek {
    let deadline_time = SEASON_START + Duration::weeks(number - 1);
    NewGameweek {
        number,
        deadline_time,
        start_time: deadline_time + Duration::minutes(90),
        end_time: deadline_time + Duration::days(3),
    }
}

/// Mock whose reads all succeed with `current` as the current gameweek.
pub fn healthy_ops(current: Option<Gameweek>) -> MockStore {
    let mut ops = MockStore::new();
    ops.expect_resolve_gameweek_status()
        .returning(|_| Ok(Vec::new()));
    ops.expect_transfers_allowed().returning(|_| Ok(true));
    ops.expect_current_gameweek()
        .returning(move || Ok(current.clone()));
    ops.expect_next_gameweek().returning(|| Ok(None));
    ops.expect_latest_finalized_gameweek().returning(|| Ok(0));
    ops.expect_display_gameweek().returning(|| Ok(1));
    ops.expect_gameweek_stats().returning(|gameweek| {
        Ok(GameweekStats {
            gameweek,
            ..Default::default()
        })
    });
    ops
}

pub fn create_store(pool: SqlitePool) -> Arc<GameweekStore> {
    let db = DBConnection::new_with_pools(
        "test".to_string(),
        ":memory:".to_string(),
        pool.clone(),
        pool,
    );
    Arc::new(GameweekStore::new(db))
}

pub fn create_app(store: Arc<GameweekStore>) -> (Router, Arc<GameweekManager>) {
    let manager = Arc::new(GameweekManager::new(store.clone(), 10));
    let state = AppState {
        store,
        manager: manager.clone(),
        background_threads: Arc::new(HashMap::new()),
    };
    (app(state, vec![String::from("http://localhost:9990")]), manager)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// One team with a forward captain, midfield vice-captain, a starting defender and a bench defender.
pub async fn seed_team(store: &GameweekStore, first_player: i64) -> i64 {
    let team = store
        .add_fantasy_team(NewFantasyTeam {
            name: format!("team {}", first_player),
            league_id: None,
        })
        .await
        .unwrap();

    let positions = [
        Position::Forward,
        Position::Midfielder,
        Position::Defender,
        Position::Defender,
    ];
    for (offset, position) in positions.into_iter().enumerate() {
        store
            .add_player(NewPlayer {
                id: first_player + offset as i64,
                name: format!("player {}", first_player + offset as i64),
                position,
                club: String::new(),
            })
            .await
            .unwrap();
    }

    store
        .set_roster(
            team.id,
            vec![
                RosterEntry {
                    player_id: first_player,
                    is_starter: true,
                    is_captain: true,
                    is_vice_captain: false,
                },
                RosterEntry {
                    player_id: first_player + 1,
                    is_starter: true,
                    is_captain: false,
                    is_vice_captain: true,
                },
                RosterEntry {
                    player_id: first_player + 2,
                    is_starter: true,
                    is_captain: false,
                    is_vice_captain: false,
                },
                RosterEntry {
                    player_id: first_player + 3,
                    is_starter: false,
                    is_captain: false,
                    is_vice_captain: false,
                },
            ],
        )
        .await
        .unwrap();

    team.id
}
