use crate::helpers::*;
use axum::http::{Method, StatusCode};
use gameweek::domain::{MatchResult, PlayerScore, RosterEntry};
use gameweek_core::MatchStatus;
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "./migrations")]
async fn test_health_check(pool: SqlitePool) {
    let (app, _) = create_app(create_store(pool));
    let (status, _) = send(&app, Method::GET, "/api/v1/health_check", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_list_gameweeks(pool: SqlitePool) {
    let (app, _) = create_app(create_store(pool));

    let body = json!({
        "number": 1,
        "deadline_time": "2024-08-16T17:30:00Z",
        "start_time": "2024-08-16T19:00:00Z",
        "end_time": "2024-08-19T22:00:00Z",
    });
    let (status, created) = send(&app, Method::POST, "/api/v1/gameweeks", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["number"], 1);
    assert_eq!(created["status"], "upcoming");

    let (status, error) = send(&app, Method::POST, "/api/v1/gameweeks", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().contains("already exists"));

    let (status, listed) = send(&app, Method::GET, "/api/v1/gameweeks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_current_and_next_need_a_resolve(pool: SqlitePool) {
    let store = create_store(pool);
    for number in 1..=2 {
        store.add_gameweek(new_gameweek(number)).await.unwrap();
    }
    let (app, _) = create_app(store.clone());

    let (status, error) = send(&app, Method::GET, "/api/v1/gameweeks/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "item not found: no current gameweek");

    store
        .resolve_gameweek_status(SEASON_START - time::Duration::days(1))
        .await
        .unwrap();

    let (status, current) = send(&app, Method::GET, "/api/v1/gameweeks/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["number"], 1);
    assert_eq!(current["is_current"], true);

    let (_, next) = send(&app, Method::GET, "/api/v1/gameweeks/next", None).await;
    assert_eq!(next["number"], 2);

    let (_, display) = send(&app, Method::GET, "/api/v1/gameweeks/display", None).await;
    assert_eq!(display["gameweek"], 1);

    let (_, latest) = send(&app, Method::GET, "/api/v1/gameweeks/latest_finalized", None).await;
    assert_eq!(latest["gameweek"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_transfers_allowed_on_empty_season(pool: SqlitePool) {
    let (app, _) = create_app(create_store(pool));
    let (status, gate) = send(&app, Method::GET, "/api/v1/transfers/allowed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gate, json!({ "allowed": true, "degraded": false }));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_finalize_flow(pool: SqlitePool) {
    let store = create_store(pool);
    for number in 1..=3 {
        store.add_gameweek(new_gameweek(number)).await.unwrap();
    }
    let team_id = seed_team(&store, 1).await;
    let (app, _) = create_app(store.clone());

    let kickoff = new_gameweek(1).start_time;
    let (status, stored) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/matches",
        Some(json!({
            "id": 100,
            "home_team": "Arsenal",
            "away_team": "Wolves",
            "kickoff_time": "2099-08-16T19:00:00Z",
            "status": "live",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "live");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/scores",
        Some(json!([
            { "player_id": 1, "points": 5, "minutes": 90 },
            { "player_id": 2, "points": 3, "minutes": 90 },
            { "player_id": 4, "points": 4, "minutes": 90 },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/finalize",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/finalize",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error["error"].as_str().unwrap().contains("1 match(es)"));

    let (_, stats) = send(&app, Method::GET, "/api/v1/gameweeks/1/stats", None).await;
    assert_eq!(stats["live_matches"], 1);
    assert_eq!(stats["settled_teams"], 0);

    store
        .upsert_match(
            1,
            MatchResult {
                id: 100,
                home_team: String::from("Arsenal"),
                away_team: String::from("Wolves"),
                kickoff_time: kickoff,
                status: MatchStatus::Completed,
                home_score: Some(2),
                away_score: Some(0),
            },
        )
        .await
        .unwrap();

    let (status, points) = send(
        &app,
        Method::GET,
        &format!("/api/v1/teams/{}/gameweeks/1/points", team_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points["points"], 17);
    assert_eq!(points["breakdown"]["substitutions"][0]["in_player_id"], 4);

    let (status, summary) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/finalize",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["teams_settled"], 1);
    assert_eq!(summary["current_gameweek"], 2);
    assert_eq!(summary["next_gameweek"], 3);

    let team = store.get_fantasy_team(team_id).await.unwrap();
    assert_eq!(team.total_points, 17);
    assert_eq!(team.current_gameweek, 2);

    let (_, latest) = send(&app, Method::GET, "/api/v1/gameweeks/latest_finalized", None).await;
    assert_eq!(latest["gameweek"], 1);

    let (_, snapshot) = send(&app, Method::GET, "/api/v1/gameweeks/snapshot", None).await;
    assert_eq!(snapshot["current"]["number"], 2);
    assert_eq!(snapshot["latest_finalized_gameweek"], 1);

    // one failure and one success were recorded
    let (_, notifications) = send(&app, Method::GET, "/api/v1/notifications", None).await;
    let notifications = notifications.as_array().unwrap().clone();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0]["level"], "success");
    assert_eq!(notifications[1]["level"], "error");

    let id = notifications[0]["id"].as_str().unwrap();
    let uri = format!("/api/v1/notifications/{}", id);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_finalize_invalid_roster_is_unprocessable(pool: SqlitePool) {
    let store = create_store(pool);
    store.add_gameweek(new_gameweek(1)).await.unwrap();
    let team_id = seed_team(&store, 1).await;
    store
        .set_roster(
            team_id,
            vec![RosterEntry {
                player_id: 1,
                is_starter: true,
                is_captain: false,
                is_vice_captain: true,
            }],
        )
        .await
        .unwrap();
    let (app, _) = create_app(store);

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/finalize",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains(&format!("team {}", team_id)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_resources_are_not_found(pool: SqlitePool) {
    let store = create_store(pool);
    store.add_gameweek(new_gameweek(1)).await.unwrap();
    let (app, _) = create_app(store.clone());

    let (status, _) = send(&app, Method::GET, "/api/v1/gameweeks/9/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/9/finalize",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/api/v1/teams/5/gameweeks/1/points", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let team_id = seed_team(&store, 1).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/gameweeks/1/scores",
        Some(json!([
            { "player_id": 1, "points": 5, "minutes": 90 },
            { "player_id": 77, "points": 1, "minutes": 90 },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, points) = send(
        &app,
        Method::GET,
        &format!("/api/v1/teams/{}/gameweeks/1/points", team_id),
        None,
    )
    .await;
    assert_eq!(points["points"], 0);

    let missing = store
        .upsert_player_score(
            1,
            PlayerScore {
                player_id: 77,
                points: 1,
                minutes: 90,
            },
        )
        .await;
    assert!(missing.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manual_resolve(pool: SqlitePool) {
    let store = create_store(pool);
    let (app, manager) = create_app(store);

    let (status, resolved) = send(&app, Method::POST, "/api/v1/gameweeks/resolve", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved, json!([]));
    assert!(manager.snapshot().await.refreshed_at.is_some());
}
