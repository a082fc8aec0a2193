use crate::helpers::*;
use gameweek::{
    domain::{
        FinalizeSummary, Gameweek, GameweekManager, GameweekStats, GameweekWatcher, TeamPoints,
    },
    GameweekError as Error, NotificationLevel,
};
use gameweek_core::{GameweekStatus, TeamScore};
use mockall::predicate::eq;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration as StdDuration,
};
use time::{Duration, OffsetDateTime};
use tokio_util::sync::CancellationToken;

/// Every call succeeds until `failing` is set, then every call errors.
fn flaky_ops(failing: Arc<AtomicBool>, current: Gameweek) -> MockStore {
    let mut ops = MockStore::new();

    let flag = failing.clone();
    ops.expect_resolve_gameweek_status().returning(move |_| {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(Vec::new())
        }
    });
    let flag = failing.clone();
    ops.expect_transfers_allowed().returning(move |_| {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(true)
        }
    });
    let flag = failing.clone();
    ops.expect_current_gameweek().returning(move || {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(Some(current.clone()))
        }
    });
    let flag = failing.clone();
    ops.expect_next_gameweek().returning(move || {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(None)
        }
    });
    let flag = failing.clone();
    ops.expect_latest_finalized_gameweek().returning(move || {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(0)
        }
    });
    let flag = failing.clone();
    ops.expect_display_gameweek().returning(move || {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(1)
        }
    });
    let flag = failing;
    ops.expect_gameweek_stats().returning(move |gameweek| {
        if flag.load(Ordering::SeqCst) {
            Err(store_unavailable())
        } else {
            Ok(GameweekStats {
                gameweek,
                total_matches: 10,
                ..Default::default()
            })
        }
    });

    ops
}

#[tokio::test]
async fn test_refresh_falls_back_to_cached_snapshot() {
    let failing = Arc::new(AtomicBool::new(false));
    let mut current = gameweek(1, GameweekStatus::Upcoming);
    current.is_current = true;
    let manager = GameweekManager::new(Arc::new(flaky_ops(failing.clone(), current)), 10);

    let snapshot = manager.refresh(SEASON_START - Duration::hours(1)).await;
    assert!(!snapshot.degraded);
    assert!(snapshot.transfers_allowed);
    assert_eq!(snapshot.current.as_ref().map(|g| g.number), Some(1));
    assert_eq!(snapshot.display_gameweek, 1);
    assert_eq!(snapshot.current_stats.as_ref().map(|s| s.total_matches), Some(10));
    assert!(manager.notifications().list().await.is_empty());

    failing.store(true, Ordering::SeqCst);

    // past the cached deadline, the heuristic closes the window
    let snapshot = manager.refresh(SEASON_START + Duration::hours(1)).await;
    assert!(snapshot.degraded);
    assert!(!snapshot.transfers_allowed);
    assert_eq!(snapshot.current.as_ref().map(|g| g.number), Some(1));
    assert_eq!(snapshot.display_gameweek, 1);
    assert_eq!(snapshot.current_stats.as_ref().map(|s| s.total_matches), Some(10));

    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);

    // staying degraded does not add more notifications
    manager.refresh(SEASON_START + Duration::hours(2)).await;
    assert_eq!(manager.notifications().list().await.len(), 1);

    failing.store(false, Ordering::SeqCst);
    let snapshot = manager.refresh(SEASON_START + Duration::hours(3)).await;
    assert!(!snapshot.degraded);

    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].level, NotificationLevel::Info);
}

#[tokio::test]
async fn test_transfer_gate_uses_heuristic_when_store_fails() {
    let failing = Arc::new(AtomicBool::new(false));
    let mut current = gameweek(1, GameweekStatus::Upcoming);
    current.is_current = true;
    let manager = GameweekManager::new(Arc::new(flaky_ops(failing.clone(), current)), 10);

    manager.refresh(SEASON_START - Duration::days(1)).await;

    let gate = manager.transfers_allowed(SEASON_START - Duration::hours(1)).await;
    assert!(gate.allowed);
    assert!(!gate.degraded);

    failing.store(true, Ordering::SeqCst);

    let gate = manager.transfers_allowed(SEASON_START - Duration::hours(1)).await;
    assert!(gate.allowed);
    assert!(gate.degraded);

    let gate = manager.transfers_allowed(SEASON_START + Duration::minutes(1)).await;
    assert!(!gate.allowed);
    assert!(gate.degraded);

    assert_eq!(manager.notifications().list().await.len(), 1);
    assert!(manager.snapshot().await.degraded);

    failing.store(false, Ordering::SeqCst);
    manager.refresh(SEASON_START - Duration::hours(1)).await;
    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].level, NotificationLevel::Info);
}

#[tokio::test]
async fn test_transfer_gate_outage_does_not_evict_older_notifications() {
    let mut ops = MockStore::new();
    ops.expect_finalize_gameweek()
        .returning(|gameweek| Err(Error::IncompleteMatches { gameweek, pending: 1 }));
    ops.expect_transfers_allowed()
        .returning(|_| Err(store_unavailable()));
    let manager = GameweekManager::new(Arc::new(ops), 20);

    assert!(manager.finalize(3, true).await.is_err());
    for _ in 0..25 {
        let gate = manager.transfers_allowed(OffsetDateTime::now_utc()).await;
        assert!(gate.degraded);
    }

    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .any(|n| n.message.starts_with("Finalizing gameweek 3 failed")));
}

#[tokio::test]
async fn test_transfer_gate_closed_for_cached_active_gameweek() {
    let failing = Arc::new(AtomicBool::new(false));
    let mut current = gameweek(1, GameweekStatus::Active);
    current.is_current = true;
    let manager = GameweekManager::new(Arc::new(flaky_ops(failing.clone(), current)), 10);

    manager.refresh(SEASON_START + Duration::hours(2)).await;
    failing.store(true, Ordering::SeqCst);

    // the deadline check alone would say open, the live gameweek keeps it shut
    let gate = manager.transfers_allowed(SEASON_START - Duration::days(1)).await;
    assert!(!gate.allowed);
}

#[tokio::test]
async fn test_transfer_gate_open_with_nothing_cached() {
    let mut ops = MockStore::new();
    ops.expect_transfers_allowed()
        .returning(|_| Err(store_unavailable()));
    let manager = GameweekManager::new(Arc::new(ops), 10);

    let gate = manager.transfers_allowed(OffsetDateTime::now_utc()).await;
    assert!(gate.allowed);
    assert!(gate.degraded);
}

#[tokio::test]
async fn test_finalize_requires_confirmation() {
    let mut ops = MockStore::new();
    ops.expect_finalize_gameweek().never();
    let manager = GameweekManager::new(Arc::new(ops), 10);

    let result = manager.finalize(1, false).await;
    assert!(matches!(result, Err(Error::BadRequest(_))));
    assert!(manager.notifications().list().await.is_empty());
}

#[tokio::test]
async fn test_finalize_failure_is_reported() {
    let mut ops = MockStore::new();
    ops.expect_finalize_gameweek()
        .with(eq(4))
        .times(1)
        .returning(|gameweek| {
            Err(Error::IncompleteMatches {
                gameweek,
                pending: 2,
            })
        });
    let manager = GameweekManager::new(Arc::new(ops), 10);

    let result = manager.finalize(4, true).await;
    assert!(matches!(
        result,
        Err(Error::IncompleteMatches {
            gameweek: 4,
            pending: 2
        })
    ));

    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert!(notifications[0].message.contains("2 match(es)"));
}

#[tokio::test]
async fn test_finalize_success_notifies_and_refreshes() {
    let mut ops = healthy_ops(None);
    ops.expect_finalize_gameweek()
        .with(eq(1))
        .times(1)
        .returning(|gameweek| {
            Ok(FinalizeSummary {
                gameweek,
                teams_settled: 12,
                current_gameweek: Some(gameweek + 1),
                next_gameweek: Some(gameweek + 2),
                finalized_at: OffsetDateTime::now_utc(),
            })
        });
    let manager = GameweekManager::new(Arc::new(ops), 10);

    let summary = manager.finalize(1, true).await.unwrap();
    assert_eq!(summary.teams_settled, 12);

    let notifications = manager.notifications().list().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Success);
    assert!(manager.snapshot().await.refreshed_at.is_some());
}

#[tokio::test]
async fn test_trigger_resolve() {
    let manager = GameweekManager::new(Arc::new(healthy_ops(None)), 10);
    let resolved = manager.trigger_resolve(SEASON_START).await.unwrap();
    assert!(resolved.is_empty());
    assert_eq!(
        manager.notifications().list().await[0].level,
        NotificationLevel::Info
    );
    assert_eq!(manager.snapshot().await.refreshed_at, Some(SEASON_START));

    let mut ops = MockStore::new();
    ops.expect_resolve_gameweek_status()
        .times(1)
        .returning(|_| Err(store_unavailable()));
    let manager = GameweekManager::new(Arc::new(ops), 10);
    assert!(manager.trigger_resolve(SEASON_START).await.is_err());
    assert_eq!(
        manager.notifications().list().await[0].level,
        NotificationLevel::Error
    );
}

#[tokio::test]
async fn test_recalculate_passes_through() {
    let mut ops = MockStore::new();
    ops.expect_calculate_team_points()
        .with(eq(3), eq(7))
        .times(1)
        .returning(|team_id, gameweek| {
            Ok(TeamPoints {
                team_id,
                gameweek,
                points: 42,
                breakdown: TeamScore {
                    total: 42,
                    base: 30,
                    captain_bonus: 12,
                    ..Default::default()
                },
            })
        });
    let manager = GameweekManager::new(Arc::new(ops), 10);

    let points = manager.recalculate(3, 7).await.unwrap();
    assert_eq!(points.points, 42);
    assert_eq!(points.breakdown.captain_bonus, 12);
}

#[tokio::test]
async fn test_watcher_refreshes_until_cancelled() {
    let manager = Arc::new(GameweekManager::new(Arc::new(healthy_ops(None)), 10));
    let cancel_token = CancellationToken::new();
    let watcher = GameweekWatcher::new(
        manager.clone(),
        cancel_token.clone(),
        StdDuration::from_millis(10),
    );

    let handle = tokio::spawn(async move { watcher.watch().await });
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    cancel_token.cancel();

    handle.await.unwrap().unwrap();
    assert!(manager.snapshot().await.refreshed_at.is_some());
}
