use async_trait::async_trait;
use gameweek_core::{deadline_heuristic, ResolvedGameweek};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tokio::{sync::RwLock, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::domain::{Error, NotificationLevel, Notifications};

use super::{FinalizeSummary, Gameweek, GameweekStats, GameweekStore, TeamPoints};

/// Operations the manager drives. `GameweekStore` is the production implementation.
#[async_trait]
pub trait GameweekOps: Send + Sync {
    async fn resolve_gameweek_status(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ResolvedGameweek>, Error>;
    async fn transfers_allowed(&self, now: OffsetDateTime) -> Result<bool, Error>;
    async fn calculate_team_points(&self, team_id: i64, gameweek: i64)
        -> Result<TeamPoints, Error>;
    async fn finalize_gameweek(&self, gameweek: i64) -> Result<FinalizeSummary, Error>;
    async fn current_gameweek(&self) -> Result<Option<Gameweek>, Error>;
    async fn next_gameweek(&self) -> Result<Option<Gameweek>, Error>;
    async fn latest_finalized_gameweek(&self) -> Result<i64, Error>;
    async fn display_gameweek(&self) -> Result<i64, Error>;
    async fn gameweek_stats(&self, gameweek: i64) -> Result<GameweekStats, Error>;
}

#[async_trait]
impl GameweekOps for GameweekStore {
    async fn resolve_gameweek_status(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ResolvedGameweek>, Error> {
        GameweekStore::resolve_gameweek_status(self, now).await
    }

    async fn transfers_allowed(&self, now: OffsetDateTime) -> Result<bool, Error> {
        GameweekStore::transfers_allowed(self, now).await
    }

    async fn calculate_team_points(
        &self,
        team_id: i64,
        gameweek: i64,
    ) -> Result<TeamPoints, Error> {
        GameweekStore::calculate_team_points(self, team_id, gameweek).await
    }

    async fn finalize_gameweek(&self, gameweek: i64) -> Result<FinalizeSummary, Error> {
        GameweekStore::finalize_gameweek(self, gameweek).await
    }

    async fn current_gameweek(&self) -> Result<Option<Gameweek>, Error> {
        GameweekStore::current_gameweek(self).await
    }

    async fn next_gameweek(&self) -> Result<Option<Gameweek>, Error> {
        GameweekStore::next_gameweek(self).await
    }

    async fn latest_finalized_gameweek(&self) -> Result<i64, Error> {
        GameweekStore::latest_finalized_gameweek(self).await
    }

    async fn display_gameweek(&self) -> Result<i64, Error> {
        GameweekStore::display_gameweek(self).await
    }

    async fn gameweek_stats(&self, gameweek: i64) -> Result<GameweekStats, Error> {
        GameweekStore::gameweek_stats(self, gameweek).await
    }
}

/// Last known view of the season, served to readers between polls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameweekSnapshot {
    pub current: Option<Gameweek>,
    pub next: Option<Gameweek>,
    pub transfers_allowed: bool,
    pub display_gameweek: i64,
    pub latest_finalized_gameweek: i64,
    pub current_stats: Option<GameweekStats>,
    /// Some values were carried over from the previous refresh because the store failed
    pub degraded: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub refreshed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferGate {
    pub allowed: bool,
    /// Answer came from the cached deadline rather than the store
    pub degraded: bool,
}

pub struct GameweekManager {
    ops: Arc<dyn GameweekOps>,
    snapshot: RwLock<GameweekSnapshot>,
    notifications: Notifications,
}

impl GameweekManager {
    pub fn new(ops: Arc<dyn GameweekOps>, notification_capacity: usize) -> Self {
        Self {
            ops,
            snapshot: RwLock::new(GameweekSnapshot::default()),
            notifications: Notifications::new(notification_capacity),
        }
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub async fn snapshot(&self) -> GameweekSnapshot {
        self.snapshot.read().await.clone()
    }

    /// One poll cycle: resolve statuses, then rebuild the snapshot.
    ///
    /// Store failures never abort the cycle, the affected values are carried over from the
    /// previous snapshot and the result is marked degraded.
    pub async fn refresh(&self, now: OffsetDateTime) -> GameweekSnapshot {
        let mut failure = None;
        if let Err(e) = self.ops.resolve_gameweek_status(now).await {
            warn!("failed to resolve gameweek statuses: {}", e);
            failure = Some(format!("Could not update gameweek statuses: {}", e));
        }

        self.rebuild_snapshot(now, failure).await
    }

    /// Operator requested resolver run.
    pub async fn trigger_resolve(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ResolvedGameweek>, Error> {
        match self.ops.resolve_gameweek_status(now).await {
            Ok(resolved) => {
                info!("manual resolve updated {} gameweek(s)", resolved.len());
                self.notifications
                    .push(NotificationLevel::Info, "Gameweek statuses updated")
                    .await;
                self.rebuild_snapshot(now, None).await;
                Ok(resolved)
            }
            Err(e) => {
                error!("manual resolve failed: {}", e);
                self.notifications
                    .push(
                        NotificationLevel::Error,
                        format!("Could not update gameweek statuses: {}", e),
                    )
                    .await;
                Err(e)
            }
        }
    }

    pub async fn transfers_allowed(&self, now: OffsetDateTime) -> TransferGate {
        match self.ops.transfers_allowed(now).await {
            Ok(allowed) => TransferGate {
                allowed,
                degraded: false,
            },
            Err(e) => {
                warn!(
                    "transfer gate unavailable, falling back to cached deadline: {}",
                    e
                );
                let mut snapshot = self.snapshot.write().await;
                // only the switch into degraded mode is reported, the next good refresh
                // reports the recovery
                if !snapshot.degraded {
                    snapshot.degraded = true;
                    self.notifications
                        .push(
                            NotificationLevel::Error,
                            "Transfer window could not be checked, using the cached deadline",
                        )
                        .await;
                }
                TransferGate {
                    allowed: fallback_gate(now, snapshot.current.as_ref()),
                    degraded: true,
                }
            }
        }
    }

    pub async fn recalculate(&self, team_id: i64, gameweek: i64) -> Result<TeamPoints, Error> {
        self.ops.calculate_team_points(team_id, gameweek).await
    }

    /// Settle a gameweek. Irreversible, so the caller has to confirm explicitly.
    pub async fn finalize(&self, gameweek: i64, confirmed: bool) -> Result<FinalizeSummary, Error> {
        if !confirmed {
            return Err(Error::BadRequest(format!(
                "finalizing gameweek {} cannot be undone, resend with confirm set to true",
                gameweek
            )));
        }

        match self.ops.finalize_gameweek(gameweek).await {
            Ok(summary) => {
                self.notifications
                    .push(
                        NotificationLevel::Success,
                        format!(
                            "Gameweek {} finalized, {} team(s) settled",
                            gameweek, summary.teams_settled
                        ),
                    )
                    .await;
                self.refresh(OffsetDateTime::now_utc()).await;
                Ok(summary)
            }
            Err(e) => {
                error!("failed to finalize gameweek {}: {}", gameweek, e);
                self.notifications
                    .push(
                        NotificationLevel::Error,
                        format!("Finalizing gameweek {} failed: {}", gameweek, e),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn rebuild_snapshot(
        &self,
        now: OffsetDateTime,
        mut failure: Option<String>,
    ) -> GameweekSnapshot {
        let cached = self.snapshot().await;

        let current = match self.ops.current_gameweek().await {
            Ok(current) => current,
            Err(e) => {
                warn!("failed to read current gameweek, keeping cached value: {}", e);
                failure.get_or_insert_with(|| e.to_string());
                cached.current.clone()
            }
        };

        let next = match self.ops.next_gameweek().await {
            Ok(next) => next,
            Err(e) => {
                warn!("failed to read next gameweek, keeping cached value: {}", e);
                failure.get_or_insert_with(|| e.to_string());
                cached.next.clone()
            }
        };

        let transfers_allowed = match self.ops.transfers_allowed(now).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    "transfer gate unavailable, falling back to cached deadline: {}",
                    e
                );
                failure.get_or_insert_with(|| e.to_string());
                fallback_gate(now, current.as_ref())
            }
        };

        let display_gameweek = match self.ops.display_gameweek().await {
            Ok(display) => display,
            Err(e) => {
                warn!("failed to read display gameweek: {}", e);
                failure.get_or_insert_with(|| e.to_string());
                cached.display_gameweek
            }
        };

        let latest_finalized_gameweek = match self.ops.latest_finalized_gameweek().await {
            Ok(latest) => latest,
            Err(e) => {
                warn!("failed to read latest finalized gameweek: {}", e);
                failure.get_or_insert_with(|| e.to_string());
                cached.latest_finalized_gameweek
            }
        };

        let current_stats = match &current {
            Some(gameweek) => match self.ops.gameweek_stats(gameweek.number).await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    warn!("failed to read stats for gameweek {}: {}", gameweek.number, e);
                    failure.get_or_insert_with(|| e.to_string());
                    cached.current_stats.clone()
                }
            },
            None => None,
        };

        let degraded = failure.is_some();
        match (&failure, cached.degraded) {
            (Some(reason), false) => {
                self.notifications
                    .push(
                        NotificationLevel::Error,
                        format!("Gameweek data is stale: {}", reason),
                    )
                    .await;
            }
            (None, true) => {
                info!("gameweek data recovered");
                self.notifications
                    .push(NotificationLevel::Info, "Gameweek data is up to date again")
                    .await;
            }
            _ => {}
        }

        let snapshot = GameweekSnapshot {
            current,
            next,
            transfers_allowed,
            display_gameweek,
            latest_finalized_gameweek,
            current_stats,
            degraded,
            refreshed_at: Some(now),
        };
        debug!(
            "snapshot refreshed, current: {:?}, transfers allowed: {}, degraded: {}",
            snapshot.current.as_ref().map(|g| g.number),
            snapshot.transfers_allowed,
            snapshot.degraded
        );

        *self.snapshot.write().await = snapshot.clone();
        snapshot
    }
}

fn fallback_gate(now: OffsetDateTime, current: Option<&Gameweek>) -> bool {
    deadline_heuristic(
        now,
        current.map(|gameweek| gameweek.status),
        current.map(|gameweek| gameweek.deadline_time),
    )
}

pub struct GameweekWatcher {
    manager: Arc<GameweekManager>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
}

impl GameweekWatcher {
    pub fn new(
        manager: Arc<GameweekManager>,
        cancel_token: CancellationToken,
        poll_interval: Duration,
    ) -> Self {
        Self {
            manager,
            poll_interval,
            cancel_token,
        }
    }

    pub async fn watch(&self) -> Result<(), anyhow::Error> {
        info!("Starting gameweek watcher");

        loop {
            if self.cancel_token.is_cancelled() {
                info!("Gameweek watcher received cancellation");
                break;
            }

            let snapshot = self.manager.refresh(OffsetDateTime::now_utc()).await;
            if snapshot.degraded {
                warn!("Gameweek refresh completed with stale data");
            } else {
                debug!("Gameweek refresh completed successfully");
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => continue,
                _ = self.cancel_token.cancelled() => {
                    info!("Gameweek watcher cancelled during sleep");
                    break;
                }
            }
        }

        Ok(())
    }
}
