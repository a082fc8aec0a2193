//! Transfer gate

use time::OffsetDateTime;

use crate::{next_status, GameweekStatus, TimelineEntry};

/// Roster changes are closed while any gameweek is live. Otherwise only the nearest
/// pending gameweek counts: closed once it is locked, open while it is upcoming.
/// An empty season is open.
///
/// Takes `(number, status)` pairs with statuses already resolved against the clock.
pub fn transfers_allowed<I>(gameweeks: I) -> bool
where
    I: IntoIterator<Item = (i64, GameweekStatus)>,
{
    let mut nearest: Option<(i64, GameweekStatus)> = None;
    for (number, status) in gameweeks {
        if status == GameweekStatus::Active {
            return false;
        }
        if status.is_pending() && nearest.map_or(true, |(n, _)| number < n) {
            nearest = Some((number, status));
        }
    }

    !matches!(nearest, Some((_, GameweekStatus::Locked)))
}

/// Classify every gameweek against `now` exactly as the resolver would, then apply the gate.
pub fn transfers_allowed_at(now: OffsetDateTime, entries: &[TimelineEntry]) -> bool {
    transfers_allowed(
        entries
            .iter()
            .map(|entry| (entry.number, next_status(entry.status, now, &entry.boundaries))),
    )
}

/// Local approximation used when the store cannot be reached.
pub fn deadline_heuristic(
    now: OffsetDateTime,
    status: Option<GameweekStatus>,
    deadline: Option<OffsetDateTime>,
) -> bool {
    if matches!(status, Some(GameweekStatus::Active)) {
        return false;
    }
    match deadline {
        Some(deadline) => now < deadline,
        None => true,
    }
}
