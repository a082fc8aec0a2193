//! Clock driven status transitions and current/next reconciliation.

use itertools::Itertools;
use time::OffsetDateTime;

use crate::{Boundaries, GameweekStatus, ResolvedGameweek, TimelineEntry};

/// Status a gameweek should hold at `now`.
///
/// Boundaries are checked from the latest instant backwards so that badly ordered
/// data (a deadline after kick off) still lands in the furthest state reached.
pub fn next_status(
    current: GameweekStatus,
    now: OffsetDateTime,
    boundaries: &Boundaries,
) -> GameweekStatus {
    if current.is_terminal() {
        return current;
    }

    if now > boundaries.end_time {
        GameweekStatus::Finalized
    } else if now >= boundaries.start_time {
        GameweekStatus::Active
    } else if now >= boundaries.deadline_time {
        GameweekStatus::Locked
    } else {
        GameweekStatus::Upcoming
    }
}

/// Recompute status, `is_current` and `is_next` for the whole season at once.
///
/// The current gameweek is the lowest numbered one that is live. Failing that, it is
/// the lowest numbered one still waiting on kick off. The next gameweek is always
/// `current + 1` when such a gameweek exists.
///
/// Output is ordered by gameweek number.
pub fn resolve_timeline(now: OffsetDateTime, entries: &[TimelineEntry]) -> Vec<ResolvedGameweek> {
    let statuses: Vec<(i64, GameweekStatus)> = entries
        .iter()
        .map(|entry| {
            (
                entry.number,
                next_status(entry.status, now, &entry.boundaries),
            )
        })
        .sorted_by_key(|(number, _)| *number)
        .collect();

    let current = statuses
        .iter()
        .find(|(_, status)| *status == GameweekStatus::Active)
        .or_else(|| statuses.iter().find(|(_, status)| status.is_pending()))
        .map(|(number, _)| *number);

    let next = current.and_then(|current| {
        statuses
            .iter()
            .find(|(number, _)| *number == current + 1)
            .map(|(number, _)| *number)
    });

    statuses
        .into_iter()
        .map(|(number, status)| ResolvedGameweek {
            number,
            status,
            is_current: Some(number) == current,
            is_next: Some(number) == next,
        })
        .collect()
}
