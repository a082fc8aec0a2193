//! Ordinal ranking used for league tables and the overall standings

use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub team_id: i64,
    pub score: i64,
    pub rank: i64,
}

/// Rank `(team_id, score)` pairs highest score first.
///
/// Ties go to the lower team id so the ranks are always `1..=n` with no gaps or repeats.
pub fn rank_teams<I>(scores: I) -> Vec<Ranked>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    scores
        .into_iter()
        .sorted_by(|(a_id, a_score), (b_id, b_score)| {
            b_score.cmp(a_score).then_with(|| a_id.cmp(b_id))
        })
        .enumerate()
        .map(|(index, (team_id, score))| Ranked {
            team_id,
            score,
            rank: index as i64 + 1,
        })
        .collect()
}
