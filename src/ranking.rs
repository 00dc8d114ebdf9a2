// src/ranking.rs

use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::participant::{Participant, RankingEntry};
use crate::repos::participants::{ParticipantStore, StoreError};

/// Produces the leaderboard: a bounded read ordered by base score at the
/// storage layer, then an in-memory re-sort by total points (base plus
/// referral bonus) with total time as the tie-break.
///
/// The two-stage ordering means a participant whose bonus would lift them
/// into the true top N can be missed when their base score falls outside
/// the fetched window. Ordering at the storage layer by a precomputed
/// total-points column would close the gap.
#[derive(Clone)]
pub struct RankingResolver {
    store: Arc<dyn ParticipantStore>,
}

impl RankingResolver {
    pub fn new(store: Arc<dyn ParticipantStore>) -> Self {
        Self { store }
    }

    pub async fn top(&self, limit: i64) -> Result<Vec<RankingEntry>, StoreError> {
        let rows = self.store.list_top(limit).await?;
        Ok(order_by_total_points(&rows))
    }
}

/// Sorts by total points descending, total time ascending, and projects
/// the read view.
pub fn order_by_total_points(rows: &[Participant]) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = rows.iter().map(RankingEntry::from).collect();
    entries.sort_by(|a, b| {
        b.total_points
            .partial_cmp(&a.total_points)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.time_spent_seconds.cmp(&b.time_spent_seconds))
    });
    entries
}
