use chrono::{DateTime, Utc};

use crate::{
    db_types::{
        DonorStanding,
        FundraiserStanding,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardType,
        TeamStanding,
        Upserted,
    },
    traits::StoreError,
};

/// Ranking queries and the leaderboard snapshot cache.
///
/// Every ranking query returns at most `limit` rows, ordered by amount descending. Ties keep storage order. When
/// `since` is given, only COMPLETED donations settled at or after `since` count towards the ranking; otherwise the
/// materialised all-time totals are used.
#[allow(async_fn_in_trait)]
pub trait LeaderboardStore {
    async fn fetch_snapshot(
        &self,
        kind: LeaderboardType,
        period: LeaderboardPeriod,
    ) -> Result<Option<LeaderboardSnapshot>, StoreError>;

    /// Stores the snapshot for `(kind, period)`, replacing the data and computation time of any existing one.
    async fn upsert_snapshot(
        &self,
        period: LeaderboardPeriod,
        entries: &LeaderboardEntries,
        computed_at: DateTime<Utc>,
    ) -> Result<Upserted<LeaderboardSnapshot>, StoreError>;

    async fn rank_fundraisers(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<FundraiserStanding>, StoreError>;

    async fn rank_donors(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<DonorStanding>, StoreError>;

    async fn rank_teams(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<TeamStanding>, StoreError>;
}
