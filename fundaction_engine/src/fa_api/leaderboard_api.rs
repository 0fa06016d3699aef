//! The leaderboard cache.
//!
//! Rankings are expensive to compute, so each `(type, period)` pair is materialised as a snapshot and served from the
//! store until it is older than the staleness window.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        DonorEntry,
        FundraiserEntry,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardType,
        TeamEntry,
    },
    traits::LeaderboardStore,
    LeaderboardError,
};

/// Rankings are capped at this many entries
pub const LEADERBOARD_SIZE: u32 = 100;
pub const DEFAULT_STALENESS: Duration = Duration::minutes(5);

pub struct LeaderboardApi<B> {
    db: B,
    staleness: Duration,
}

impl<B: Debug> Debug for LeaderboardApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LeaderboardApi ({:?}, staleness: {}s)", self.db, self.staleness.num_seconds())
    }
}

impl<B> LeaderboardApi<B>
where B: LeaderboardStore
{
    pub fn new(db: B) -> Self {
        Self { db, staleness: DEFAULT_STALENESS }
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Serves the cached snapshot while it is fresh, and recomputes it otherwise.
    ///
    /// If the recomputation fails and there is a stale snapshot, the stale snapshot is served. An error is only
    /// returned when there is nothing at all to serve.
    pub async fn get(
        &self,
        kind: LeaderboardType,
        period: LeaderboardPeriod,
    ) -> Result<LeaderboardSnapshot, LeaderboardError> {
        let cached = match self.db.fetch_snapshot(kind, period).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("🏆️ Could not read the cached {kind} {period} leaderboard. Recomputing it. {e}");
                None
            },
        };
        let now = Utc::now();
        match cached {
            Some(snapshot) if snapshot.is_fresh(now, self.staleness) => {
                trace!("🏆️ Serving cached {kind} {period} leaderboard from {}", snapshot.last_computed);
                Ok(snapshot)
            },
            stale => match self.refresh(kind, period).await {
                Ok(snapshot) => Ok(snapshot),
                Err(e) => match stale {
                    Some(snapshot) => {
                        warn!(
                            "🏆️ Leaderboard refresh failed. Serving the {kind} {period} snapshot from {} instead. {e}",
                            snapshot.last_computed
                        );
                        Ok(snapshot)
                    },
                    None => Err(e),
                },
            },
        }
    }

    /// Recomputes the ranking for `(kind, period)` and stores it, replacing any previous snapshot.
    pub async fn refresh(
        &self,
        kind: LeaderboardType,
        period: LeaderboardPeriod,
    ) -> Result<LeaderboardSnapshot, LeaderboardError> {
        let now = Utc::now();
        let since = period.window_start(now);
        let entries = match kind {
            LeaderboardType::TopFundraisers => {
                let standings = self.db.rank_fundraisers(since, LEADERBOARD_SIZE).await?;
                let entries = ranked(standings)
                    .map(|(rank, s)| FundraiserEntry {
                        rank,
                        user_id: s.user_id,
                        name: s.name,
                        avatar: s.avatar,
                        amount: s.amount,
                        campaigns: s.campaigns,
                        donations: s.donations,
                    })
                    .collect();
                LeaderboardEntries::TopFundraisers(entries)
            },
            LeaderboardType::TopDonors => {
                let standings = self.db.rank_donors(since, LEADERBOARD_SIZE).await?;
                let entries = ranked(standings)
                    .map(|(rank, s)| DonorEntry {
                        rank,
                        user_id: s.user_id,
                        name: s.name,
                        avatar: s.avatar,
                        amount: s.amount,
                        donation_count: s.donation_count,
                    })
                    .collect();
                LeaderboardEntries::TopDonors(entries)
            },
            LeaderboardType::TopTeams => {
                let standings = self.db.rank_teams(since, LEADERBOARD_SIZE).await?;
                let entries = ranked(standings)
                    .map(|(rank, s)| TeamEntry {
                        rank,
                        team_id: s.team_id,
                        name: s.name,
                        slug: s.slug,
                        avatar: s.avatar,
                        amount: s.amount,
                        members: s.members,
                        campaigns: s.campaigns,
                    })
                    .collect();
                LeaderboardEntries::TopTeams(entries)
            },
        };
        let upserted = self.db.upsert_snapshot(period, &entries, now).await?;
        let verb = if upserted.is_created() { "created" } else { "refreshed" };
        debug!("🏆️ {kind} {period} leaderboard {verb} with {} entries", entries.len());
        Ok(upserted.into_inner())
    }

    /// Refreshes all three leaderboards for `period` concurrently. Returns the ones that could not be refreshed.
    pub async fn refresh_all(&self, period: LeaderboardPeriod) -> Vec<(LeaderboardType, LeaderboardError)> {
        let refreshes = LeaderboardType::ALL.map(|kind| async move { (kind, self.refresh(kind, period).await) });
        futures_util::future::join_all(refreshes)
            .await
            .into_iter()
            .filter_map(|(kind, result)| result.err().map(|e| (kind, e)))
            .collect()
    }
}

/// Assigns 1-based ranks in the order the store returned the standings.
fn ranked<T>(standings: Vec<T>) -> impl Iterator<Item = (u32, T)> {
    (1u32..).zip(standings)
}
