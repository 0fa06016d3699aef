use chrono::{DateTime, Utc};

use crate::{
    db_types::{Campaign, FundraiserStats, Money, RecomputedAggregates, Team, Upserted},
    traits::StoreError,
};

/// The materialised campaign, team and fundraiser totals.
///
/// Numeric totals are only ever changed through the atomic increment methods here, or recomputed wholesale from
/// COMPLETED donations by [`AggregateStore::recompute_idle_aggregates`]. Implementations must never read-modify-write
/// them.
#[allow(async_fn_in_trait)]
pub trait AggregateStore {
    async fn fetch_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError>;

    async fn fetch_team(&self, id: &str) -> Result<Option<Team>, StoreError>;

    async fn fetch_fundraiser_stats(&self, user_id: &str) -> Result<Option<FundraiserStats>, StoreError>;

    /// Atomically adds `amount` to the campaign's raised amount and bumps its donation count. Returns the campaign as
    /// it is after the increment.
    async fn increment_campaign_totals(&self, campaign_id: &str, amount: Money) -> Result<Campaign, StoreError>;

    async fn increment_team_raised(&self, team_id: &str, amount: Money) -> Result<Team, StoreError>;

    /// Adds one donation of `amount` to the fundraiser's totals, creating the stats row (with the average set to
    /// `amount`) if it does not exist yet. The returned stats reflect the increment.
    async fn upsert_fundraiser_donation(
        &self,
        user_id: &str,
        amount: Money,
    ) -> Result<Upserted<FundraiserStats>, StoreError>;

    async fn set_average_donation(&self, user_id: &str, average: Money) -> Result<(), StoreError>;

    /// Counts a newly created campaign towards the fundraiser's totals.
    async fn upsert_fundraiser_campaign(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<Upserted<FundraiserStats>, StoreError>;

    async fn increment_team_campaigns(&self, team_id: &str) -> Result<Team, StoreError>;

    async fn upsert_fundraiser_share(&self, user_id: &str) -> Result<Upserted<FundraiserStats>, StoreError>;

    async fn count_campaigns_for_creator(&self, user_id: &str) -> Result<i64, StoreError>;

    /// Rederives the campaign's raised amount and donation count, its team's raised amount and its creator's donation
    /// totals from the COMPLETED donations, as one atomic unit.
    ///
    /// Nothing is written, and `None` is returned, if any related donation settled at or after `settled_since` is still
    /// unpropagated. Its own propagation would otherwise add it a second time. The check runs inside the same
    /// transaction as the recompute, so a settlement cannot slip in between them.
    async fn recompute_idle_aggregates(
        &self,
        campaign_id: &str,
        settled_since: DateTime<Utc>,
    ) -> Result<Option<RecomputedAggregates>, StoreError>;
}
