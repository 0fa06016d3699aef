//! `SqliteDatabase` is the SQLite implementation of the FundAction Engine storage contracts.
//!
//! It implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{badges, campaigns, db_url, donations, fundraisers, leaderboards, new_pool, users};
use crate::{
    db_types::{
        Badge,
        Campaign,
        Donation,
        DonorStanding,
        FundraiserStanding,
        FundraiserStats,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardType,
        Money,
        NewCampaign,
        NewDonation,
        PaymentStatus,
        RecomputedAggregates,
        Team,
        TeamStanding,
        Upserted,
        User,
        UserBadge,
    },
    traits::{AggregateStore, DonationManagement, GamificationStore, LeaderboardStore, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl DonationManagement for SqliteDatabase {
    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation, StoreError> {
        let mut conn = self.pool.acquire().await?;
        donations::insert_donation(donation, &mut conn).await
    }

    async fn fetch_donation(&self, id: &str) -> Result<Option<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let donation = donations::fetch_donation(id, &mut conn).await?;
        Ok(donation)
    }

    async fn fetch_donation_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let donation = donations::fetch_donation_by_payment_ref(payment_ref, &mut conn).await?;
        Ok(donation)
    }

    async fn transition_pending_donation(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let donation = donations::transition_pending_donation(id, status, &mut conn).await?;
        match &donation {
            Some(_) => trace!("🗃️ Donation {id} moved from PENDING to {status}"),
            None => trace!("🗃️ Donation {id} is not PENDING. No transition to {status} took place"),
        }
        Ok(donation)
    }

    async fn fetch_completed_donations_for_donor(&self, donor_id: &str) -> Result<Vec<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let donations = donations::fetch_completed_donations_for_donor(donor_id, &mut conn).await?;
        Ok(donations)
    }

    async fn mark_donation_propagated(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        donations::mark_donation_propagated(id, &mut conn).await
    }

    async fn fetch_unpropagated_donations(&self, settled_before: DateTime<Utc>) -> Result<Vec<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let donations = donations::fetch_unpropagated_donations(settled_before, &mut conn).await?;
        Ok(donations)
    }
}

impl AggregateStore for SqliteDatabase {
    async fn fetch_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let campaign = campaigns::fetch_campaign(id, &mut conn).await?;
        Ok(campaign)
    }

    async fn fetch_team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let team = campaigns::fetch_team(id, &mut conn).await?;
        Ok(team)
    }

    async fn fetch_fundraiser_stats(&self, user_id: &str) -> Result<Option<FundraiserStats>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let stats = fundraisers::fetch_fundraiser_stats(user_id, &mut conn).await?;
        Ok(stats)
    }

    async fn increment_campaign_totals(&self, campaign_id: &str, amount: Money) -> Result<Campaign, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let campaign = campaigns::increment_campaign_totals(campaign_id, amount, &mut conn).await?;
        trace!("🗃️ Campaign {campaign_id} raised amount is now {} over {} donations", campaign.raised_amount, campaign.donation_count);
        Ok(campaign)
    }

    async fn increment_team_raised(&self, team_id: &str, amount: Money) -> Result<Team, StoreError> {
        let mut conn = self.pool.acquire().await?;
        campaigns::increment_team_raised(team_id, amount, &mut conn).await
    }

    async fn upsert_fundraiser_donation(
        &self,
        user_id: &str,
        amount: Money,
    ) -> Result<Upserted<FundraiserStats>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fundraisers::upsert_donation(user_id, amount, &mut conn).await
    }

    async fn set_average_donation(&self, user_id: &str, average: Money) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        fundraisers::set_average_donation(user_id, average, &mut conn).await
    }

    async fn upsert_fundraiser_campaign(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<Upserted<FundraiserStats>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fundraisers::upsert_campaign(user_id, active, &mut conn).await
    }

    async fn increment_team_campaigns(&self, team_id: &str) -> Result<Team, StoreError> {
        let mut conn = self.pool.acquire().await?;
        campaigns::increment_team_campaigns(team_id, &mut conn).await
    }

    async fn upsert_fundraiser_share(&self, user_id: &str) -> Result<Upserted<FundraiserStats>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fundraisers::upsert_share(user_id, &mut conn).await
    }

    async fn count_campaigns_for_creator(&self, user_id: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = campaigns::count_campaigns_for_creator(user_id, &mut conn).await?;
        Ok(count)
    }

    async fn recompute_idle_aggregates(
        &self,
        campaign_id: &str,
        settled_since: DateTime<Utc>,
    ) -> Result<Option<RecomputedAggregates>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Writing first takes the database write lock, so no settlement can commit until this transaction ends
        let campaign = campaigns::recompute_campaign_totals(campaign_id, &mut *tx).await?;
        let in_flight = donations::count_settlements_in_flight(&campaign, settled_since, &mut *tx).await?;
        if in_flight > 0 {
            tx.rollback().await?;
            debug!("🗃️ {in_flight} settlements related to campaign {campaign_id} are still propagating");
            return Ok(None);
        }
        let team = match campaign.team_id.as_deref() {
            Some(team_id) => Some(campaigns::recompute_team_raised(team_id, &mut *tx).await?),
            None => None,
        };
        let fundraiser = fundraisers::recompute_totals(&campaign.creator_id, &mut *tx).await?.into_inner();
        tx.commit().await?;
        Ok(Some(RecomputedAggregates { campaign, team, fundraiser }))
    }
}

impl GamificationStore for SqliteDatabase {
    async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(id, &mut conn).await?;
        Ok(user)
    }

    async fn increment_user_points(&self, user_id: &str, points: i64) -> Result<Option<i64>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let total = users::increment_points(user_id, points, &mut conn).await?;
        Ok(total)
    }

    async fn set_user_level(&self, user_id: &str, level: i64, observed_total: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = users::set_level(user_id, level, observed_total, &mut conn).await?;
        Ok(updated)
    }

    async fn fetch_badge_catalog(&self) -> Result<Vec<Badge>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let catalog = badges::fetch_catalog(&mut conn).await?;
        Ok(catalog)
    }

    async fn fetch_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let badges = badges::fetch_user_badges(user_id, &mut conn).await?;
        Ok(badges)
    }

    async fn insert_user_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let inserted = badges::insert_user_badge(user_id, badge_id, &mut conn).await?;
        Ok(inserted)
    }
}

impl LeaderboardStore for SqliteDatabase {
    async fn fetch_snapshot(
        &self,
        kind: LeaderboardType,
        period: LeaderboardPeriod,
    ) -> Result<Option<LeaderboardSnapshot>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        leaderboards::fetch_snapshot(kind, period, &mut conn).await
    }

    async fn upsert_snapshot(
        &self,
        period: LeaderboardPeriod,
        entries: &LeaderboardEntries,
        computed_at: DateTime<Utc>,
    ) -> Result<Upserted<LeaderboardSnapshot>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        leaderboards::upsert_snapshot(period, entries, computed_at, &mut conn).await
    }

    async fn rank_fundraisers(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<FundraiserStanding>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let standings = leaderboards::rank_fundraisers(since, limit, &mut conn).await?;
        Ok(standings)
    }

    async fn rank_donors(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<DonorStanding>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let standings = leaderboards::rank_donors(since, limit, &mut conn).await?;
        Ok(standings)
    }

    async fn rank_teams(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<TeamStanding>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let standings = leaderboards::rank_teams(since, limit, &mut conn).await?;
        Ok(standings)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `FA_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, StoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Could not run migrations. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    //-----------------------------------  Entity writes owned by other services  ----------------------------------
    // Users, teams and campaigns are created by the authentication and CRUD services. These are here so that seed
    // scripts and tests can populate a database.

    pub async fn insert_user(&self, id: &str, name: &str, avatar: Option<&str>) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(id, name, avatar, &mut conn).await?;
        Ok(user)
    }

    pub async fn insert_team(&self, id: &str, name: &str, slug: &str, member_count: i64) -> Result<Team, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let team = campaigns::insert_team(id, name, slug, member_count, &mut conn).await?;
        Ok(team)
    }

    pub async fn insert_campaign(&self, campaign: NewCampaign) -> Result<Campaign, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let campaign = campaigns::insert_campaign(campaign, &mut conn).await?;
        Ok(campaign)
    }
}
