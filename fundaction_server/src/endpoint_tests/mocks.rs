use chrono::{DateTime, Utc};
use fundaction_engine::{
    db_types::{
        Badge,
        DonorStanding,
        FundraiserStanding,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardType,
        TeamStanding,
        Upserted,
        User,
        UserBadge,
    },
    traits::{GamificationStore, LeaderboardStore, StoreError},
};
use mockall::mock;

mock! {
    pub LeaderboardManager {}
    impl LeaderboardStore for LeaderboardManager {
        async fn fetch_snapshot(&self, kind: LeaderboardType, period: LeaderboardPeriod) -> Result<Option<LeaderboardSnapshot>, StoreError>;
        async fn upsert_snapshot(&self, period: LeaderboardPeriod, entries: &LeaderboardEntries, computed_at: DateTime<Utc>) -> Result<Upserted<LeaderboardSnapshot>, StoreError>;
        async fn rank_fundraisers(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<FundraiserStanding>, StoreError>;
        async fn rank_donors(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<DonorStanding>, StoreError>;
        async fn rank_teams(&self, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<TeamStanding>, StoreError>;
    }
}

mock! {
    pub GamificationManager {}
    impl GamificationStore for GamificationManager {
        async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError>;
        async fn increment_user_points(&self, user_id: &str, points: i64) -> Result<Option<i64>, StoreError>;
        async fn set_user_level(&self, user_id: &str, level: i64, observed_total: i64) -> Result<bool, StoreError>;
        async fn fetch_badge_catalog(&self) -> Result<Vec<Badge>, StoreError>;
        async fn fetch_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, StoreError>;
        async fn insert_user_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, StoreError>;
    }
}
