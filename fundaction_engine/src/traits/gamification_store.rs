use crate::{
    db_types::{Badge, User, UserBadge},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait GamificationStore {
    async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Atomically adds `points` to the user's total. Returns the new total, or `None` if the user does not exist.
    async fn increment_user_points(&self, user_id: &str, points: i64) -> Result<Option<i64>, StoreError>;

    /// Writes `level`, but only if the user's point total is still `observed_total`. Returns whether the write
    /// happened. A `false` result means a concurrent award has already moved the total on, and will write its own
    /// level.
    async fn set_user_level(&self, user_id: &str, level: i64, observed_total: i64) -> Result<bool, StoreError>;

    /// The full badge catalog, in catalog order. Badges with an unrecognised requirement descriptor are left out.
    async fn fetch_badge_catalog(&self) -> Result<Vec<Badge>, StoreError>;

    /// The user's badges, most recently earned first.
    async fn fetch_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, StoreError>;

    /// Records that the user has earned the badge. Returns `false` if they already had it.
    async fn insert_user_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, StoreError>;
}
