//! Points and levels.
//!
//! The calculators are pure functions. [`PointsApi::award_points`] is the only place where points are written.
use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{db_types::Money, traits::GamificationStore, GamificationError};

/// Donations earn 10% of their value, in whole major units, as points. RM 100 earns 10 points.
pub fn donation_points(amount: Money) -> i64 {
    amount.value().max(0) / 1000
}

/// 5 points for creating a campaign, plus up to 20 more depending on how close it is to its goal.
pub fn campaign_creation_points(goal: Money, raised: Money) -> i64 {
    const BASE: i64 = 5;
    const MAX_BONUS: i128 = 20;
    let goal = goal.value();
    if goal <= 0 {
        return BASE;
    }
    let raised = raised.value().clamp(0, goal);
    let bonus = i128::from(raised) * MAX_BONUS / i128::from(goal);
    // bonus is in 0..=20
    BASE + bonus as i64
}

pub fn share_points(platform: &str) -> i64 {
    match platform.to_ascii_uppercase().as_str() {
        "FACEBOOK" | "TWITTER" | "WHATSAPP" | "TELEGRAM" => 2,
        "INSTAGRAM" => 3,
        "EMAIL" => 1,
        _ => 1,
    }
}

/// `floor(sqrt(total_points / 100)) + 1`. Level n starts at 100·(n-1)² points.
pub fn level(total_points: i64) -> i64 {
    integer_sqrt(total_points.max(0) / 100) + 1
}

fn integer_sqrt(n: i64) -> i64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let mut root = (n as f64).sqrt() as i64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAward {
    pub user_id: String,
    pub points: i64,
    pub total_points: i64,
    pub level: i64,
    pub previous_level: i64,
}

impl PointsAward {
    pub fn levelled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

pub struct PointsApi<B> {
    db: B,
}

impl<B: Debug> Debug for PointsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PointsApi ({:?})", self.db)
    }
}

impl<B> PointsApi<B>
where B: GamificationStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Adds `points` to the user's total and brings their level in line with the new total.
    ///
    /// The total is changed with an atomic increment. The level write is conditional on the total still being the one
    /// this call produced, so when awards race, the one that produced the final total writes the final level.
    ///
    /// Each triggering action must call this exactly once.
    pub async fn award_points(&self, user_id: &str, points: i64) -> Result<PointsAward, GamificationError> {
        let total_points = self
            .db
            .increment_user_points(user_id, points)
            .await?
            .ok_or_else(|| GamificationError::UserNotFound(user_id.to_string()))?;
        let level = level(total_points);
        let previous_level = self::level(total_points - points);
        if self.db.set_user_level(user_id, level, total_points).await? {
            trace!("⭐️ User {user_id} is on level {level} with {total_points} points");
        } else {
            debug!("⭐️ Points for {user_id} moved on concurrently. Leaving the level write to the later award.");
        }
        let award = PointsAward { user_id: user_id.to_string(), points, total_points, level, previous_level };
        if award.levelled_up() {
            info!("⭐️ User {user_id} has reached level {level}");
        }
        Ok(award)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn points_for_donations() {
        assert_eq!(donation_points(Money::from_major(100)), 10);
        assert_eq!(donation_points(Money::from_major(1000)), 100);
        assert_eq!(donation_points(Money::from(999)), 0);
        assert_eq!(donation_points(Money::from(12_345)), 12);
    }

    #[test]
    fn points_for_campaigns() {
        let goal = Money::from_major(10_000);
        assert_eq!(campaign_creation_points(goal, Money::from(0)), 5);
        assert_eq!(campaign_creation_points(goal, Money::from_major(5_000)), 15);
        assert_eq!(campaign_creation_points(goal, Money::from_major(9_999)), 24);
        assert_eq!(campaign_creation_points(goal, goal), 25);
        assert_eq!(campaign_creation_points(goal, Money::from_major(50_000)), 25);
        assert_eq!(campaign_creation_points(Money::from(0), Money::from_major(100)), 5);
    }

    #[test]
    fn points_for_shares() {
        assert_eq!(share_points("FACEBOOK"), 2);
        assert_eq!(share_points("instagram"), 3);
        assert_eq!(share_points("EMAIL"), 1);
        assert_eq!(share_points("LINKEDIN"), 1);
    }

    #[test]
    fn levels() {
        assert_eq!(level(0), 1);
        assert_eq!(level(99), 1);
        assert_eq!(level(100), 2);
        assert_eq!(level(350), 2);
        assert_eq!(level(399), 2);
        assert_eq!(level(400), 3);
        assert_eq!(level(450), 3);
        assert_eq!(level(900), 4);
        assert_eq!(level(-50), 1);
    }

    #[test]
    fn levels_never_decrease() {
        let mut previous = level(0);
        for points in (0..250_000).step_by(7) {
            let current = level(points);
            assert!(current >= previous, "level({points}) = {current} < {previous}");
            previous = current;
        }
        assert_eq!(integer_sqrt(i64::MAX / 100), 303_700_049);
    }
}
