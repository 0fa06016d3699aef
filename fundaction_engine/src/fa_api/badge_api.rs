//! Badge rule evaluation and badge catalog queries.
use std::{collections::HashSet, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Badge, BadgeCategory, BadgeRarity, BadgeRequirement, Donation, FundraiserStats, Money},
    events::{BadgeAwardedEvent, EventProducers},
    points::PointsApi,
    traits::{AggregateStore, DonationManagement, GamificationStore},
    GamificationError,
};

/// Everything a badge requirement can be checked against, loaded once per evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    pub donation_count: i64,
    pub largest_donation: Money,
    pub total_donated: Money,
    pub total_raised: Money,
    pub campaign_count: i64,
    pub share_count: i64,
}

impl UserProgress {
    /// `donations` must be the user's COMPLETED donations. Missing fundraiser stats count as zero.
    pub fn new(donations: &[Donation], stats: Option<&FundraiserStats>, campaign_count: i64) -> Self {
        Self {
            donation_count: donations.len() as i64,
            largest_donation: donations.iter().map(|d| d.amount).max().unwrap_or_default(),
            total_donated: donations.iter().map(|d| d.amount).sum(),
            total_raised: stats.map(|s| s.total_raised).unwrap_or_default(),
            campaign_count,
            share_count: stats.map(|s| s.total_shares).unwrap_or_default(),
        }
    }

    pub fn satisfies(&self, requirement: &BadgeRequirement) -> bool {
        match *requirement {
            BadgeRequirement::DonationCount(n) => self.donation_count >= n,
            BadgeRequirement::SingleDonation(amount) => self.donation_count > 0 && self.largest_donation >= amount,
            BadgeRequirement::TotalDonated(amount) => self.total_donated >= amount,
            BadgeRequirement::TotalRaised(amount) => self.total_raised >= amount,
            BadgeRequirement::CampaignCount(n) => self.campaign_count >= n,
            BadgeRequirement::ShareCount(n) => self.share_count >= n,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeFilter {
    pub category: Option<BadgeCategory>,
    pub rarity: Option<BadgeRarity>,
}

impl BadgeFilter {
    pub fn matches(&self, badge: &Badge) -> bool {
        self.category.map_or(true, |c| c == badge.category) && self.rarity.map_or(true, |r| r == badge.rarity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

pub struct BadgeApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for BadgeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BadgeApi ({:?})", self.db)
    }
}

impl<B> BadgeApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> BadgeApi<B>
where B: GamificationStore
{
    /// The badge catalog in catalog order, narrowed down by `filter`.
    pub async fn catalog(&self, filter: &BadgeFilter) -> Result<Vec<Badge>, GamificationError> {
        let badges = self.db.fetch_badge_catalog().await?;
        Ok(badges.into_iter().filter(|b| filter.matches(b)).collect())
    }

    /// The user's badges, most recently earned first.
    pub async fn badges_for_user(&self, user_id: &str) -> Result<Vec<EarnedBadge>, GamificationError> {
        let earned = self.db.fetch_user_badges(user_id).await?;
        let catalog = self.db.fetch_badge_catalog().await?;
        let result = earned
            .into_iter()
            .filter_map(|ub| {
                let badge = catalog.iter().find(|b| b.id == ub.badge_id).cloned();
                if badge.is_none() {
                    warn!("🏅️ User {user_id} holds badge {} which is not in the catalog", ub.badge_id);
                }
                badge.map(|badge| EarnedBadge { badge, earned_at: ub.earned_at })
            })
            .collect();
        Ok(result)
    }
}

impl<B> BadgeApi<B>
where B: Clone + DonationManagement + AggregateStore + GamificationStore
{
    /// Awards every badge in the catalog that the user does not own yet, and whose requirement they now meet.
    ///
    /// Badges are examined in catalog order. Owned badges are never re-examined. Each new badge's reward is paid
    /// through [`PointsApi::award_points`] and a [`BadgeAwardedEvent`] is published. Returns the ids of the badges
    /// awarded in this run. Running it again immediately is a no-op.
    pub async fn evaluate(&self, user_id: &str) -> Result<Vec<String>, GamificationError> {
        if self.db.fetch_user(user_id).await?.is_none() {
            debug!("🏅️ User {user_id} does not exist. There are no badges to evaluate.");
            return Ok(vec![]);
        }
        let donations = self.db.fetch_completed_donations_for_donor(user_id).await?;
        let stats = self.db.fetch_fundraiser_stats(user_id).await?;
        let campaign_count = self.db.count_campaigns_for_creator(user_id).await?;
        let progress = UserProgress::new(&donations, stats.as_ref(), campaign_count);
        trace!("🏅️ Progress for {user_id}: {progress:?}");
        let owned = self.db.fetch_user_badges(user_id).await?.into_iter().map(|b| b.badge_id).collect::<HashSet<_>>();
        let catalog = self.db.fetch_badge_catalog().await?;
        let points = PointsApi::new(self.db.clone());
        let mut awarded = vec![];
        for badge in catalog.into_iter().filter(|b| !owned.contains(&b.id)) {
            if !progress.satisfies(&badge.requirement) {
                continue;
            }
            if !self.db.insert_user_badge(user_id, &badge.id).await? {
                debug!("🏅️ {user_id} was awarded '{}' by a concurrent evaluation", badge.name);
                continue;
            }
            info!("🏅️ {user_id} has earned the '{}' badge", badge.name);
            if badge.points_reward > 0 {
                if let Err(e) = points.award_points(user_id, badge.points_reward).await {
                    error!("🏅️ Could not pay the {} point reward for '{}' to {user_id}. {e}", badge.points_reward, badge.name);
                }
            }
            awarded.push(badge.id.clone());
            self.producers.publish_badge_awarded(BadgeAwardedEvent::new(user_id, badge)).await;
        }
        Ok(awarded)
    }
}
