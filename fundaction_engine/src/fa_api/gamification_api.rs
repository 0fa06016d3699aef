use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::CampaignStatus,
    events::EventProducers,
    points::{campaign_creation_points, share_points, PointsApi},
    traits::{AggregateStore, DonationManagement, GamificationStore},
    BadgeApi,
    GamificationError,
};

/// What a user earned for an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReward {
    pub user_id: String,
    pub points_awarded: i64,
    pub total_points: i64,
    pub level: i64,
    pub badges_awarded: Vec<String>,
}

/// The non-donation gamification paths: campaign creation and share tracking.
pub struct GamificationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for GamificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GamificationApi ({:?})", self.db)
    }
}

impl<B> GamificationApi<B>
where B: Clone + DonationManagement + AggregateStore + GamificationStore
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Called once by the campaign service after it has created a campaign.
    ///
    /// Counts the campaign towards the creator's fundraiser stats and their team's campaign count, awards the creator
    /// their campaign creation points, and evaluates their badges.
    pub async fn record_campaign_created(&self, campaign_id: &str) -> Result<ActivityReward, GamificationError> {
        let campaign = self
            .db
            .fetch_campaign(campaign_id)
            .await?
            .ok_or_else(|| GamificationError::CampaignNotFound(campaign_id.to_string()))?;
        let creator = campaign.creator_id.as_str();
        let active = campaign.status == CampaignStatus::Active;
        let stats = self.db.upsert_fundraiser_campaign(creator, active).await?.into_inner();
        debug!("🏅️ {creator} has created {} campaigns ({} active)", stats.total_campaigns, stats.active_campaigns);
        if let Some(team_id) = &campaign.team_id {
            let team = self.db.increment_team_campaigns(team_id).await?;
            debug!("🏅️ Team {team_id} now runs {} campaigns", team.campaign_count);
        }
        let points = campaign_creation_points(campaign.goal_amount, campaign.raised_amount);
        self.reward(creator, points).await
    }

    /// Records a share of a campaign on `platform`, and rewards the sharer.
    pub async fn track_share(&self, user_id: &str, platform: &str) -> Result<ActivityReward, GamificationError> {
        if self.db.fetch_user(user_id).await?.is_none() {
            return Err(GamificationError::UserNotFound(user_id.to_string()));
        }
        let stats = self.db.upsert_fundraiser_share(user_id).await?.into_inner();
        debug!("🏅️ {user_id} shared on {platform}. {} shares in total", stats.total_shares);
        self.reward(user_id, share_points(platform)).await
    }

    async fn reward(&self, user_id: &str, points: i64) -> Result<ActivityReward, GamificationError> {
        let award = PointsApi::new(self.db.clone()).award_points(user_id, points).await?;
        let badges_awarded = BadgeApi::new(self.db.clone(), self.producers.clone()).evaluate(user_id).await?;
        Ok(ActivityReward {
            user_id: user_id.to_string(),
            points_awarded: award.points,
            total_points: award.total_points,
            level: award.level,
            badges_awarded,
        })
    }
}
