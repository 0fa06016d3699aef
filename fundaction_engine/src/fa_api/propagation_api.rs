use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Campaign, Donation, FundraiserStats, Team},
    traits::{AggregateStore, DonationManagement, StoreError},
};

/// The aggregates as they stood right after a donation's increments were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationSummary {
    pub campaign: Campaign,
    pub team: Option<Team>,
    pub fundraiser: FundraiserStats,
}

/// Applies a completed donation to the campaign, team and fundraiser aggregates.
pub struct PropagationApi<B> {
    db: B,
}

impl<B: Debug> Debug for PropagationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropagationApi ({:?})", self.db)
    }
}

impl<B> PropagationApi<B>
where B: AggregateStore + DonationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Must be called exactly once per donation, by whoever won the PENDING → COMPLETED transition.
    ///
    /// Every total is moved with an atomic increment, so concurrent donations to the same campaign or team never lose
    /// an update. The fundraiser's average donation is the exception: it is recomputed from the totals returned by the
    /// increment, and written back separately. Once everything has been applied the donation is marked as propagated.
    /// If this fails part way, the reconciliation sweep will recompute the aggregates later.
    pub async fn propagate(&self, donation: &Donation) -> Result<PropagationSummary, StoreError> {
        let amount = donation.amount;
        let campaign = self.db.increment_campaign_totals(&donation.campaign_id, amount).await?;
        debug!(
            "🔄️ Campaign {} has raised {} from {} donations",
            campaign.id, campaign.raised_amount, campaign.donation_count
        );
        let team = match &campaign.team_id {
            Some(team_id) => {
                let team = self.db.increment_team_raised(team_id, amount).await?;
                debug!("🔄️ Team {} has raised {}", team.id, team.raised_amount);
                Some(team)
            },
            None => None,
        };
        let upserted = self.db.upsert_fundraiser_donation(&campaign.creator_id, amount).await?;
        if upserted.is_created() {
            debug!("🔄️ Fundraiser stats created for {}", campaign.creator_id);
        }
        let mut fundraiser = upserted.into_inner();
        let average = fundraiser.total_raised.checked_div(fundraiser.total_donations).unwrap_or_default();
        if average != fundraiser.average_donation {
            self.db.set_average_donation(&fundraiser.user_id, average).await?;
            fundraiser.average_donation = average;
        }
        debug!(
            "🔄️ Fundraiser {} has raised {} from {} donations (average {})",
            fundraiser.user_id, fundraiser.total_raised, fundraiser.total_donations, fundraiser.average_donation
        );
        self.db.mark_donation_propagated(&donation.id).await?;
        Ok(PropagationSummary { campaign, team, fundraiser })
    }
}
