//! Repairs aggregates that a settlement failed to propagate.
//!
//! A COMPLETED donation whose `propagated_at` is still empty well after it was settled has drifted: its settlement
//! crashed or timed out somewhere between the status transition and the end of propagation, and nobody knows how many
//! of its increments were applied. The sweep does not try to find out. It recomputes the affected campaign, team and
//! fundraiser totals from the COMPLETED donations, which is correct no matter where propagation stopped, and then
//! marks the donation as propagated.
//!
//! Donation points are not re-awarded during a repair. There is no record from which they could be derived, so a
//! settlement that crashed before its points step loses them.
use std::{collections::HashSet, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::Donation,
    events::EventProducers,
    traits::{AggregateStore, DonationManagement, GamificationStore, StoreError},
    BadgeApi,
};

/// How long a settled donation may stay unpropagated before the sweep treats it as drifted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Ids of the donations whose aggregates were recomputed
    pub repaired: Vec<String>,
    /// Ids of drifted donations left for a later sweep, because related donations are still being settled
    pub deferred: Vec<String>,
    /// Ids of drifted donations that could not be repaired, with the reason
    pub failed: Vec<(String, String)>,
}

impl ReconciliationResult {
    pub fn is_empty(&self) -> bool {
        self.repaired.is_empty() && self.deferred.is_empty() && self.failed.is_empty()
    }
}

pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.db)
    }
}

impl<B> ReconciliationApi<B>
where B: Clone + DonationManagement + AggregateStore + GamificationStore
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Finds every donation that was settled more than `grace` ago but never propagated, and repairs it.
    pub async fn run_sweep(&self, grace: Duration) -> Result<ReconciliationResult, StoreError> {
        let now = Utc::now();
        let cutoff = now - grace;
        let unpropagated = self.db.fetch_unpropagated_donations(now).await?;
        let (drifted, in_progress): (Vec<Donation>, Vec<Donation>) =
            unpropagated.into_iter().partition(|d| d.settled_at.map_or(true, |t| t < cutoff));
        let mut result = ReconciliationResult::default();
        if drifted.is_empty() {
            trace!("🩹️ No drifted donations found");
            return Ok(result);
        }
        info!("🩹️ {} drifted donations found. {} settlements are in progress.", drifted.len(), in_progress.len());
        let mut recomputed = HashSet::new();
        for donation in drifted {
            match self.repair(&donation, cutoff, &mut recomputed).await {
                Ok(true) => result.repaired.push(donation.id),
                Ok(false) => result.deferred.push(donation.id),
                Err(e) => {
                    error!("🩹️ Donation {} could not be reconciled. {e}", donation.id);
                    result.failed.push((donation.id, e.to_string()));
                },
            }
        }
        info!(
            "🩹️ Reconciliation complete. {} repaired, {} deferred, {} failed",
            result.repaired.len(),
            result.deferred.len(),
            result.failed.len()
        );
        Ok(result)
    }

    /// Returns `false` if the repair was deferred because a related settlement is still propagating.
    async fn repair(
        &self,
        donation: &Donation,
        cutoff: DateTime<Utc>,
        recomputed: &mut HashSet<String>,
    ) -> Result<bool, StoreError> {
        let campaign_id = donation.campaign_id.as_str();
        if !recomputed.contains(campaign_id) {
            let Some(totals) = self.db.recompute_idle_aggregates(campaign_id, cutoff).await? else {
                debug!("🩹️ Campaign {campaign_id} has settlements in progress. Donation {} is deferred.", donation.id);
                return Ok(false);
            };
            let campaign = &totals.campaign;
            debug!("🩹️ Campaign {campaign_id} recomputed: {} from {} donations", campaign.raised_amount, campaign.donation_count);
            if let Some(team) = &totals.team {
                debug!("🩹️ Team {} recomputed: {}", team.id, team.raised_amount);
            }
            let stats = &totals.fundraiser;
            debug!("🩹️ Fundraiser {} recomputed: {} from {} donations", stats.user_id, stats.total_raised, stats.total_donations);
            recomputed.insert(campaign_id.to_string());
        }
        self.db.mark_donation_propagated(&donation.id).await?;
        if let Some(donor) = donation.donor_id.as_deref() {
            info!("🩹️ Donation points for {} are not re-awarded to {donor} during reconciliation", donation.id);
            let badges = BadgeApi::new(self.db.clone(), self.producers.clone());
            match badges.evaluate(donor).await {
                Ok(awarded) if !awarded.is_empty() => {
                    info!("🩹️ {donor} was awarded {} badges during reconciliation", awarded.len())
                },
                Ok(_) => {},
                Err(e) => warn!("🩹️ Badge evaluation for {donor} failed during reconciliation. {e}"),
            }
        }
        Ok(true)
    }
}
