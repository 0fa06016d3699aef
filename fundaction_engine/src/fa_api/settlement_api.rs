//! The settlement processor.
//!
//! [`SettlementApi::settle`] is the entry point for payment notifications. It resolves the donation the notification
//! refers to, applies the payment outcome to it exactly once, and then drives the downstream effects of a completed
//! donation in order:
//!
//! 1. aggregate propagation ([`PropagationApi`]),
//! 2. donation points for the donor ([`PointsApi`]),
//! 3. badge evaluation for the donor ([`BadgeApi`]),
//! 4. a best-effort refresh of the all-time leaderboards ([`LeaderboardApi`]).
//!
//! The PENDING → COMPLETED transition is a compare-and-set in the store, so redelivered or concurrently delivered
//! notifications can never trigger the downstream steps twice. Once the transition has been committed it is never
//! undone: a failing or timed-out downstream step is logged and reported as a [`DownstreamFailure`], and the remaining
//! steps still run.
use std::{
    fmt::{Debug, Display},
    future::Future,
    time::Duration,
};

use log::*;

use crate::{
    db_types::{Donation, LeaderboardPeriod, PaymentStatus},
    events::{DonationFailedEvent, DonationSettledEvent, EventProducers},
    points::{donation_points, PointsApi},
    settlement_objects::{
        DownstreamFailure,
        NotificationMetadata,
        PaymentOutcome,
        SettlementOutcome,
        SettlementReport,
    },
    traits::EngineStore,
    BadgeApi,
    LeaderboardApi,
    PropagationApi,
    SettlementError,
};

#[derive(Debug, Clone)]
pub struct SettlementOptions {
    /// Upper bound on each downstream step. A step that runs over is abandoned and reported as a failure.
    pub step_timeout: Duration,
    /// Refresh the all-time leaderboards as part of every successful settlement.
    pub refresh_leaderboards: bool,
}

impl Default for SettlementOptions {
    fn default() -> Self {
        Self { step_timeout: Duration::from_secs(10), refresh_leaderboards: true }
    }
}

pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    options: SettlementOptions,
}

impl<B: Debug> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?}, {:?})", self.db, self.options)
    }
}

impl<B> SettlementApi<B>
where B: EngineStore
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, options: SettlementOptions::default() }
    }

    pub fn with_options(mut self, options: SettlementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Applies a payment notification.
    ///
    /// Errors are reserved for notifications that could not be applied at all: no matching donation
    /// ([`SettlementError::Resolution`]), or a store failure while loading or transitioning the donation
    /// ([`SettlementError::Store`]). Duplicates, contradictions and unknown event kinds are all successful outcomes.
    pub async fn settle(
        &self,
        outcome: PaymentOutcome,
        payment_ref: &str,
        metadata: &NotificationMetadata,
    ) -> Result<SettlementOutcome, SettlementError> {
        let target = match &outcome {
            PaymentOutcome::Succeeded => PaymentStatus::Completed,
            PaymentOutcome::Failed | PaymentOutcome::Canceled => PaymentStatus::Failed,
            PaymentOutcome::Unknown(kind) => {
                info!("🧾️ Ignoring {kind} notification for payment {payment_ref}");
                return Ok(SettlementOutcome::Ignored(kind.clone()));
            },
        };
        let donation = self.resolve_donation(payment_ref, metadata).await?;
        debug!("🧾️ Payment {payment_ref} {outcome} for donation {} ({})", donation.id, donation.payment_status);
        if donation.payment_status.is_terminal() {
            return Ok(terminal_outcome(donation, target));
        }
        match target {
            PaymentStatus::Completed => self.complete(donation).await,
            _ => self.fail(donation).await,
        }
    }

    /// Finds the donation for a payment reference. If no donation carries the reference, the donation id echoed back
    /// in the metadata is tried, as long as that donation is not tied to a different payment.
    pub async fn resolve_donation(
        &self,
        payment_ref: &str,
        metadata: &NotificationMetadata,
    ) -> Result<Donation, SettlementError> {
        if let Some(donation) = self.db.fetch_donation_by_payment_ref(payment_ref).await? {
            return Ok(donation);
        }
        if let Some(id) = metadata.donation_id.as_deref() {
            if let Some(donation) = self.db.fetch_donation(id).await? {
                match donation.payment_ref.as_deref() {
                    None | Some("") => {
                        debug!("🧾️ Payment {payment_ref} resolved to donation {id} through its metadata");
                        return Ok(donation);
                    },
                    Some(r) if r == payment_ref => return Ok(donation),
                    Some(other) => {
                        warn!("🧾️ Donation {id} belongs to payment {other}, so it cannot be settled by {payment_ref}")
                    },
                }
            }
        }
        warn!("🧾️ No donation matches payment {payment_ref}. The notification will be acknowledged and dropped.");
        Err(SettlementError::Resolution(payment_ref.to_string()))
    }

    async fn complete(&self, donation: Donation) -> Result<SettlementOutcome, SettlementError> {
        let id = donation.id.clone();
        let donation = match self.db.transition_pending_donation(&id, PaymentStatus::Completed).await? {
            Some(d) => d,
            None => return self.lost_race(&id, PaymentStatus::Completed).await,
        };
        info!("🧾️ Donation {id} of {} to campaign {} is COMPLETED", donation.amount, donation.campaign_id);
        let mut report = SettlementReport::new(donation.clone());

        let propagation = PropagationApi::new(self.db.clone());
        if let Err(e) = self.bounded("Aggregate propagation", propagation.propagate(&donation)).await {
            error!("🧾️ Donation {id} could not be propagated. The reconciliation sweep will repair it. {e}");
            report.failures.push(DownstreamFailure::Propagation(e));
        }

        match donation.donor_id.as_deref() {
            Some(donor) => {
                let points = donation_points(donation.amount);
                if points > 0 {
                    let api = PointsApi::new(self.db.clone());
                    match self.bounded("Points award", api.award_points(donor, points)).await {
                        Ok(award) => report.points_awarded = award.points,
                        Err(e) => {
                            error!("🧾️ {points} points for donation {id} could not be awarded to {donor}. {e}");
                            report.failures.push(DownstreamFailure::Points(e));
                        },
                    }
                }
                let badges = BadgeApi::new(self.db.clone(), self.producers.clone());
                match self.bounded("Badge evaluation", badges.evaluate(donor)).await {
                    Ok(awarded) => report.badges_awarded = awarded,
                    Err(e) => {
                        error!("🧾️ Badge evaluation for {donor} after donation {id} failed. {e}");
                        report.failures.push(DownstreamFailure::BadgeEvaluation(e));
                    },
                }
            },
            None => debug!("🧾️ Donation {id} is a guest donation. No points or badges to award."),
        }

        self.producers.publish_donation_settled(DonationSettledEvent::new(donation)).await;

        if self.options.refresh_leaderboards {
            let leaderboards = LeaderboardApi::new(self.db.clone());
            match tokio::time::timeout(self.options.step_timeout, leaderboards.refresh_all(LeaderboardPeriod::AllTime))
                .await
            {
                Ok(failures) => {
                    for (kind, e) in failures {
                        warn!("🧾️ The {kind} leaderboard could not be refreshed after donation {id}. {e}");
                        report.failures.push(DownstreamFailure::LeaderboardRefresh(format!("{kind}: {e}")));
                    }
                },
                Err(_) => {
                    let e = format!("Leaderboard refresh timed out after {}ms", self.options.step_timeout.as_millis());
                    warn!("🧾️ {e}");
                    report.failures.push(DownstreamFailure::LeaderboardRefresh(e));
                },
            }
        }
        if !report.is_clean() {
            warn!("🧾️ Donation {id} settled with {} downstream failures", report.failures.len());
        }
        Ok(SettlementOutcome::Completed(report))
    }

    async fn fail(&self, donation: Donation) -> Result<SettlementOutcome, SettlementError> {
        let id = donation.id.clone();
        match self.db.transition_pending_donation(&id, PaymentStatus::Failed).await? {
            Some(donation) => {
                info!("🧾️ Donation {id} of {} is FAILED", donation.amount);
                self.producers.publish_donation_failed(DonationFailedEvent::new(donation.clone())).await;
                Ok(SettlementOutcome::Failed(donation))
            },
            None => self.lost_race(&id, PaymentStatus::Failed).await,
        }
    }

    /// Someone else moved the donation out of PENDING between our read and our compare-and-set.
    async fn lost_race(&self, id: &str, target: PaymentStatus) -> Result<SettlementOutcome, SettlementError> {
        let current =
            self.db.fetch_donation(id).await?.ok_or_else(|| SettlementError::Resolution(id.to_string()))?;
        debug!("🧾️ Donation {id} was settled concurrently as {}", current.payment_status);
        Ok(terminal_outcome(current, target))
    }

    async fn bounded<T, E, F>(&self, step: &str, fut: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.options.step_timeout, fut).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("{step} timed out after {}ms", self.options.step_timeout.as_millis())),
        }
    }
}

/// Classifies a notification for a donation that has already reached a terminal status.
fn terminal_outcome(donation: Donation, target: PaymentStatus) -> SettlementOutcome {
    if donation.payment_status == target {
        debug!("🧾️ Donation {} is already {target}. Nothing to do.", donation.id);
        SettlementOutcome::AlreadySettled(donation)
    } else {
        warn!(
            "🧾️ Donation {} is {}, and cannot become {target}. The notification is acknowledged without changes.",
            donation.id, donation.payment_status
        );
        SettlementOutcome::TerminalConflict(donation)
    }
}
