use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::Donation;

/// The outcome of a payment, as reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Canceled,
    /// An event kind this engine does not know about. Acknowledged and ignored.
    Unknown(String),
}

impl PaymentOutcome {
    /// Maps a gateway event type (e.g. `payment_intent.succeeded`) onto an outcome.
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => PaymentOutcome::Succeeded,
            "payment_intent.payment_failed" => PaymentOutcome::Failed,
            "payment_intent.canceled" => PaymentOutcome::Canceled,
            other => PaymentOutcome::Unknown(other.to_string()),
        }
    }
}

impl Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOutcome::Succeeded => write!(f, "succeeded"),
            PaymentOutcome::Failed => write!(f, "failed"),
            PaymentOutcome::Canceled => write!(f, "canceled"),
            PaymentOutcome::Unknown(kind) => write!(f, "unknown ({kind})"),
        }
    }
}

/// Extra correlation data echoed back by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    /// The id of the donation the payment was created for
    pub donation_id: Option<String>,
}

impl NotificationMetadata {
    pub fn with_donation_id<S: Into<String>>(donation_id: S) -> Self {
        Self { donation_id: Some(donation_id.into()) }
    }
}

/// A step after the donation's status transition that failed. The donation stays COMPLETED regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownstreamFailure {
    Propagation(String),
    Points(String),
    BadgeEvaluation(String),
    LeaderboardRefresh(String),
}

impl Display for DownstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownstreamFailure::Propagation(e) => write!(f, "Aggregate propagation failed: {e}"),
            DownstreamFailure::Points(e) => write!(f, "Points award failed: {e}"),
            DownstreamFailure::BadgeEvaluation(e) => write!(f, "Badge evaluation failed: {e}"),
            DownstreamFailure::LeaderboardRefresh(e) => write!(f, "Leaderboard refresh failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub donation: Donation,
    pub points_awarded: i64,
    pub badges_awarded: Vec<String>,
    pub failures: Vec<DownstreamFailure>,
}

impl SettlementReport {
    pub fn new(donation: Donation) -> Self {
        Self { donation, points_awarded: 0, badges_awarded: vec![], failures: vec![] }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// First-time successful settlement.
    Completed(SettlementReport),
    /// A failed or canceled payment was recorded.
    Failed(Donation),
    /// The notification had already been applied. Nothing changed.
    AlreadySettled(Donation),
    /// The notification contradicts the donation's terminal status. Nothing changed.
    TerminalConflict(Donation),
    /// The event kind is not one we act on.
    Ignored(String),
}

impl SettlementOutcome {
    pub fn donation(&self) -> Option<&Donation> {
        match self {
            SettlementOutcome::Completed(report) => Some(&report.donation),
            SettlementOutcome::Failed(d) | SettlementOutcome::AlreadySettled(d) | SettlementOutcome::TerminalConflict(d) => {
                Some(d)
            },
            SettlementOutcome::Ignored(_) => None,
        }
    }
}

impl Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementOutcome::Completed(r) => write!(f, "Donation {} settled", r.donation.id),
            SettlementOutcome::Failed(d) => write!(f, "Donation {} marked as failed", d.id),
            SettlementOutcome::AlreadySettled(d) => write!(f, "Donation {} was already settled", d.id),
            SettlementOutcome::TerminalConflict(d) => {
                write!(f, "Donation {} is already {}. Notification ignored", d.id, d.payment_status)
            },
            SettlementOutcome::Ignored(kind) => write!(f, "Event type {kind} ignored"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_types() {
        assert_eq!(PaymentOutcome::from_event_type("payment_intent.succeeded"), PaymentOutcome::Succeeded);
        assert_eq!(PaymentOutcome::from_event_type("payment_intent.payment_failed"), PaymentOutcome::Failed);
        assert_eq!(PaymentOutcome::from_event_type("payment_intent.canceled"), PaymentOutcome::Canceled);
        assert_eq!(
            PaymentOutcome::from_event_type("charge.refunded"),
            PaymentOutcome::Unknown("charge.refunded".to_string())
        );
    }
}
