use std::fmt::Display;

use fundaction_engine::{
    settlement_objects::{NotificationMetadata, PaymentOutcome, SettlementOutcome},
    ActivityReward,
};
use serde::{Deserialize, Serialize};

//----------------------------------------------   Payment webhooks  ---------------------------------------------------

/// A payment gateway webhook event. Only the fields the engine needs are deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentObject {
    /// The gateway's payment reference, e.g. a payment intent id
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: PaymentMetadata,
}

/// Metadata attached to the payment when it was created, and echoed back by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default, rename = "donationId", alias = "donation_id")]
    pub donation_id: Option<String>,
    #[serde(default, rename = "campaignId", alias = "campaign_id")]
    pub campaign_id: Option<String>,
}

impl PaymentWebhookEvent {
    pub fn outcome(&self) -> PaymentOutcome {
        PaymentOutcome::from_event_type(&self.event_type)
    }

    pub fn payment_ref(&self) -> &str {
        self.data.object.id.as_str()
    }

    pub fn notification_metadata(&self) -> NotificationMetadata {
        NotificationMetadata { donation_id: self.data.object.metadata.donation_id.clone() }
    }
}

/// The body returned to the gateway for every delivery it should not retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: String,
    pub result: String,
}

impl WebhookAck {
    pub fn new<S1: Into<String>, S2: Display>(event_id: S1, result: S2) -> Self {
        Self { received: true, event_id: event_id.into(), result: result.to_string() }
    }

    pub fn for_outcome<S: Into<String>>(event_id: S, outcome: &SettlementOutcome) -> Self {
        let result = match outcome {
            SettlementOutcome::Completed(_) => "completed",
            SettlementOutcome::Failed(_) => "failed",
            SettlementOutcome::AlreadySettled(_) => "duplicate",
            SettlementOutcome::TerminalConflict(_) => "conflict",
            SettlementOutcome::Ignored(_) => "ignored",
        };
        Self::new(event_id, result)
    }
}

//----------------------------------------------   Gamification  ------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BadgeQuery {
    pub category: Option<String>,
    pub rarity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub user_id: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignCreatedRequest {
    pub campaign_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub success: bool,
    pub reward: ActivityReward,
}
