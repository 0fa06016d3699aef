use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Badge, Donation};

/// Published once per donation, after the PENDING → COMPLETED transition has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationSettledEvent {
    pub donation: Donation,
}

impl DonationSettledEvent {
    pub fn new(donation: Donation) -> Self {
        Self { donation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationFailedEvent {
    pub donation: Donation,
}

impl DonationFailedEvent {
    pub fn new(donation: Donation) -> Self {
        Self { donation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAwardedEvent {
    pub user_id: String,
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

impl BadgeAwardedEvent {
    pub fn new<S: Into<String>>(user_id: S, badge: Badge) -> Self {
        Self { user_id: user_id.into(), badge, earned_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    DonationSettled(DonationSettledEvent),
    DonationFailed(DonationFailedEvent),
    BadgeAwarded(BadgeAwardedEvent),
}
