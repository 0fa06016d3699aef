use thiserror::Error;

use crate::traits::StoreError;

/// Errors that prevent a payment notification from being applied at all. Anything that goes wrong *after* the
/// donation's status transition is reported as a [`crate::settlement_objects::DownstreamFailure`] instead.
#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("No donation could be found for payment reference {0}")]
    Resolution(String),
    #[error("The donation could not be loaded or transitioned. {0}")]
    Store(#[from] StoreError),
}

impl SettlementError {
    /// Whether the notifier should be asked to redeliver. Only store failures qualify: nothing was committed, and a
    /// later delivery may well succeed. A resolution failure will never fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, SettlementError::Store(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum GamificationError {
    #[error("The requested user {0} does not exist")]
    UserNotFound(String),
    #[error("The requested campaign {0} does not exist")]
    CampaignNotFound(String),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum LeaderboardError {
    #[error("Leaderboard could not be computed. {0}")]
    Store(#[from] StoreError),
}
