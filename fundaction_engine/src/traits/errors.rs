use thiserror::Error;

use crate::db_types::ConversionError;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert donation, since it already exists: {0}")]
    DonationAlreadyExists(String),
    #[error("Donation amounts must be positive, but {0} was given")]
    InvalidAmount(String),
    #[error("The requested donation {0} does not exist")]
    DonationNotFound(String),
    #[error("The requested campaign {0} does not exist")]
    CampaignNotFound(String),
    #[error("The requested team {0} does not exist")]
    TeamNotFound(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(String),
    #[error("Stored data could not be decoded. {0}")]
    CorruptData(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<ConversionError> for StoreError {
    fn from(e: ConversionError) -> Self {
        StoreError::CorruptData(e.0)
    }
}
