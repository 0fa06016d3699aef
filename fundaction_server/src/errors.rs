use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fundaction_engine::{GamificationError, LeaderboardError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid query parameter. {0}")]
    InvalidQueryParameter(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Webhook signature rejected. {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("Request denied. {0}")]
    ForbiddenPeer(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidQueryParameter(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::ForbiddenPeer(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<GamificationError> for ServerError {
    fn from(e: GamificationError) -> Self {
        match e {
            GamificationError::UserNotFound(_) | GamificationError::CampaignNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            GamificationError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<LeaderboardError> for ServerError {
    fn from(e: LeaderboardError) -> Self {
        Self::BackendError(e.to_string())
    }
}

/// Reasons a payment gateway webhook signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signature header was provided")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    Malformed(String),
    #[error("The signature timestamp is {0}s away from the server clock")]
    OutsideTolerance(i64),
    #[error("No signature matches the payload")]
    Mismatch,
}
