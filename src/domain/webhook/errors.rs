//! Error taxonomy for webhook processing.
//!
//! Only signature and envelope failures reject the delivery with HTTP 400.
//! Every error raised after verification is folded into the event's recorded
//! outcome and acknowledged with HTTP 200, so the provider does not retry
//! events we have already decided about.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that can occur while verifying, decoding, or handling a webhook
/// delivery.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The signature did not match the payload.
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    /// The signed timestamp is older than the acceptance window.
    #[error("Webhook timestamp is outside the acceptable range")]
    TimestampOutOfRange,

    /// The signed timestamp is in the future beyond clock skew tolerance.
    #[error("Webhook timestamp is invalid")]
    InvalidTimestamp,

    /// The event envelope could not be decoded.
    #[error("Malformed event envelope: {0}")]
    MalformedPayload(String),

    /// The event's inner object could not be decoded into the expected type.
    #[error("Event object could not be decoded: {0}")]
    MalformedObject(String),

    /// A required metadata field was absent or empty.
    #[error("Missing metadata field: {0}")]
    MissingMetadata(&'static str),

    /// A metadata field was present but unparseable.
    #[error("Invalid metadata field '{field}': {reason}")]
    InvalidMetadata { field: &'static str, reason: String },

    /// The upstream provider says the entity is not actually active/paid.
    #[error("Upstream verification failed: {0}")]
    VerificationFailed(String),

    /// No local record exists for the referenced entity yet.
    #[error("No local record found: {0}")]
    RecordNotFound(String),

    /// A tour operator must be verified before its subscription activates.
    #[error("Tour operator {0} is not verified")]
    OperatorNotVerified(i64),

    /// A data store write failed after the retry.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// The payment provider API call failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// The checkout referenced a points package we do not sell.
    #[error("Unknown points package: {0}")]
    UnknownPackage(String),
}

impl ProcessingError {
    /// True when this error rejects the delivery at the HTTP boundary.
    ///
    /// Everything else is recorded in the event store and acknowledged with
    /// 200 so the provider's retry schedule stays the only retry mechanism.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ProcessingError::InvalidSignature
                | ProcessingError::TimestampOutOfRange
                | ProcessingError::InvalidTimestamp
                | ProcessingError::MalformedPayload(_)
        )
    }

    /// HTTP status for this error when it surfaces at the boundary.
    pub fn status_code(&self) -> StatusCode {
        if self.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        }
    }
}

impl From<DomainError> for ProcessingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ProviderError => ProcessingError::Provider(err.message),
            ErrorCode::VerificationFailed => ProcessingError::VerificationFailed(err.message),
            ErrorCode::SubscriptionNotFound
            | ErrorCode::PromotionNotFound
            | ErrorCode::PointsAccountNotFound
            | ErrorCode::EntityNotFound => ProcessingError::RecordNotFound(err.message),
            ErrorCode::OperatorNotVerified => {
                let operator_id = err
                    .details
                    .get("operator_id")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                ProcessingError::OperatorNotVerified(operator_id)
            }
            _ => ProcessingError::Persistence(err.to_string()),
        }
    }
}
