//! Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payment::PaymentStatus;

/// ShopKit Error
#[derive(Debug, Error)]
pub enum Error {
    /// Could not reach the API
    #[error("Network error: {0}")]
    Network(String),
    /// Request timed out
    #[error("Request timed out")]
    Timeout,
    /// API failed server side
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message from the error body, if any
        message: String,
    },
    /// Credentials missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// API rejected the request
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message from the error body, if any
        message: String,
    },
    /// Payment settled with a status other than completed
    #[error("Payment not completed: {0}")]
    PaymentNotCompleted(PaymentStatus),
    /// Operation requires a signed in user
    #[error("Not authenticated")]
    NotAuthenticated,
    /// Checkout cannot start from an empty cart
    #[error("Cart is empty")]
    EmptyCart,
    /// Operation is not valid for the current checkout step
    #[error("Operation not valid in step {0}")]
    InvalidStep(&'static str),
    /// Required field is empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// No shop is loaded for the current user
    #[error("No shop loaded for current user")]
    NoShop,
    /// Invalid URL
    #[error("Invalid URL")]
    InvalidUrl,
    /// Parse Url Error
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Database Error
    #[error(transparent)]
    Database(#[from] crate::database::Error),
    /// Custom Error
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, timeouts and 5xx responses count as transient.
    /// Everything else surfaces immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::Server { .. }
        )
    }

    /// Map a non success HTTP status and its decoded message to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Error::Unauthorized(message),
            404 => Error::NotFound(message),
            400..=499 => Error::Rejected { status, message },
            _ => Error::Server { status, message },
        }
    }
}

/// ShopKit Error Response
///
/// Body shape the API uses for non success replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human readable message
    pub message: String,
}

impl ErrorResponse {
    /// Error response from json
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<ErrorResponse> for Error {
    fn from(err_response: ErrorResponse) -> Error {
        Error::Custom(err_response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_exactly_network_timeout_and_server() {
        assert!(Error::Network("connection refused".to_string()).is_transient());
        assert!(Error::Timeout.is_transient());
        assert!(Error::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_transient());

        assert!(!Error::Unauthorized("no token".to_string()).is_transient());
        assert!(!Error::NotFound("no such product".to_string()).is_transient());
        assert!(!Error::Rejected {
            status: 400,
            message: "bad request".to_string()
        }
        .is_transient());
        assert!(!Error::PaymentNotCompleted(PaymentStatus::Failed).is_transient());
        assert!(!Error::NotAuthenticated.is_transient());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            Error::from_status(401, "no"),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            Error::from_status(403, "no"),
            Error::Unauthorized(_)
        ));
        assert!(matches!(Error::from_status(404, "no"), Error::NotFound(_)));
        assert!(matches!(
            Error::from_status(422, "no"),
            Error::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            Error::from_status(500, "boom"),
            Error::Server { status: 500, .. }
        ));
        assert!(matches!(
            Error::from_status(502, "boom"),
            Error::Server { status: 502, .. }
        ));
    }

    #[test]
    fn error_response_decodes_api_body() {
        let body = r#"{"message":"No products found"}"#;
        let response = ErrorResponse::from_json(body).unwrap();
        assert_eq!(response.message, "No products found");

        let err: Error = response.into();
        assert!(matches!(err, Error::Custom(_)));
    }
}
