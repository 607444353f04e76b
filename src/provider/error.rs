use thiserror::Error;

use crate::resilience::retry::Transient;

/// Errors reported by a token provider. The display string is what the detail
/// screen shows to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("An unknown error has occurred")]
    Unknown,
    #[error("The request is invalid")]
    InvalidRequest,
    #[error("The response is invalid")]
    InvalidResponse,
    #[error("The client is invalid")]
    InvalidClient,
    #[error("Requests are made too fast. Slow down")]
    TooFast,
    #[error("Authorization has not yet been made")]
    PendingAuthorization,
    #[error("The authorization request has been cancelled")]
    AuthorizationCancelled,
    #[error("The user denied access to the application")]
    AuthorizationDenied,
    #[error("The authorization request expired")]
    AuthorizationRequestExpired,
    /// Transport-level failure (connection, timeout, server error)
    #[error("{0}")]
    Network(String),
}

impl ProviderError {
    /// Map a CPA protocol error identifier (`{"error": "..."}` bodies).
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "invalid_request" => ProviderError::InvalidRequest,
            "invalid_client" => ProviderError::InvalidClient,
            "slow_down" => ProviderError::TooFast,
            "authorization_pending" => ProviderError::PendingAuthorization,
            "cancelled" => ProviderError::AuthorizationCancelled,
            "access_denied" => ProviderError::AuthorizationDenied,
            "expired" | "expired_token" => ProviderError::AuthorizationRequestExpired,
            _ => ProviderError::Unknown,
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ProviderError::Unknown => "unknown",
            ProviderError::InvalidRequest => "invalid_request",
            ProviderError::InvalidResponse => "invalid_response",
            ProviderError::InvalidClient => "invalid_client",
            ProviderError::TooFast => "slow_down",
            ProviderError::PendingAuthorization => "authorization_pending",
            ProviderError::AuthorizationCancelled => "cancelled",
            ProviderError::AuthorizationDenied => "access_denied",
            ProviderError::AuthorizationRequestExpired => "expired",
            ProviderError::Network(_) => "network",
        }
    }
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
