//! Relay error taxonomy and its HTTP mapping.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::llm::LlmError;

use super::ErrorBody;

/// Errors surfaced by `POST /api/chat`.
///
/// The `Display` text of each variant is the user-facing message placed in
/// the `error` field of the response body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The request carried no message text, or its body could not be read.
    #[error("Message is required")]
    Validation(Option<String>),

    /// The upstream credential is missing.
    #[error("API key not configured")]
    Configuration,

    /// The provider answered with a failure status or an unusable body.
    #[error("{user_message}")]
    Upstream {
        status: StatusCode,
        user_message: String,
        details: Option<String>,
    },

    /// The upstream call exceeded its deadline.
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The provider could not be reached.
    #[error("Network error. Unable to reach AI service.")]
    Network(String),
}

impl RelayError {
    /// Build an upstream error from a provider status code.
    #[must_use]
    pub fn from_upstream_status(status: u16, body: String) -> Self {
        let user_message = match status {
            401 => "Invalid API key. Please check your configuration.",
            429 => "Rate limit exceeded. Please try again later.",
            _ => "Failed to get response from AI service",
        };

        // Mirror client and server errors; anything else becomes a 500.
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        Self::Upstream {
            status,
            user_message: user_message.to_string(),
            details: (!body.trim().is_empty()).then_some(body),
        }
    }

    /// HTTP status returned to the caller.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Optional diagnostic detail for the response body.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Upstream { details, .. } => details.clone(),
            Self::Validation(detail) => detail.clone(),
            Self::Network(detail) => Some(detail.clone()),
            Self::Configuration | Self::Timeout => None,
        }
    }
}

impl From<LlmError> for RelayError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => Self::Configuration,
            LlmError::Status { status, body } => Self::from_upstream_status(status, body),
            LlmError::Timeout => Self::Timeout,
            LlmError::Network(detail) => Self::Network(detail),
            LlmError::InvalidResponse(detail) => Self::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                user_message: "Invalid response from AI service".to_string(),
                details: Some(detail),
            },
        }
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(Some(rejection.body_text()))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };

        if status.is_server_error() {
            tracing::error!(
                name: "relay.request.failed",
                status = status.as_u16(),
                error = %body.error,
                details = ?body.details,
                "Chat relay failed"
            );
        } else {
            tracing::warn!(
                name: "relay.request.rejected",
                status = status.as_u16(),
                error = %body.error,
                details = ?body.details,
                "Chat relay rejected request"
            );
        }

        (status, Json(body)).into_response()
    }
}
