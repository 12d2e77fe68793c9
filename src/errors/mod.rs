/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP status the forecast service uses when satellite coverage is missing
pub const COVERAGE_UNAVAILABLE_STATUS: u16 = 424;

/// Failures of a forecast service call
#[derive(Debug, Error)]
pub enum ClientError {
    /// The deadline elapsed before a complete response arrived
    #[error("request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a non-success status
    #[error("forecast service returned HTTP {status}{}", fmt_detail(.detail))]
    Http { status: u16, detail: Option<String> },

    /// Transport failure: DNS, refused connection, reset, ...
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Success status, but the body is not the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Rejected locally before any network traffic
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }

    pub fn is_coverage_unavailable(&self) -> bool {
        self.status() == Some(COVERAGE_UNAVAILABLE_STATUS)
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Timeout(_) => "UPSTREAM_TIMEOUT",
            ClientError::Http { status, .. } => match *status {
                COVERAGE_UNAVAILABLE_STATUS => "SATELLITE_COVERAGE_UNAVAILABLE",
                400..=499 => "UPSTREAM_4XX",
                500..=599 => "UPSTREAM_5XX",
                _ => "UPSTREAM_ERROR",
            },
            ClientError::Network(_) => "UPSTREAM_UNREACHABLE",
            ClientError::MalformedResponse(_) => "UPSTREAM_MALFORMED",
            ClientError::InvalidRequest(_) => "INVALID_INPUT",
        }
    }

    /// Message suitable for a dismissible error banner
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Timeout(after) => format!(
                "The forecast service did not answer within {} s. Try again.",
                after.as_secs_f64()
            ),
            ClientError::Http { status, .. } if *status == COVERAGE_UNAVAILABLE_STATUS => {
                "Satellite coverage is unavailable for the requested time window and area."
                    .to_string()
            }
            ClientError::Http { status, detail } => match detail {
                Some(d) => format!("Forecast service error ({}): {}", status, d),
                None => format!("Forecast service error ({}).", status),
            },
            ClientError::Network(_) => {
                "Could not reach the forecast service. Check your connection and try again."
                    .to_string()
            }
            ClientError::MalformedResponse(_) => {
                "The forecast service sent a response that could not be read.".to_string()
            }
            ClientError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
        }
    }
}

/// Type alias for forecast client results
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

#[derive(Debug)]
pub enum ApiError {
    Upstream(ClientError),
    NotFound(String),
    InvalidInput(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Upstream(e) => write!(f, "Upstream error: {}", e),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidRequest(msg) => ApiError::InvalidInput(msg),
            other => ApiError::Upstream(other),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Upstream(ClientError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(e) if e.is_coverage_unavailable() => StatusCode::FAILED_DEPENDENCY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message, upstream_status) = match &self {
            ApiError::Upstream(e) => (e.code(), e.user_message(), e.status()),
            ApiError::NotFound(msg) => ("NOT_FOUND", msg.clone(), None),
            ApiError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone(), None),
        };

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                upstream_status,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;
