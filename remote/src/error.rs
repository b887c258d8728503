use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use inkpost_core::auth::AuthError;
use inkpost_core::store::StoreError;

/// Error document returned by the storage services.
#[derive(Deserialize, Debug, Clone)]
pub struct ServiceErrorResponse {
    #[serde(rename = "Error")]
    pub error: ServiceErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServiceErrorDetail {
    /// Service error code string (e.g. "ValidationException").
    #[serde(rename = "Code")]
    pub code: String,
    /// Developer-facing error message.
    #[serde(rename = "Message")]
    pub message: String,
}

/// Internal error type consolidating all failures within the remote clients.
/// Converted into the public `StoreError` or `AuthError` at the trait
/// implementation boundaries.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Error during network communication.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Error serializing the request body to JSON.
    #[error("Failed to serialize request body: {0}")]
    RequestSerialization(#[source] serde_json::Error),

    /// Error parsing a *successful* response body.
    #[error("Failed to parse successful response body ({context}): {source}")]
    ResponseParsing {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error reported by the service (non-success status code).
    #[error("Service error: status={status}, message='{body_text}'")]
    ApiError {
        status: StatusCode,
        /// Parsed error detail from the response body, if available.
        detail: Option<ServiceErrorDetail>,
        /// Raw response body text.
        body_text: String,
    },

    /// Invalid configuration provided to the client.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The service returned an unexpected response format or inconsistent
    /// data (e.g. an attribute with the wrong type tag).
    #[error("Unexpected response format or data: {0}")]
    UnexpectedResponse(String),
}

/// Processes a `reqwest::Response` known to carry a non-success status and
/// converts it into a `RemoteError::ApiError`. If the body cannot be parsed
/// as the service's error document, the raw text is kept; if the body
/// cannot even be read, the read failure surfaces as a network error.
pub(crate) async fn map_response_error(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    debug_assert!(!status.is_success(), "map_response_error called with success status");

    match response.text().await {
        Ok(body_text) => match serde_json::from_str::<ServiceErrorResponse>(&body_text) {
            Ok(parsed) => RemoteError::ApiError {
                status,
                detail: Some(parsed.error),
                body_text,
            },
            Err(parse_err) => {
                warn!(
                    status = %status,
                    error = %parse_err,
                    body = %body_text,
                    "Failed to parse service error response JSON, returning raw body."
                );
                RemoteError::ApiError {
                    status,
                    detail: None,
                    body_text,
                }
            }
        },
        Err(e) => {
            warn!(status = %status, error = %e, "Failed to read service error response body.");
            RemoteError::Network(e)
        }
    }
}

impl From<RemoteError> for StoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(source) => StoreError::Network(Box::new(source)),
            RemoteError::RequestSerialization(source) => {
                StoreError::InvalidRequest(format!("Failed to serialize request: {}", source))
            }
            RemoteError::ResponseParsing { source, .. } => StoreError::Parsing(Box::new(source)),
            RemoteError::ApiError { status, detail, body_text } => {
                let message = detail
                    .map(|d| format!("{} (Code: {})", d.message, d.code))
                    .unwrap_or_else(|| body_text.clone());

                match status {
                    StatusCode::BAD_REQUEST => StoreError::InvalidRequest(message),
                    StatusCode::UNAUTHORIZED => StoreError::Authentication(message),
                    StatusCode::FORBIDDEN => StoreError::Authentication(message),
                    StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited,
                    _ => StoreError::Api {
                        status: status.as_u16(),
                        message,
                    },
                }
            }
            RemoteError::InvalidConfiguration(msg) => StoreError::Configuration(msg),
            RemoteError::UnexpectedResponse(msg) => {
                StoreError::Parsing(msg.into())
            }
        }
    }
}

impl From<RemoteError> for AuthError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(source) => AuthError::Network(Box::new(source)),
            RemoteError::RequestSerialization(source) => {
                AuthError::Rejected(format!("Failed to serialize request: {}", source))
            }
            RemoteError::ResponseParsing { source, .. } => AuthError::Parsing(Box::new(source)),
            RemoteError::ApiError { status, detail, body_text } => {
                let message = detail
                    .map(|d| format!("{} (Code: {})", d.message, d.code))
                    .unwrap_or_else(|| body_text.clone());
                AuthError::Rejected(format!("status={}, {}", status.as_u16(), message))
            }
            RemoteError::InvalidConfiguration(msg) => AuthError::Configuration(msg),
            RemoteError::UnexpectedResponse(msg) => AuthError::Parsing(msg.into()),
        }
    }
}
