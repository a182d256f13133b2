//! Error types for the WordPress object mapper.
//!
//! # Design
//! Caller mistakes (`Validation`, `MissingRequiredParameter`) are raised
//! before any network activity. Server outcomes are split by what a caller
//! can do about them: a 400 carries the server's structured payload, 401/403
//! asks for credentials, and every other non-2xx status lands in `HttpError`
//! with the raw status code and body for debugging.

use serde_json::Value;
use thiserror::Error;

use crate::http::TransportError;
use crate::schema::EntityKind;

/// Convenience alias used throughout the crate.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Errors returned by the API facade, requests and entities.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A parameter value, type or combination supplied by the caller is invalid.
    #[error("invalid value for '{parameter}': {message}")]
    Validation { parameter: String, message: String },

    /// A field required to create an entity was not provided.
    #[error("the '{0}' field is required for this operation")]
    MissingRequiredParameter(String),

    /// A singular accessor matched nothing.
    #[error("no {kind} found for {selector}")]
    NoEntityFound { kind: EntityKind, selector: String },

    /// A filter that must produce at most one entity produced several. This
    /// points at a broken query or an unexpected server response shape.
    #[error("{count} {kind} entities matched {selector}, expected at most one")]
    MultipleEntitiesFound {
        kind: EntityKind,
        selector: String,
        count: usize,
    },

    /// The server returned 400 with a structured error body.
    #[error("bad request (HTTP 400): {payload}")]
    BadRequest { payload: Value },

    /// The server returned 401 or 403.
    #[error("authentication required (HTTP {status}): {body}")]
    AuthenticationRequired { status: u16, body: String },

    /// The server returned a non-2xx status other than 400, 401, 403 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// `get()` or `count()` was called on a request that was already sent.
    #[error("request has already been sent")]
    RequestAlreadySent,

    /// The facade could not be built, or an entity outlived its facade.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The HTTP collaborator failed before producing a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A request payload could not be encoded.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub(crate) fn validation(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// True for outcomes a caller is expected to handle routinely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NoEntityFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_parameter() {
        let err = ApiError::validation("order", "must be one of asc, desc");
        assert_eq!(
            err.to_string(),
            "invalid value for 'order': must be one of asc, desc"
        );
    }

    #[test]
    fn not_found_mentions_kind_and_selector() {
        let err = ApiError::NoEntityFound {
            kind: EntityKind::Post,
            selector: "slug 'missing'".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no post found for slug 'missing'");
    }

    #[test]
    fn transport_errors_convert() {
        let err: ApiError = TransportError::new("connection refused").into();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
