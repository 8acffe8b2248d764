//! Error types for the required workflows client.
//!
//! # Design
//! Three sources of failure are kept apart: local validation (never reaches
//! the network), the transport (surfaced verbatim), and non-2xx responses.
//! `NotFound` and `RateLimited` get dedicated variants because callers react
//! to them differently from other API errors. A non-2xx body in the
//! platform's error schema becomes `Api`; anything else lands in `HttpError`
//! with the raw status and body.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::http::HttpResponse;
use crate::response::Rate;
use crate::transport::TransportError;

/// Errors returned by `RequiredWorkflowsClient` and `ActionsService`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A path parameter was empty or contained a delimiter or control character.
    #[error("invalid {name} parameter {value:?}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// The request options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The transport could not complete the exchange.
    #[error("transport failure: {0}")]
    Transport(#[source] TransportError),

    /// The rate limit is spent until `reset`.
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        status: u16,
        message: String,
        reset: Option<DateTime<Utc>>,
    },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a structured error body.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        documentation_url: Option<String>,
        errors: Vec<FieldError>,
    },

    /// The server returned a non-2xx status with an unrecognized body.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    /// Status code of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::RateLimited { status, .. }
            | Self::Api { status, .. }
            | Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the same call could succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } | Self::HttpError { status, .. } => *status >= 500,
            Self::InvalidParameter { .. }
            | Self::InvalidOptions(_)
            | Self::NotFound
            | Self::DeserializationError(_)
            | Self::SerializationError(_) => false,
        }
    }
}

/// One entry of the `errors` array in a validation failure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    documentation_url: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Map a non-2xx response to the matching `ApiError` variant.
pub fn classify(response: &HttpResponse) -> ApiError {
    let body: Option<ErrorBody> = serde_json::from_str(&response.body).ok();
    let rate = Rate::from_response(response);

    let rate_limited = match response.status {
        429 => true,
        403 => {
            rate.as_ref().is_some_and(Rate::is_exhausted)
                || response.header("retry-after").is_some()
        }
        _ => false,
    };
    if rate_limited {
        return ApiError::RateLimited {
            status: response.status,
            message: body
                .map(|b| b.message)
                .unwrap_or_else(|| "rate limit exceeded".to_string()),
            reset: rate.map(|r| r.reset),
        };
    }

    if response.status == 404 {
        return ApiError::NotFound;
    }

    match body {
        Some(body) => ApiError::Api {
            status: response.status,
            message: body.message,
            documentation_url: body.documentation_url,
            errors: body.errors,
        },
        None => ApiError::HttpError {
            status: response.status,
            body: response.body.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        }
    }

    #[test]
    fn not_found_wins_over_body() {
        let err = classify(&response(
            404,
            &[],
            r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#,
        ));
        assert!(matches!(err, ApiError::NotFound));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn structured_body_becomes_api_error() {
        let err = classify(&response(
            422,
            &[],
            r#"{"message":"Validation Failed","errors":[{"resource":"RequiredWorkflow","field":"repository_id","code":"invalid"}]}"#,
        ));
        match err {
            ApiError::Api {
                status,
                message,
                documentation_url,
                errors,
            } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Validation Failed");
                assert!(documentation_url.is_none());
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field.as_deref(), Some("repository_id"));
                assert_eq!(errors[0].code.as_deref(), Some("invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_body_becomes_http_error() {
        let err = classify(&response(502, &[], "<html>bad gateway</html>"));
        assert!(matches!(err, ApiError::HttpError { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn exhausted_rate_limit_is_detected() {
        let err = classify(&response(
            403,
            &[
                ("X-RateLimit-Limit", "60"),
                ("X-RateLimit-Remaining", "0"),
                ("X-RateLimit-Reset", "1579721588"),
            ],
            r#"{"message":"API rate limit exceeded"}"#,
        ));
        match err {
            ApiError::RateLimited {
                status,
                message,
                reset,
            } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API rate limit exceeded");
                assert_eq!(reset.map(|r| r.timestamp()), Some(1579721588));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_forbidden_is_not_rate_limited() {
        let err = classify(&response(
            403,
            &[
                ("X-RateLimit-Limit", "5000"),
                ("X-RateLimit-Remaining", "4000"),
                ("X-RateLimit-Reset", "1579721588"),
            ],
            r#"{"message":"Must have admin rights to Repository."}"#,
        ));
        assert!(matches!(err, ApiError::Api { status: 403, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn too_many_requests_without_headers() {
        let err = classify(&response(429, &[], ""));
        assert!(matches!(err, ApiError::RateLimited { reset: None, .. }));
        assert_eq!(err.status(), Some(429));
    }
}
