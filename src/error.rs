// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the quote intake service.
//!
//! A closed set of request-terminating error kinds. Field-level and
//! single-channel failures are recovered before reaching this type; only
//! total-failure or unexpected conditions produce a 5xx here, and those
//! always carry the human fallback contact instruction. Underlying causes
//! are logged, never echoed to the caller.

use crate::notify::ChannelFailure;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Request-terminating error kinds.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Too many requests. Please try again later.")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Validation failed")]
    ValidationFailed(Vec<String>),

    #[error("Failed to send notifications. Please call us at {fallback}.")]
    AllNotificationsFailed {
        fallback: String,
        failures: Vec<ChannelFailure>,
    },

    #[error("An error occurred processing your request. Please call us at {fallback}.")]
    Unexpected {
        fallback: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Uniform JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(ErrorBody {
                    error: message,
                    details: None,
                }),
            )
                .into_response(),

            Self::RateLimitExceeded { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
                Json(ErrorBody {
                    error: message,
                    details: None,
                }),
            )
                .into_response(),

            Self::ValidationFailed(details) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: message,
                    details: Some(json!(details)),
                }),
            )
                .into_response(),

            Self::AllNotificationsFailed { failures, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: message,
                    details: serde_json::to_value(&failures).ok(),
                }),
            )
                .into_response(),

            Self::Unexpected { source, .. } => {
                error!(error = %source, "Unexpected failure while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: message,
                        details: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(AppError::MethodNotAllowed.to_string(), "Method not allowed");
        assert_eq!(
            AppError::RateLimitExceeded {
                retry_after: Duration::from_secs(60)
            }
            .to_string(),
            "Too many requests. Please try again later."
        );
        let err = AppError::AllNotificationsFailed {
            fallback: "(828) 279-1948".to_string(),
            failures: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Failed to send notifications. Please call us at (828) 279-1948."
        );
    }

    #[test]
    fn test_status_mapping() {
        let response = AppError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = AppError::ValidationFailed(vec!["bad".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(30),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("30")
        );
    }
}
