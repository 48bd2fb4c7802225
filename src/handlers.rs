// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the quote intake service.
//!
//! One submission route plus health checks. A request moves through method
//! check, rate limit, parse, validate, and dispatch, terminating with a
//! uniform JSON response at the first failed stage. Permissive CORS is
//! applied to every response by the router's CORS layer, and a catch-panic
//! layer converts anything unexpected into the generic 500 with the
//! fallback contact instruction.

use crate::config::Config;
use crate::error::AppError;
use crate::limiter::{RateLimitDecision, RateLimiter};
use crate::notify::{DispatchError, Dispatcher};
use crate::validator::{validate_quote, RawQuoteRequest, ValidationResult};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub dispatcher: Dispatcher,
    pub config: Config,
}

/// Successful submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub notifications: NotificationCounts,
}

/// Per-channel delivery counts reported to the caller.
#[derive(Debug, Serialize)]
pub struct NotificationCounts {
    pub sent: u32,
    pub failed: u32,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "quote-intake",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// CORS preflight endpoint; the CORS layer fills in the headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Method-router fallback for anything other than POST/OPTIONS.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Handle a quote form submission.
pub async fn submit_quote(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_key(&headers, addr);
    match handle_submission(&state, &client, &body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_submission(
    state: &AppState,
    client: &str,
    body: &[u8],
) -> Result<SubmitResponse, AppError> {
    match state.limiter.check(client).await {
        RateLimitDecision::Limited { retry_after } => {
            info!(client = %client, "Rate limit exceeded");
            return Err(AppError::RateLimitExceeded { retry_after });
        }
        RateLimitDecision::Allowed { remaining } => {
            debug!(client = %client, remaining, "Rate limit check passed");
        }
    }

    let raw: RawQuoteRequest = serde_json::from_slice(body).map_err(|err| {
        debug!(client = %client, error = %err, "Malformed request body");
        AppError::ValidationFailed(vec!["Request body must be valid JSON".to_string()])
    })?;

    let quote = match validate_quote(&raw) {
        ValidationResult::Valid(quote) => quote,
        ValidationResult::Invalid(errors) => {
            info!(client = %client, count = errors.len(), "Validation failed");
            return Err(AppError::ValidationFailed(
                errors.iter().map(ToString::to_string).collect(),
            ));
        }
    };

    let summary = state.dispatcher.dispatch(&quote).await.map_err(|err| {
        let DispatchError::AllChannelsFailed(failures) = err;
        AppError::AllNotificationsFailed {
            fallback: state.config.notify.fallback_phone.clone(),
            failures,
        }
    })?;

    info!(
        client = %client,
        sent = summary.sent,
        failed = summary.failed,
        "Quote request accepted"
    );

    Ok(SubmitResponse {
        success: true,
        message: "Quote request received! We will contact you within 2 hours.".to_string(),
        notifications: NotificationCounts {
            sent: summary.sent,
            failed: summary.failed,
        },
    })
}

/// Rate-limit key for a request: first `X-Forwarded-For` entry when the
/// service sits behind a proxy, else the peer address.
fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let fallback_phone = state.config.notify.fallback_phone.clone();

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(
            "/api/quote",
            post(submit_quote)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| {
                AppError::Unexpected {
                    fallback: fallback_phone.clone(),
                    source: anyhow::anyhow!(panic_message(panic)),
                }
                .into_response()
            },
        ))
        .layer(cors)
        .with_state(state)
}

fn panic_message(panic: Box<dyn Any + Send + 'static>) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_key_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(client_key(&headers, addr), "203.0.113.9");
    }

    #[test]
    fn test_client_key_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "192.0.2.5:9999".parse().unwrap();
        assert_eq!(client_key(&headers, addr), "192.0.2.5");
    }

    #[test]
    fn test_client_key_ignores_empty_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "  ".parse().unwrap());
        let addr: SocketAddr = "192.0.2.5:9999".parse().unwrap();
        assert_eq!(client_key(&headers, addr), "192.0.2.5");
    }
}
