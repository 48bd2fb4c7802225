// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Quote Intake Service
//!
//! HTTP front door for quote-request form submissions:
//!
//! - Validates and sanitizes form input, reporting every field error at once
//! - 20 requests/hour fixed-window rate limit per client (default)
//! - Fans accepted requests out to business/customer SMS (Twilio) and
//!   business/customer email (SendGrid) with partial-failure tolerance
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honored in development):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `MAX_REQUESTS_PER_HOUR`: Rate limit ceiling per client (default: 20)
//! - `SENDGRID_API_KEY`, `SENDGRID_FROM_EMAIL`, `BUSINESS_EMAIL`
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_PHONE_NUMBER`,
//!   `BUSINESS_PHONE`
//! - `BUSINESS_NAME`, `FALLBACK_PHONE`: customer-facing copy

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quote_intake::{
    config::{Config, NotifyConfig, RateLimitConfig},
    handlers::{router, AppState},
    limiter::RateLimiter,
    notify::{Dispatcher, EmailSender, SendGridClient, SmsSender, TwilioClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        max_requests_per_hour = config.rate_limit.max_requests_per_hour,
        "Starting quote intake service"
    );

    // Create application state
    let email: Arc<dyn EmailSender> = Arc::new(SendGridClient::new(
        config.notify.sendgrid_api_key.clone(),
    ));
    let sms: Arc<dyn SmsSender> = Arc::new(TwilioClient::new(
        config.notify.twilio_account_sid.clone(),
        config.notify.twilio_auth_token.clone(),
    ));

    let state = Arc::new(AppState {
        limiter: RateLimiter::new(config.rate_limit.clone()),
        dispatcher: Dispatcher::new(email, sms, config.notify.clone()),
        config: config.clone(),
    });

    // Build router and start server
    let app = router(state);
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let notify_defaults = NotifyConfig::default();
    Config {
        bind_addr: env_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        rate_limit: RateLimitConfig {
            max_requests_per_hour: env_var("MAX_REQUESTS_PER_HOUR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            ..Default::default()
        },
        notify: NotifyConfig {
            sendgrid_api_key: env_var("SENDGRID_API_KEY")
                .unwrap_or(notify_defaults.sendgrid_api_key),
            sendgrid_from_email: env_var("SENDGRID_FROM_EMAIL")
                .unwrap_or(notify_defaults.sendgrid_from_email),
            business_email: env_var("BUSINESS_EMAIL").unwrap_or(notify_defaults.business_email),
            twilio_account_sid: env_var("TWILIO_ACCOUNT_SID")
                .unwrap_or(notify_defaults.twilio_account_sid),
            twilio_auth_token: env_var("TWILIO_AUTH_TOKEN")
                .unwrap_or(notify_defaults.twilio_auth_token),
            twilio_phone_number: env_var("TWILIO_PHONE_NUMBER")
                .unwrap_or(notify_defaults.twilio_phone_number),
            business_phone: env_var("BUSINESS_PHONE").unwrap_or(notify_defaults.business_phone),
            business_name: env_var("BUSINESS_NAME").unwrap_or(notify_defaults.business_name),
            fallback_phone: env_var("FALLBACK_PHONE").unwrap_or(notify_defaults.fallback_phone),
        },
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
