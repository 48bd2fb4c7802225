// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the quote intake service.
//!
//! Defaults match the deployment this service was extracted from; every
//! value can be overridden through environment variables (see `main.rs`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the quote intake service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Notification channel configuration
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client (default: 20)
    #[serde(default = "default_max_requests_per_hour")]
    pub max_requests_per_hour: u32,

    /// Window length in milliseconds (default: 3,600,000 = 1 hour)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// Notification provider credentials and addressing.
///
/// Credentials default to empty strings so the service can boot in
/// development; sends will fail against the real providers until they are
/// supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// SendGrid API key
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Verified sender address for outgoing email
    #[serde(default)]
    pub sendgrid_from_email: String,

    /// Business inbox that receives lead notifications
    #[serde(default)]
    pub business_email: String,

    /// Twilio account SID
    #[serde(default)]
    pub twilio_account_sid: String,

    /// Twilio auth token
    #[serde(default)]
    pub twilio_auth_token: String,

    /// Twilio-provisioned sending number (E.164)
    #[serde(default)]
    pub twilio_phone_number: String,

    /// Business phone that receives lead SMS (E.164)
    #[serde(default)]
    pub business_phone: String,

    /// Business name used in customer-facing copy
    #[serde(default = "default_business_name")]
    pub business_name: String,

    /// Phone number customers are told to call when notifications fail
    #[serde(default = "default_fallback_phone")]
    pub fallback_phone: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests_per_hour() -> u32 {
    20
}

fn default_window_ms() -> u64 {
    3_600_000 // 1 hour
}

fn default_business_name() -> String {
    "Lifted Up Junk".to_string()
}

fn default_fallback_phone() -> String {
    "(828) 279-1948".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_hour: default_max_requests_per_hour(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sendgrid_api_key: String::new(),
            sendgrid_from_email: String::new(),
            business_email: String::new(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            business_phone: String::new(),
            business_name: default_business_name(),
            fallback_phone: default_fallback_phone(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}
