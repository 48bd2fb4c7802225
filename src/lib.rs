// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Quote Intake Service
//!
//! Accepts quote-request form submissions over HTTP, validates and sanitizes
//! them, applies per-client rate limiting, and fans each accepted submission
//! out to four notification channels with partial-failure tolerance:
//!
//! - Business SMS + customer SMS (Twilio)
//! - Business email + customer email (SendGrid)
//! - Fixed-window rate limiting (20 requests per hour per client by default)
//! - All field validation errors reported in a single pass
//!
//! One channel's outage never suppresses the others; the request only fails
//! outright when every channel fails.

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod notify;
pub mod validator;

pub use config::Config;
pub use error::AppError;
pub use limiter::{RateLimitDecision, RateLimiter};
pub use notify::{DispatchSummary, Dispatcher};
pub use validator::{validate_quote, ValidationResult};
