// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Quote request validator.
//!
//! Sanitizes and validates raw form input into a normalized record:
//! - Free-text fields are trimmed, script-tag stripped, and length-capped
//! - Phone numbers are normalized to `+1XXXXXXXXXX`
//! - All field errors are accumulated into one ordered list, so the caller
//!   can surface every problem in a single round trip

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum length of any free-text field after sanitization.
const MAX_FIELD_CHARS: usize = 1000;

/// Field-level validation errors, in the user-facing wording returned to
/// the form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must be at least 2 characters")]
    NameTooShort,

    #[error("Phone number is required")]
    MissingPhone,

    #[error("Please provide a valid US phone number")]
    InvalidPhone,

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Service type is required")]
    MissingServiceType,

    #[error("Address must be at least 5 characters")]
    AddressTooShort,
}

/// Raw form submission as received over the wire.
///
/// Fields are kept as `serde_json::Value` so that absent and non-string
/// values are handled uniformly by sanitization rather than rejected by the
/// deserializer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuoteRequest {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub phone: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub service_type: Value,
    #[serde(default)]
    pub address: Value,
    #[serde(default)]
    pub details: Value,
}

/// A fully sanitized and validated quote request.
///
/// Only produced when every field passed validation; this is the sole input
/// type the notification dispatcher accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuote {
    pub name: String,
    /// Normalized to `+1` followed by 10 digits
    pub phone: String,
    /// Optional; `None` when the form field was absent or empty
    pub email: Option<String>,
    pub service_type: String,
    pub address: String,
    /// Defaults to an empty string when not supplied
    pub details: String,
}

/// Result of validating a raw submission.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid(ValidatedQuote),
    /// Submission is invalid; all violated fields are listed in order
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }
}

fn script_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script tag pattern is valid")
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

/// Sanitize a free-text form value.
///
/// Non-string input sanitizes to an empty string. String input is trimmed,
/// stripped of `<script>...</script>` sequences (case-insensitive,
/// non-greedy), capped at [`MAX_FIELD_CHARS`] characters, and trimmed again
/// so the truncation boundary cannot reintroduce edge whitespace. The
/// operation is idempotent.
pub fn sanitize(value: &Value) -> String {
    let Some(raw) = value.as_str() else {
        return String::new();
    };
    let stripped = script_tag_re().replace_all(raw.trim(), "");
    let capped: String = stripped.chars().take(MAX_FIELD_CHARS).collect();
    capped.trim().to_string()
}

/// Normalize a phone number to E.164-like `+1XXXXXXXXXX` form.
///
/// Accepts exactly 10 digits (country code 1 assumed) or 11 digits starting
/// with `1`, after stripping every non-digit character.
pub fn normalize_phone(value: &Value) -> Result<String, ValidationError> {
    let raw = value.as_str().map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(ValidationError::MissingPhone);
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Ok(format!("+1{digits}")),
        11 if digits.starts_with('1') => Ok(format!("+{digits}")),
        _ => Err(ValidationError::InvalidPhone),
    }
}

/// Validate a raw submission, accumulating every field error.
///
/// Errors are collected in field order rather than short-circuiting, so one
/// response can report everything the user needs to fix.
pub fn validate_quote(raw: &RawQuoteRequest) -> ValidationResult {
    let mut errors = Vec::new();

    let name = sanitize(&raw.name);
    if name.chars().count() < 2 {
        errors.push(ValidationError::NameTooShort);
    }

    let phone = match normalize_phone(&raw.phone) {
        Ok(phone) => Some(phone),
        Err(err) => {
            errors.push(err);
            None
        }
    };

    let email_raw = sanitize(&raw.email);
    let email = if email_raw.is_empty() {
        None
    } else if email_re().is_match(&email_raw) {
        Some(email_raw)
    } else {
        errors.push(ValidationError::InvalidEmail);
        None
    };

    let service_type = sanitize(&raw.service_type);
    if service_type.is_empty() {
        errors.push(ValidationError::MissingServiceType);
    }

    let address = sanitize(&raw.address);
    if address.chars().count() < 5 {
        errors.push(ValidationError::AddressTooShort);
    }

    let details = sanitize(&raw.details);

    match phone {
        Some(phone) if errors.is_empty() => ValidationResult::Valid(ValidatedQuote {
            name,
            phone,
            email,
            service_type,
            address,
            details,
        }),
        _ => ValidationResult::Invalid(errors),
    }
}
