// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Notification fan-out for accepted quote requests.
//!
//! Each submission produces four independent sends: business SMS, customer
//! SMS, business email, and customer email. The sends run concurrently and
//! each failure is contained to its own channel; the batch only fails as a
//! whole when every channel fails.
//!
//! Providers are reached through the [`EmailSender`] and [`SmsSender`]
//! traits so tests can substitute in-memory fakes for the SendGrid and
//! Twilio clients.

pub mod sendgrid;
pub mod twilio;

use crate::config::NotifyConfig;
use crate::validator::ValidatedQuote;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

pub use sendgrid::SendGridClient;
pub use twilio::TwilioClient;

/// One notification delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    BusinessSms,
    CustomerSms,
    BusinessEmail,
    CustomerEmail,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BusinessSms => "Business SMS",
            Self::CustomerSms => "Customer SMS",
            Self::BusinessEmail => "Business email",
            Self::CustomerEmail => "Customer email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outgoing email contract.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outgoing SMS contract.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub body: String,
    pub from: String,
    pub to: String,
}

/// Errors raised by a provider send.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected request: HTTP {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Email-sending capability.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> Result<(), NotifyError>;
}

/// SMS-sending capability.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, msg: SmsMessage) -> Result<(), NotifyError>;
}

/// A single channel's failure, recovered locally and reported in aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelFailure {
    #[serde(skip)]
    pub channel: Channel,
    /// User-facing label, e.g. "Business SMS failed"
    pub error: String,
    pub details: String,
}

impl ChannelFailure {
    fn new(channel: Channel, err: &NotifyError) -> Self {
        Self {
            channel,
            error: format!("{} failed", channel.label()),
            details: err.to_string(),
        }
    }
}

/// Aggregate outcome of one fan-out.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub sent: u32,
    pub failed: u32,
    pub failures: Vec<ChannelFailure>,
}

/// Raised only when no channel delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("all notification channels failed")]
    AllChannelsFailed(Vec<ChannelFailure>),
}

/// Fans an accepted quote request out to all four channels.
pub struct Dispatcher {
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    config: NotifyConfig,
}

impl Dispatcher {
    pub fn new(email: Arc<dyn EmailSender>, sms: Arc<dyn SmsSender>, config: NotifyConfig) -> Self {
        Self { email, sms, config }
    }

    /// Send all four notifications concurrently and settle their outcomes.
    ///
    /// Returns `Ok` with per-channel counts when at least one channel
    /// delivered, and [`DispatchError::AllChannelsFailed`] otherwise.
    pub async fn dispatch(&self, quote: &ValidatedQuote) -> Result<DispatchSummary, DispatchError> {
        let (business_sms, customer_sms, business_email, customer_email) = tokio::join!(
            self.sms.send(self.business_sms(quote)),
            self.sms.send(self.customer_sms(quote)),
            self.email.send(self.business_email(quote)),
            self.send_customer_email(quote),
        );

        let outcomes = [
            (Channel::BusinessSms, business_sms),
            (Channel::CustomerSms, customer_sms),
            (Channel::BusinessEmail, business_email),
            (Channel::CustomerEmail, customer_email),
        ];

        let mut failures = Vec::new();
        for (channel, outcome) in outcomes {
            if let Err(err) = outcome {
                warn!(channel = %channel, error = %err, "Notification channel failed");
                failures.push(ChannelFailure::new(channel, &err));
            }
        }

        let failed = failures.len() as u32;
        let sent = 4 - failed;

        if sent == 0 {
            error!("All notification channels failed");
            return Err(DispatchError::AllChannelsFailed(failures));
        }
        if failed > 0 {
            warn!(sent, failed, "Delivered on a subset of channels");
        }

        Ok(DispatchSummary {
            sent,
            failed,
            failures,
        })
    }

    /// Customer email is optional: a submission without an email address
    /// skips the send and the channel counts as delivered.
    async fn send_customer_email(&self, quote: &ValidatedQuote) -> Result<(), NotifyError> {
        let Some(email) = &quote.email else {
            return Ok(());
        };
        self.email.send(self.customer_email(quote, email)).await
    }

    fn business_sms(&self, quote: &ValidatedQuote) -> SmsMessage {
        SmsMessage {
            body: format!(
                "NEW QUOTE REQUEST\n\n{}\n{}\n{}\n{}\n\nReply within 2 hours!",
                quote.name, quote.phone, quote.service_type, quote.address
            ),
            from: self.config.twilio_phone_number.clone(),
            to: self.config.business_phone.clone(),
        }
    }

    fn customer_sms(&self, quote: &ValidatedQuote) -> SmsMessage {
        SmsMessage {
            body: format!(
                "Hi {}! Thanks for requesting a quote from {}. We received your request \
                 and will contact you within 2 hours. Questions? Call {}",
                quote.name, self.config.business_name, self.config.fallback_phone
            ),
            from: self.config.twilio_phone_number.clone(),
            to: quote.phone.clone(),
        }
    }

    fn business_email(&self, quote: &ValidatedQuote) -> EmailMessage {
        let email = quote.email.as_deref().unwrap_or("Not provided");
        let details = if quote.details.is_empty() {
            "None provided"
        } else {
            quote.details.as_str()
        };

        let text = format!(
            "New Quote Request Received\n\n\
             Customer Information:\n\
             - Name: {name}\n\
             - Phone: {phone}\n\
             - Email: {email}\n\
             - Service Type: {service}\n\
             - Address: {address}\n\
             - Additional Details: {details}\n\n\
             Contact the customer within 2 hours as promised.",
            name = quote.name,
            phone = quote.phone,
            email = email,
            service = quote.service_type,
            address = quote.address,
            details = details,
        );

        let html = format!(
            "<h2>New Quote Request</h2>\
             <p><strong>Contact the customer within 2 hours as promised.</strong></p>\
             <ul>\
             <li><strong>Name:</strong> {name}</li>\
             <li><strong>Phone:</strong> <a href=\"tel:{phone}\">{phone}</a></li>\
             <li><strong>Email:</strong> {email}</li>\
             <li><strong>Service Type:</strong> {service}</li>\
             <li><strong>Address:</strong> {address}</li>\
             <li><strong>Additional Details:</strong> {details}</li>\
             </ul>",
            name = quote.name,
            phone = quote.phone,
            email = email,
            service = quote.service_type,
            address = quote.address,
            details = details,
        );

        EmailMessage {
            to: self.config.business_email.clone(),
            from: self.config.sendgrid_from_email.clone(),
            subject: format!("New Quote Request from {}", quote.name),
            text,
            html,
        }
    }

    fn customer_email(&self, quote: &ValidatedQuote, to: &str) -> EmailMessage {
        let business = &self.config.business_name;
        let fallback = &self.config.fallback_phone;

        let text = format!(
            "Hi {name},\n\n\
             Thank you for requesting a quote from {business}!\n\n\
             We've received your request for {service} and will contact you within \
             2 hours to discuss your needs and provide a free estimate.\n\n\
             In the meantime, if you have any questions, feel free to call us at {fallback}.\n\n\
             Best regards,\n\
             {business} Team",
            name = quote.name,
            service = quote.service_type,
        );

        let html = format!(
            "<h1>Quote Request Received!</h1>\
             <p>Hi {name},</p>\
             <p>Thank you for requesting a quote from <strong>{business}</strong>!</p>\
             <p>We've received your request for <strong>{service}</strong> and will \
             contact you <strong>within 2 hours</strong> to discuss your needs and \
             provide a free estimate.</p>\
             <p>Questions in the meantime? Call us at {fallback}.</p>\
             <p>Best regards,<br><strong>{business} Team</strong></p>",
            name = quote.name,
            service = quote.service_type,
        );

        EmailMessage {
            to: to.to_string(),
            from: self.config.sendgrid_from_email.clone(),
            subject: format!("Quote Request Received - {business}"),
            text,
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEmail {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeEmail {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl EmailSender for FakeEmail {
        async fn send(&self, _msg: EmailMessage) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Provider {
                    status: 500,
                    body: "email down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct FakeSms {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSms {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl SmsSender for FakeSms {
        async fn send(&self, _msg: SmsMessage) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Provider {
                    status: 503,
                    body: "sms down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn quote(email: Option<&str>) -> ValidatedQuote {
        ValidatedQuote {
            name: "Jo Lee".to_string(),
            phone: "+15551234567".to_string(),
            email: email.map(str::to_string),
            service_type: "Junk Removal".to_string(),
            address: "123 Main St, City".to_string(),
            details: String::new(),
        }
    }

    fn dispatcher(email: Arc<FakeEmail>, sms: Arc<FakeSms>) -> Dispatcher {
        Dispatcher::new(email, sms, NotifyConfig::default())
    }

    #[tokio::test]
    async fn test_all_channels_succeed() {
        let email = FakeEmail::new(false);
        let sms = FakeSms::new(false);
        let summary = dispatcher(email.clone(), sms.clone())
            .dispatch(&quote(Some("jo@example.com")))
            .await
            .unwrap();

        assert_eq!(summary.sent, 4);
        assert_eq!(summary.failed, 0);
        assert!(summary.failures.is_empty());
        assert_eq!(sms.calls.load(Ordering::SeqCst), 2);
        assert_eq!(email.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_email_skips_customer_email() {
        let email = FakeEmail::new(false);
        let sms = FakeSms::new(false);
        let summary = dispatcher(email.clone(), sms.clone())
            .dispatch(&quote(None))
            .await
            .unwrap();

        // The skipped channel still counts as delivered.
        assert_eq!(summary.sent, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(email.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_is_success() {
        let email = FakeEmail::new(false);
        let sms = FakeSms::new(true);
        let summary = dispatcher(email, sms)
            .dispatch(&quote(Some("jo@example.com")))
            .await
            .unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 2);
        let labels: Vec<&str> = summary.failures.iter().map(|f| f.error.as_str()).collect();
        assert_eq!(labels, ["Business SMS failed", "Customer SMS failed"]);
    }

    #[tokio::test]
    async fn test_total_failure_is_error() {
        let email = FakeEmail::new(true);
        let sms = FakeSms::new(true);
        let result = dispatcher(email, sms)
            .dispatch(&quote(Some("jo@example.com")))
            .await;

        match result {
            Err(DispatchError::AllChannelsFailed(failures)) => {
                assert_eq!(failures.len(), 4);
            }
            Ok(summary) => panic!("expected total failure, got {summary:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_surviving_channel_is_success() {
        // Email provider down entirely, SMS up: 2 sent, 2 failed.
        let email = FakeEmail::new(true);
        let sms = FakeSms::new(false);
        let summary = dispatcher(email, sms)
            .dispatch(&quote(Some("jo@example.com")))
            .await
            .unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 2);
    }

    #[test]
    fn test_message_templates() {
        let dispatcher = dispatcher(FakeEmail::new(false), FakeSms::new(false));
        let quote = quote(Some("jo@example.com"));

        let sms = dispatcher.business_sms(&quote);
        assert!(sms.body.contains("Jo Lee"));
        assert!(sms.body.contains("+15551234567"));
        assert!(sms.body.contains("Junk Removal"));

        let email = dispatcher.business_email(&quote);
        assert_eq!(email.subject, "New Quote Request from Jo Lee");
        assert!(email.text.contains("- Additional Details: None provided"));

        let confirmation = dispatcher.customer_email(&quote, "jo@example.com");
        assert_eq!(confirmation.to, "jo@example.com");
        assert!(confirmation.text.contains("within 2 hours"));
    }
}
