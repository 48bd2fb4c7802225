// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SendGrid email client.
//!
//! Thin wrapper over the v3 `mail/send` endpoint. No retries; a non-2xx
//! response surfaces as a [`NotifyError::Provider`] and is handled by the
//! dispatcher's per-channel failure isolation.

use super::{EmailMessage, EmailSender, NotifyError};
use async_trait::async_trait;
use tracing::debug;

const MAIL_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid-backed [`EmailSender`].
pub struct SendGridClient {
    http: reqwest::Client,
    api_key: String,
}

impl SendGridClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for SendGridClient {
    async fn send(&self, msg: EmailMessage) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": msg.to }] }],
            "from": { "email": msg.from },
            "subject": msg.subject,
            "content": [
                { "type": "text/plain", "value": msg.text },
                { "type": "text/html", "value": msg.html },
            ],
        });

        let response = self
            .http
            .post(MAIL_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %msg.to, "Email accepted by SendGrid");
        Ok(())
    }
}
