// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Twilio SMS client.
//!
//! Posts to the Messages endpoint of the account's REST API. No retries; a
//! non-2xx response surfaces as a [`NotifyError::Provider`] and is handled
//! by the dispatcher's per-channel failure isolation.

use super::{NotifyError, SmsMessage, SmsSender};
use async_trait::async_trait;
use tracing::debug;

/// Twilio-backed [`SmsSender`].
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid,
            auth_token,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send(&self, msg: SmsMessage) -> Result<(), NotifyError> {
        let params = [
            ("Body", msg.body.as_str()),
            ("From", msg.from.as_str()),
            ("To", msg.to.as_str()),
        ];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
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

        debug!(to = %msg.to, "SMS accepted by Twilio");
        Ok(())
    }
}
