//! Twilio API client for WhatsApp

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WhatsAppError};

use super::Transport;

const TWILIO_API: &str = "https://api.twilio.com";

/// Twilio API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    phone_number: String,
    base_url: String,
}

/// Outgoing message payload
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "Body")]
    body: &'a str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    sid: String,
}

/// `whatsapp:+<digits>` address for Twilio
fn whatsapp_address(number: &str) -> String {
    let digits = number
        .trim()
        .trim_start_matches("whatsapp:")
        .trim_start_matches('+');
    format!("whatsapp:+{}", digits)
}

impl TwilioClient {
    pub fn new(account_sid: &str, auth_token: &str, phone_number: &str) -> Result<Self> {
        if account_sid.is_empty() || auth_token.is_empty() {
            return Err(WhatsAppError::Config(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN are required for the Twilio transport"
                    .to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            phone_number: phone_number.to_string(),
            base_url: TWILIO_API.to_string(),
        })
    }

    /// Point the client at another API host
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Send a WhatsApp message, returning the message SID
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let payload = SendMessagePayload {
            from: whatsapp_address(&self.phone_number),
            to: whatsapp_address(to),
            body,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!(
                "Failed to send message: {} - {}",
                status, text
            )));
        }

        let result: SendMessageResponse = response.json().await?;
        info!("Message sent to {} using Twilio ({})", to, result.sid);
        Ok(result.sid)
    }
}

#[async_trait]
impl Transport for TwilioClient {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        self.send_message(to, body).await.map(|_| ())
    }

    /// Twilio only sends media from a public URL, which local exports lack
    async fn send_file(&self, to: &str, path: &Path, _caption: &str) -> Result<()> {
        warn!(
            "Twilio requires a public URL to send files; not sending {} to {}",
            path.display(),
            to
        );
        Err(WhatsAppError::Unsupported("twilio"))
    }

    async fn fetch_media(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(WhatsAppError::Api(format!("Media download failed: {}", status)));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        info!("File downloaded successfully to {}", dest.display());
        Ok(())
    }
}
