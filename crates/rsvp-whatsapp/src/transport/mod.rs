//! Outbound WhatsApp delivery
//!
//! The bot talks to WhatsApp through one of two gateways: the Twilio REST
//! API or a local whatsapp-web.js bridge. Numbers passed to a transport are
//! bare digits; each transport adds its own decorations.

mod twilio;
mod web_bridge;

pub use twilio::TwilioClient;
pub use web_bridge::WebBridgeClient;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rsvp_core::config::{TransportKind, WhatsAppConfig};

use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &'static str;

    async fn send_text(&self, to: &str, body: &str) -> Result<()>;

    async fn send_file(&self, to: &str, path: &Path, caption: &str) -> Result<()>;

    /// Download an inbound attachment to `dest`
    async fn fetch_media(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Build the configured transport
pub fn from_config(config: &WhatsAppConfig) -> Result<Arc<dyn Transport>> {
    match config.transport {
        TransportKind::Twilio => Ok(Arc::new(TwilioClient::new(
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_phone_number,
        )?)),
        TransportKind::Web => Ok(Arc::new(WebBridgeClient::new(&config.bridge_url)?)),
    }
}
