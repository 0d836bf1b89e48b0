//! Client for the local whatsapp-web.js bridge

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{Result, WhatsAppError};

use super::Transport;

/// HTTP client for the bridge's `/send-message` and `/send-file` endpoints
#[derive(Debug, Clone)]
pub struct WebBridgeClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    number: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendFileRequest<'a> {
    number: &'a str,
    file_path: String,
    caption: &'a str,
}

/// The bridge expects digits only
fn bridge_number(number: &str) -> &str {
    number
        .trim()
        .trim_start_matches("whatsapp:")
        .trim_start_matches('+')
}

impl WebBridgeClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Bridge {} failed: {} - {}", endpoint, status, text);
            return Err(WhatsAppError::Api(format!("{}: {}", status, text)));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for WebBridgeClient {
    fn name(&self) -> &'static str {
        "whatsapp-web"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let number = bridge_number(to);
        self.post(
            "send-message",
            &SendMessageRequest {
                number,
                message: body,
            },
        )
        .await?;
        info!("Message sent to {} using WhatsApp Web JS", number);
        Ok(())
    }

    async fn send_file(&self, to: &str, path: &Path, caption: &str) -> Result<()> {
        let number = bridge_number(to);
        // The bridge runs on the same host and reads the file itself
        let absolute = std::path::absolute(path)?;
        self.post(
            "send-file",
            &SendFileRequest {
                number,
                file_path: absolute.display().to_string(),
                caption,
            },
        )
        .await?;
        info!("File sent to {} using WhatsApp Web JS", number);
        Ok(())
    }

    /// Attachments are written to disk by the bridge before the webhook fires
    async fn fetch_media(&self, _url: &str, _dest: &Path) -> Result<()> {
        Err(WhatsAppError::Unsupported("whatsapp-web"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_text_strips_prefixes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-message"))
            .and(body_json(serde_json::json!({"number": "5551", "message": "hola"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebBridgeClient::new(&server.uri()).unwrap();
        client.send_text("whatsapp:+5551", "hola").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_file_uses_camel_case_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-file"))
            .and(body_partial_json(serde_json::json!({"number": "5551", "caption": "📊"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebBridgeClient::new(&server.uri()).unwrap();
        client
            .send_file("5551", Path::new("evento_1.xlsx"), "📊")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let file_path = body["filePath"].as_str().unwrap();
        assert!(Path::new(file_path).is_absolute());
        assert!(file_path.ends_with("evento_1.xlsx"));
    }

    #[tokio::test]
    async fn test_bridge_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("client not ready"))
            .mount(&server)
            .await;

        let client = WebBridgeClient::new(&server.uri()).unwrap();
        let err = client.send_text("5551", "hola").await.unwrap_err();
        assert!(matches!(err, WhatsAppError::Api(_)));
    }
}
