//! Conversational assistant for organizers

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

use super::client::LlmClient;
use super::types::Message;

/// Maximum number of history entries passed to the assistant
pub const HISTORY_WINDOW: usize = 10;

const ASSISTANT_SYSTEM: &str = "Eres un asistente inteligente para gestionar invitaciones a través de WhatsApp.
Tu trabajo es ayudar al organizador a utilizar el sistema de gestión de invitaciones.

Información importante:
1. El organizador puede subir un archivo Excel con la lista de invitados
2. Puede usar comandos como !ayuda, !enviar, !reporte
3. El sistema procesa automáticamente las respuestas de los invitados

Responde de manera concisa y amigable. Si el usuario es nuevo, explícale brevemente cómo funciona el sistema.";

/// Free-form chat with an organizer
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Reply to `message` given the prior conversation (oldest first)
    async fn reply(&self, history: &[Message], message: &str) -> Result<String>;
}

/// Assistant backed by an LLM completion
pub struct LlmAssistant {
    client: LlmClient,
}

impl LlmAssistant {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Assistant for LlmAssistant {
    async fn reply(&self, history: &[Message], message: &str) -> Result<String> {
        info!("Chatting with assistant. Message: '{}'", message);

        let start = history.len().saturating_sub(HISTORY_WINDOW - 1);
        let request = self
            .client
            .request_builder()
            .system(ASSISTANT_SYSTEM)
            .messages(history[start..].iter().cloned())
            .message(Message::user(message))
            .temperature(0.7)
            .max_tokens(500)
            .build();

        self.client.complete(request).await
    }
}
