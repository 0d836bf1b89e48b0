//! Bot assembly from configuration

use std::net::SocketAddr;
use std::sync::Arc;

use rsvp_core::store::{self, check_tables};
use rsvp_core::{Config, LlmAssistant, LlmClient, LlmReplyClassifier};
use tracing::{info, warn};

use crate::context::BotContext;
use crate::error::Result;
use crate::router::MessageRouter;
use crate::transport;
use crate::webhook::WebhookServer;

/// RSVP bot: router plus the HTTP server around it
pub struct RsvpBot {
    router: MessageRouter,
    port: u16,
    static_dir: String,
}

impl RsvpBot {
    /// Wire storage, transport and LLM collaborators from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = store::from_config(&config.storage)?;
        let transport = transport::from_config(&config.whatsapp)?;
        Self::with_transport(config, store, transport)
    }

    /// Same as [`RsvpBot::from_config`] with caller-provided store and transport
    pub fn with_transport(
        config: &Config,
        store: Arc<dyn rsvp_core::RsvpStore>,
        transport: Arc<dyn transport::Transport>,
    ) -> Result<Self> {
        let llm = LlmClient::new(&config.llm)?;
        let classifier = Arc::new(LlmReplyClassifier::new(llm.clone()));
        let assistant = Arc::new(LlmAssistant::new(llm));

        info!(
            "RSVP bot using {} storage and {} transport",
            store.name(),
            transport.name()
        );

        let ctx = BotContext::new(store, transport, classifier, assistant, config.rsvp.clone());
        Ok(Self {
            router: MessageRouter::new(ctx),
            port: config.server.port,
            static_dir: config.server.static_dir.clone(),
        })
    }

    pub fn router(&self) -> MessageRouter {
        self.router.clone()
    }

    /// Check the storage tables and serve until the listener fails
    pub async fn start(self) -> Result<()> {
        if !check_tables(self.router.context().store.as_ref()).await {
            warn!("Storage is incomplete; some commands will fail until the tables exist");
        }

        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        WebhookServer::new(addr, self.router, &self.static_dir).start().await
    }
}
