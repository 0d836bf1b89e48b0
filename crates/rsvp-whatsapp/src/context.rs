//! Shared collaborators for message handling

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rsvp_core::{
    Assistant, Event, ReplyClassifier, RsvpConfig, RsvpStore, SessionStore, VerificationRegistry,
};
use tracing::{error, info};

use crate::error::Result;
use crate::transport::Transport;

/// Everything a handler needs, cheap to clone into each request
#[derive(Clone)]
pub struct BotContext {
    pub store: Arc<dyn RsvpStore>,
    pub transport: Arc<dyn Transport>,
    pub classifier: Arc<dyn ReplyClassifier>,
    pub assistant: Arc<dyn Assistant>,
    pub sessions: SessionStore,
    pub verification: VerificationRegistry,
    pub settings: Arc<RsvpConfig>,
}

impl BotContext {
    pub fn new(
        store: Arc<dyn RsvpStore>,
        transport: Arc<dyn Transport>,
        classifier: Arc<dyn ReplyClassifier>,
        assistant: Arc<dyn Assistant>,
        settings: RsvpConfig,
    ) -> Self {
        Self {
            store,
            transport,
            classifier,
            assistant,
            sessions: SessionStore::new(),
            verification: VerificationRegistry::new(),
            settings: Arc::new(settings),
        }
    }

    /// Send a text message. Failures are logged, never propagated.
    pub async fn send(&self, to: &str, body: &str) -> bool {
        match self.transport.send_text(to, body).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send message to {} via {}: {}", to, self.transport.name(), e);
                false
            }
        }
    }

    pub async fn send_file(&self, to: &str, path: &Path, caption: &str) -> Result<()> {
        info!("Sending file {} to {}", path.display(), to);
        self.transport.send_file(to, path, caption).await
    }

    /// Event the organizer is working on.
    ///
    /// Falls back to the most recently created event and remembers it.
    pub async fn resolve_active_event(&self, number: &str, organizer_id: i64) -> Result<Option<Event>> {
        if let Some(event_id) = self.sessions.active_event(number) {
            if let Some(event) = self.store.event_by_id(event_id).await? {
                return Ok(Some(event));
            }
            self.sessions.clear_active_event(number);
        }

        let latest = self.store.latest_event(organizer_id).await?;
        if let Some(event) = &latest {
            self.sessions.set_active_event(number, event.id);
        }
        Ok(latest)
    }

    /// Export location for an event spreadsheet
    pub fn export_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.settings.export_dir).join(file_name)
    }

    pub fn is_admin(&self, number: &str) -> bool {
        self.settings
            .admin_number
            .as_deref()
            .map(rsvp_core::normalize_number)
            .is_some_and(|admin| admin == number)
    }
}
