//! In-process collaborators for router and HTTP tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rsvp_core::{
    Assistant, Event, Message, NewEvent, NewGuest, Organizer, ReplyClassification, ReplyClassifier,
    RsvpConfig, RsvpStore, Rsvp, SqliteStore,
};
use rsvp_whatsapp::{BotContext, MessageRouter, Transport, WhatsAppError};
use tempfile::TempDir;

/// Transport that records everything it is asked to send.
///
/// Media downloads fail unless a file was registered with
/// [`RecordingTransport::serve_media`].
#[derive(Default)]
pub struct RecordingTransport {
    texts: Mutex<Vec<(String, String)>>,
    files: Mutex<Vec<(String, PathBuf, String)>>,
    media: Mutex<Option<PathBuf>>,
    downloads: Mutex<Vec<PathBuf>>,
}

impl RecordingTransport {
    /// Answer every media download with a copy of `source`
    pub fn serve_media(&self, source: &Path) {
        *self.media.lock().unwrap() = Some(source.to_path_buf());
    }

    /// Destinations media was downloaded to
    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn texts_to(&self, number: &str) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == number)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn last_text_to(&self, number: &str) -> Option<String> {
        self.texts_to(number).pop()
    }

    pub fn files_to(&self, number: &str) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _, _)| to == number)
            .map(|(_, path, _)| path.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.texts.lock().unwrap().clear();
        self.files.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_text(&self, to: &str, body: &str) -> rsvp_whatsapp::Result<()> {
        self.texts.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }

    async fn send_file(&self, to: &str, path: &Path, caption: &str) -> rsvp_whatsapp::Result<()> {
        self.files
            .lock()
            .unwrap()
            .push((to.to_string(), path.to_path_buf(), caption.to_string()));
        Ok(())
    }

    async fn fetch_media(&self, _url: &str, dest: &Path) -> rsvp_whatsapp::Result<()> {
        let source = self.media.lock().unwrap().clone();
        let Some(source) = source else {
            return Err(WhatsAppError::Unsupported("recording"));
        };
        std::fs::copy(&source, dest)?;
        self.downloads.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }
}

/// Classifier answering from a fixed table of replies
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<HashMap<String, ReplyClassification>>,
}

impl ScriptedClassifier {
    pub fn answer(&self, reply: &str, classification: ReplyClassification) {
        self.answers
            .lock()
            .unwrap()
            .insert(reply.to_string(), classification);
    }
}

#[async_trait]
impl ReplyClassifier for ScriptedClassifier {
    async fn classify(&self, reply: &str) -> rsvp_core::Result<ReplyClassification> {
        self.answers
            .lock()
            .unwrap()
            .get(reply)
            .cloned()
            .ok_or_else(|| rsvp_core::Error::Llm(format!("unscripted reply: {}", reply)))
    }
}

/// Assistant that echoes the message and the history size it saw
pub struct EchoAssistant;

#[async_trait]
impl Assistant for EchoAssistant {
    async fn reply(&self, history: &[Message], message: &str) -> rsvp_core::Result<String> {
        Ok(format!("eco({}): {}", history.len(), message))
    }
}

pub fn attending() -> ReplyClassification {
    ReplyClassification {
        confirmation: Some(Rsvp::Yes),
        companion: None,
        restrictions: None,
    }
}

/// Everything a test needs to drive the router
pub struct Harness {
    pub router: MessageRouter,
    pub store: Arc<SqliteStore>,
    pub transport: Arc<RecordingTransport>,
    pub classifier: Arc<ScriptedClassifier>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let transport = Arc::new(RecordingTransport::default());
        let classifier = Arc::new(ScriptedClassifier::default());

        let settings = RsvpConfig {
            excel_file: dir.path().join("invitados.xlsx").display().to_string(),
            export_dir: dir.path().display().to_string(),
            admin_number: Some("+5210000000000".to_string()),
            send_delay_ms: 0,
        };
        let ctx = BotContext::new(
            store.clone(),
            transport.clone(),
            classifier.clone(),
            Arc::new(EchoAssistant),
            settings,
        );

        Self {
            router: MessageRouter::new(ctx),
            store,
            transport,
            classifier,
            dir,
        }
    }

    pub fn ctx(&self) -> &BotContext {
        self.router.context()
    }

    /// Register an organizer and mark the number as verified
    pub async fn verified_organizer(&self, number: &str) -> Organizer {
        let code = self.ctx().verification.generate_code(number);
        assert!(self.ctx().verification.verify_code(number, &code).is_verified());
        self.store.register_organizer(number, "Organizador").await.unwrap()
    }

    pub async fn event(&self, organizer: &Organizer, name: &str) -> Event {
        self.store
            .create_event(NewEvent {
                organizer_id: organizer.id,
                name: name.to_string(),
                description: String::new(),
                date: None,
            })
            .await
            .unwrap()
    }

    pub async fn guests(&self, event: &Event, guests: &[(&str, &str)]) {
        let rows = guests
            .iter()
            .map(|(name, number)| NewGuest {
                event_id: event.id,
                name: name.to_string(),
                number: number.to_string(),
                confirmation: None,
                companion: None,
                dietary_restrictions: None,
            })
            .collect();
        self.store.replace_guests(event.id, rows).await.unwrap();
    }
}
