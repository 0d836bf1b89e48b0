//! Inbound message routing
//!
//! Decides whether a sender is an organizer or a guest and dispatches the
//! message to commands, the reply classifier, spreadsheet import or the
//! assistant. Every path answers with an HTTP status and a short text.

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use rsvp_core::{
    DEFAULT_ORGANIZER_NAME, Error as CoreError, GuestMembership, Organizer, PendingReply, normalize_number,
    spreadsheet,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::commands::{self, CommandKind};
use crate::context::BotContext;
use crate::error::Result;
use crate::messages;
use crate::notifier;

/// MIME type of `.xlsx` files
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Status and short text returned to the webhook caller
pub type Outcome = (StatusCode, String);

fn outcome(status: StatusCode, text: impl Into<String>) -> Outcome {
    (status, text.into())
}

/// Attachment carried by an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    /// The bridge already saved the file at the configured staging path
    Staged,
    /// Twilio media URL that still has to be downloaded
    Remote {
        url: String,
        content_type: Option<String>,
    },
}

impl Media {
    pub fn is_spreadsheet(&self) -> bool {
        match self {
            Media::Staged => true,
            Media::Remote { url, content_type } => {
                url.to_lowercase().contains(".xlsx") || content_type.as_deref() == Some(XLSX_MIME)
            }
        }
    }
}

/// A message as delivered by either transport
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Bare digits, without transport decorations
    pub from: String,
    pub body: String,
    pub media: Option<Media>,
}

impl InboundMessage {
    pub fn new(from: &str, body: &str) -> Self {
        Self {
            from: normalize_number(from),
            body: body.trim().to_string(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }
}

/// Routes inbound messages to the organizer or guest flow
#[derive(Clone)]
pub struct MessageRouter {
    ctx: BotContext,
}

impl MessageRouter {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        if message.from.is_empty() {
            return outcome(StatusCode::BAD_REQUEST, "Remitente no proporcionado");
        }
        if message.body.is_empty() && message.media.is_none() {
            debug!("Ignoring empty message from {}", message.from);
            return outcome(StatusCode::OK, "Mensaje vacío ignorado");
        }

        info!("Message received from {}: {}", message.from, message.body);

        match self.route(&message).await {
            Ok(result) => result,
            Err(e) => {
                error!("Error handling message from {}: {}", message.from, e);
                outcome(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
            }
        }
    }

    async fn route(&self, message: &InboundMessage) -> Result<Outcome> {
        let number = message.from.as_str();
        let body = message.body.as_str();

        let is_verification = commands::parse(body).is_some_and(|c| c.entry.kind == CommandKind::Verify);
        if is_verification {
            self.run_command(number, body).await;
            return Ok(outcome(StatusCode::OK, "Comando de verificación procesado"));
        }

        let organizer = self.ctx.store.find_organizer_by_number(number).await?;
        let lower = body.to_lowercase();
        let greets_as_organizer = messages::ORGANIZER_GREETINGS.contains(&lower.as_str());

        if organizer.is_some() || greets_as_organizer {
            debug!("{} handled as organizer", number);
            self.organizer_flow(message, organizer).await
        } else {
            debug!("{} handled as guest", number);
            self.guest_flow(number, body).await
        }
    }

    async fn run_command(&self, number: &str, body: &str) -> bool {
        match commands::handle_command(&self.ctx, number, body).await {
            Some(reply) => {
                self.ctx.send(number, &reply).await;
                true
            }
            None => false,
        }
    }

    async fn organizer_flow(&self, message: &InboundMessage, organizer: Option<Organizer>) -> Result<Outcome> {
        let number = message.from.as_str();
        let body = message.body.as_str();

        let Some(organizer) = organizer else {
            let organizer = self
                .ctx
                .store
                .register_organizer(number, DEFAULT_ORGANIZER_NAME)
                .await?;
            info!("Organizer registered from greeting: {} (id {})", number, organizer.id);
            self.ctx.send(number, messages::NEW_ORGANIZER_WELCOME).await;
            return Ok(outcome(StatusCode::OK, "Bienvenida a nuevo organizador enviada"));
        };

        if messages::WELCOME_GREETINGS.contains(&body.to_lowercase().as_str()) {
            self.welcome(number, &organizer).await?;
            return Ok(outcome(StatusCode::OK, "Bienvenida enviada"));
        }

        if self.ctx.sessions.is_waiting_for_selection(number) {
            if let Ok(choice) = body.parse::<usize>() {
                let events = self.ctx.store.events_by_organizer(organizer.id).await?;
                if (1..=events.len()).contains(&choice) {
                    let event = &events[choice - 1];
                    self.ctx.sessions.set_active_event(number, event.id);
                    self.ctx.sessions.set_waiting_for_selection(number, false);
                    self.ctx.send(number, &messages::event_selected(event)).await;
                    return Ok(outcome(StatusCode::OK, "Selección de evento procesada"));
                }
            }
        }

        if body.starts_with('!') {
            self.run_command(number, body).await;
            return Ok(outcome(StatusCode::OK, "Comando procesado"));
        }

        if let Some(media) = &message.media {
            return self.handle_attachment(number, &organizer, media).await;
        }

        self.chat(number, body).await;
        Ok(outcome(StatusCode::OK, "Mensaje procesado"))
    }

    async fn welcome(&self, number: &str, organizer: &Organizer) -> Result<()> {
        self.ctx.send(number, messages::WELCOME).await;

        let events = self.ctx.store.events_by_organizer(organizer.id).await?;
        match events.as_slice() {
            [] => {}
            [only] => {
                self.ctx.sessions.set_active_event(number, only.id);
                self.ctx.send(number, &messages::working_on(only)).await;
            }
            several => {
                self.ctx.sessions.set_waiting_for_selection(number, true);
                self.ctx
                    .send(number, &messages::event_selection_prompt(several))
                    .await;
            }
        }
        Ok(())
    }

    async fn chat(&self, number: &str, body: &str) {
        let history = self.ctx.sessions.history(number);
        match self.ctx.assistant.reply(&history, body).await {
            Ok(answer) => {
                self.ctx.sessions.push_history(number, body, &answer);
                self.ctx.send(number, &answer).await;
            }
            Err(e) => {
                error!("Assistant failed for {}: {}", number, e);
                self.ctx.send(number, messages::ASSISTANT_UNAVAILABLE).await;
            }
        }
    }

    async fn handle_attachment(&self, number: &str, organizer: &Organizer, media: &Media) -> Result<Outcome> {
        let Some(event) = self.ctx.resolve_active_event(number, organizer.id).await? else {
            self.ctx.send(number, messages::NO_ACTIVE_EVENT_FOR_UPLOAD).await;
            return Ok(outcome(StatusCode::BAD_REQUEST, "Error: No hay evento activo"));
        };
        info!("Attachment received from {} for event {}", number, event.id);

        if !media.is_spreadsheet() {
            self.ctx.send(number, messages::NOT_A_SPREADSHEET).await;
            return Ok(outcome(StatusCode::BAD_REQUEST, "Formato incorrecto"));
        }

        let reply = match media {
            Media::Staged => {
                let staged = PathBuf::from(&self.ctx.settings.excel_file);
                self.import_spreadsheet(event.id, &staged).await
            }
            Media::Remote { url, .. } => {
                let download = std::env::temp_dir().join(format!("rsvp-{}.xlsx", Uuid::new_v4()));
                if let Err(e) = self.ctx.transport.fetch_media(url, &download).await {
                    error!("Could not download attachment from {}: {}", url, e);
                    self.ctx
                        .send(number, &format!("❌ Error al descargar archivo: {}", e))
                        .await;
                    return Ok(outcome(StatusCode::INTERNAL_SERVER_ERROR, "Error descargando archivo"));
                }

                let reply = self.import_spreadsheet(event.id, &download).await;
                if let Err(e) = tokio::fs::remove_file(&download).await {
                    warn!("Could not remove {}: {}", download.display(), e);
                }
                reply
            }
        };

        let text = match &reply {
            Ok(message) => format!("✅ {}", message),
            Err(message) => format!("❌ {}", message),
        };
        self.ctx.send(number, &text).await;
        Ok(outcome(StatusCode::OK, "Excel procesado"))
    }

    /// Replace the guest list of `event_id` from the sheet at `path`.
    ///
    /// Both variants carry text meant for the organizer.
    pub async fn import_spreadsheet(&self, event_id: i64, path: &Path) -> std::result::Result<String, String> {
        match spreadsheet::import_guests(self.ctx.store.as_ref(), path, event_id).await {
            Ok(count) => Ok(spreadsheet::import_success_message(count)),
            Err(CoreError::Validation(message)) => Err(message),
            Err(e) => {
                error!("Spreadsheet import failed for event {}: {}", event_id, e);
                Err(format!("Error al importar Excel: {}", e))
            }
        }
    }

    async fn guest_flow(&self, number: &str, body: &str) -> Result<Outcome> {
        let memberships = self.ctx.store.guest_memberships(number).await?;

        match memberships.len() {
            0 => {
                info!("Number not registered as a guest: {}", number);
                if body.starts_with('!') && self.run_command(number, body).await {
                    return Ok(outcome(StatusCode::OK, "Comando procesado"));
                }
                self.ctx.send(number, messages::NOT_A_GUEST).await;
                Ok(outcome(StatusCode::BAD_REQUEST, "Número no registrado"))
            }
            1 => Ok(self.record_reply(number, &memberships[0], body).await),
            _ => Ok(self.disambiguate(number, &memberships, body).await),
        }
    }

    /// Guest invited to several events: ask which one the reply is for.
    ///
    /// A reply goes straight through only when exactly one invitation is
    /// still unanswered. Otherwise it is held back with the listed event ids
    /// and the next in-range number picks the event it belongs to.
    async fn disambiguate(&self, number: &str, memberships: &[GuestMembership], body: &str) -> Outcome {
        if let Some(pending) = self.ctx.sessions.take_pending_reply(number) {
            if let Ok(choice) = body.parse::<usize>() {
                let chosen = pending
                    .event_for_choice(choice)
                    .and_then(|event_id| memberships.iter().find(|m| m.event.id == event_id));
                match chosen {
                    Some(chosen) => {
                        info!("Guest {} chose event {}", number, chosen.event.id);
                        return self.record_reply(number, chosen, &pending.text).await;
                    }
                    None => {
                        debug!("Choice {} from {} does not match a listed event", choice, number);
                        return self.prompt_for_event(number, memberships, pending.text).await;
                    }
                }
            }
        }

        let mut unanswered = memberships.iter().filter(|m| !m.guest.has_responded());
        if let (Some(only), None) = (unanswered.next(), unanswered.next()) {
            debug!("{} has one unanswered invitation, event {}", number, only.event.id);
            return self.record_reply(number, only, body).await;
        }

        self.prompt_for_event(number, memberships, body.to_string()).await
    }

    async fn prompt_for_event(&self, number: &str, memberships: &[GuestMembership], reply: String) -> Outcome {
        let events: Vec<_> = memberships.iter().map(|m| m.event.clone()).collect();
        self.ctx.sessions.set_pending_reply(
            number,
            PendingReply {
                text: reply,
                event_ids: events.iter().map(|e| e.id).collect(),
            },
        );
        self.ctx
            .send(number, &messages::guest_event_prompt(&events))
            .await;
        outcome(StatusCode::OK, "Selección de evento solicitada")
    }

    async fn record_reply(&self, number: &str, membership: &GuestMembership, reply: &str) -> Outcome {
        let guest = &membership.guest;

        let classification = match self.ctx.classifier.classify(reply).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Could not interpret reply from {}: {}", number, e);
                return outcome(StatusCode::INTERNAL_SERVER_ERROR, messages::REPLY_NOT_UNDERSTOOD);
            }
        };

        let update = classification.to_update();
        if update.is_empty() {
            debug!("Reply from {} carried no answer fields", number);
        } else if let Err(e) = self.ctx.store.update_guest_response(guest.id, &update).await {
            error!("Could not update guest {}: {}", guest.id, e);
            return outcome(StatusCode::INTERNAL_SERVER_ERROR, messages::REPLY_NOT_SAVED);
        } else {
            info!("Guest {} ({}) updated: {:?}", guest.name, number, update);
        }

        if let Err(e) = notifier::notify_if_complete(&self.ctx, &membership.event).await {
            error!("Completion check failed for event {}: {}", membership.event.id, e);
        }

        let thanks = messages::guest_thanks(&guest.name, &membership.event.name);
        // Short acknowledgements like "ok" get no reply
        if reply.chars().count() > 10 {
            self.ctx.send(number, &thanks).await;
        }
        outcome(StatusCode::OK, thanks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_normalizes_sender() {
        let message = InboundMessage::new("whatsapp:+5215512345678", "  hola ");
        assert_eq!(message.from, "5215512345678");
        assert_eq!(message.body, "hola");
        assert_eq!(message.media, None);
    }

    #[test]
    fn test_spreadsheet_detection() {
        let by_url = Media::Remote {
            url: "https://api.twilio.com/media/ME1/invitados.XLSX".to_string(),
            content_type: None,
        };
        let by_type = Media::Remote {
            url: "https://api.twilio.com/media/ME2".to_string(),
            content_type: Some(XLSX_MIME.to_string()),
        };
        let image = Media::Remote {
            url: "https://api.twilio.com/media/ME3".to_string(),
            content_type: Some("image/jpeg".to_string()),
        };

        assert!(by_url.is_spreadsheet());
        assert!(by_type.is_spreadsheet());
        assert!(!image.is_spreadsheet());
        assert!(Media::Staged.is_spreadsheet());
    }
}
