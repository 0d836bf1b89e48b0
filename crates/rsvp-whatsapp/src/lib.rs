//! rsvp-whatsapp: WhatsApp front end of the RSVP bot
//!
//! Receives messages from Twilio or the whatsapp-web.js bridge, routes them
//! through the organizer and guest flows and answers over the same
//! transport.

pub mod bot;
pub mod commands;
pub mod context;
pub mod error;
pub mod invitations;
pub mod messages;
pub mod notifier;
pub mod router;
pub mod transport;
pub mod webhook;

pub use bot::RsvpBot;
pub use context::BotContext;
pub use error::{Result, WhatsAppError};
pub use invitations::{InvitationSender, SendReport};
pub use router::{InboundMessage, Media, MessageRouter};
pub use transport::{Transport, TwilioClient, WebBridgeClient};
pub use webhook::{WebhookServer, routes};
