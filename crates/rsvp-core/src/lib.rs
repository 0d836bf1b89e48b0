//! rsvp-core: event RSVP domain library
//!
//! Organizers, events and guests with their storage backends, spreadsheet
//! import/export, attendance reports, the LLM reply classifier and
//! assistant, and the per-number session and verification state.

pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod report;
pub mod session;
pub mod spreadsheet;
pub mod store;

pub use config::{
    Config, LlmConfig, LlmProvider, RsvpConfig, ServerConfig, StorageBackend, StorageConfig,
    TransportKind, WhatsAppConfig,
};
pub use error::{Error, Result};
pub use llm::{Assistant, LlmAssistant, LlmClient, LlmReplyClassifier, Message, ReplyClassification, ReplyClassifier};
pub use models::{
    DEFAULT_ORGANIZER_NAME, Event, Guest, GuestMembership, GuestResponseUpdate, NewEvent, NewGuest,
    Organizer, Rsvp, normalize_number,
};
pub use report::EventReport;
pub use session::{PendingReply, SessionState, SessionStore, VerificationRegistry, VerifyOutcome};
pub use store::{RsvpStore, SqliteStore, SupabaseStore};
