//! Error types for rsvp-whatsapp

use thiserror::Error;

/// rsvp-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("WhatsApp API error: {0}")]
    Api(String),

    #[error("Operation not supported by the {0} transport")]
    Unsupported(&'static str),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] rsvp_core::Error),
}

impl From<reqwest::Error> for WhatsAppError {
    fn from(err: reqwest::Error) -> Self {
        WhatsAppError::Http(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;
