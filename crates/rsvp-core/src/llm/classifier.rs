//! Guest reply classification
//!
//! Turns a free-text answer to an invitation into structured fields.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{GuestResponseUpdate, Rsvp};

use super::client::LlmClient;
use super::types::Message;

/// Structured reading of a guest's reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyClassification {
    pub confirmation: Option<Rsvp>,
    pub companion: Option<Rsvp>,
    pub restrictions: Option<String>,
}

impl ReplyClassification {
    /// Only the fields the classifier populated
    pub fn to_update(&self) -> GuestResponseUpdate {
        GuestResponseUpdate {
            confirmation: self.confirmation,
            companion: self.companion,
            dietary_restrictions: self.restrictions.clone(),
        }
    }
}

/// Classifies guest replies
#[async_trait]
pub trait ReplyClassifier: Send + Sync {
    async fn classify(&self, reply: &str) -> Result<ReplyClassification>;
}

const CLASSIFIER_SYSTEM: &str = "Eres un asistente experto en interpretar respuestas a invitaciones.";

fn classifier_prompt(reply: &str) -> String {
    format!(
        r#"Analiza este mensaje de respuesta a una invitación y extrae la información solicitada.
Contexto: Es una respuesta a un mensaje que pregunta sobre:
1. Confirmación de asistencia
2. Si llevará acompañante
3. Restricciones alimenticias

Mensaje a analizar: "{reply}"

Reglas de interpretación:
- Si menciona que va con alguien (esposa, pareja, amigo, etc.), implica que confirma asistencia Y que lleva acompañante
- Si dice que va solo/sola, implica que confirma asistencia pero NO lleva acompañante
- Cualquier mención a dieta especial o alergias debe registrarse como restricción
- Si no menciona restricciones, usar null

Responde SOLO con este JSON exacto:
{{
    "confirmacion": "sí/no",
    "acompanante": "sí/no",
    "restricciones": "texto de la restricción o null si no hay"
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    confirmacion: Option<String>,
    #[serde(default)]
    acompanante: Option<String>,
    #[serde(default)]
    restricciones: Option<String>,
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Parse the model output. Tolerates code fences and prose around the object.
pub fn parse_classification(output: &str) -> Result<ReplyClassification> {
    let object = json_object_pattern()
        .find(output)
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Llm(format!("No JSON object in classifier output: {}", output)))?;

    let raw: RawClassification = serde_json::from_str(object)?;
    let restrictions = raw
        .restricciones
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("null") && !r.eq_ignore_ascii_case("ninguna"));

    Ok(ReplyClassification {
        confirmation: raw.confirmacion.as_deref().and_then(Rsvp::parse),
        companion: raw.acompanante.as_deref().and_then(Rsvp::parse),
        restrictions,
    })
}

/// Classifier backed by an LLM completion at temperature 0
pub struct LlmReplyClassifier {
    client: LlmClient,
}

impl LlmReplyClassifier {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplyClassifier for LlmReplyClassifier {
    async fn classify(&self, reply: &str) -> Result<ReplyClassification> {
        info!("Analyzing guest reply: '{}'", reply);

        let request = self
            .client
            .request_builder()
            .system(CLASSIFIER_SYSTEM)
            .message(Message::user(classifier_prompt(reply)))
            .temperature(0.0)
            .max_tokens(200)
            .build();

        let output = self.client.complete(request).await?;
        let result = parse_classification(&output);
        match &result {
            Ok(classification) => info!("Classification result: {:?}", classification),
            Err(e) => warn!("Could not parse classifier output: {}", e),
        }
        result
    }
}
