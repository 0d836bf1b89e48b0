//! Domain types: organizers, events, guests
//!
//! Field names are English; the serde renames match the column names of the
//! `organizadores`, `eventos` and `invitados` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A yes/no answer. "Unset" is modelled as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rsvp {
    Yes,
    No,
}

impl Rsvp {
    /// Normalize free text into an answer, case-insensitively.
    ///
    /// Anything that is not a recognizable yes or no is treated as unset.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sí" | "si" | "yes" | "y" => Some(Rsvp::Yes),
            "no" | "n" => Some(Rsvp::No),
            _ => None,
        }
    }

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Rsvp::Yes => "Sí",
            Rsvp::No => "No",
        }
    }
}

impl std::fmt::Display for Rsvp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Rsvp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Lenient deserializer for `Option<Rsvp>` columns: null, blank or
/// unrecognized text all map to `None`.
fn deserialize_rsvp<'de, D>(deserializer: D) -> Result<Option<Rsvp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Rsvp::parse))
}

/// Lenient timestamp deserializer: accepts RFC 3339 and naive timestamps
/// (interpreted as UTC); anything else maps to `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Strip transport decorations from a phone number.
///
/// `whatsapp:+5215512345678`, `5215512345678@c.us` and `+52 155 1234 5678`
/// all become `5215512345678`.
pub fn normalize_number(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("whatsapp:")
        .trim_end_matches("@c.us")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+' && *c != '-')
        .collect()
}

/// Event organizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organizer {
    pub id: i64,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "fecha_registro", default, deserialize_with = "deserialize_timestamp")]
    pub registered_at: Option<DateTime<Utc>>,
}

/// Default display name for auto-registered organizers
pub const DEFAULT_ORGANIZER_NAME: &str = "Organizador";

/// An event owned by an organizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "organizador_id")]
    pub organizer_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
    #[serde(rename = "fecha_creacion", default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Date label used in event listings
    pub fn date_label(&self) -> &str {
        self.date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("Sin fecha definida")
    }
}

/// Payload for creating an event
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    #[serde(rename = "organizador_id")]
    pub organizer_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "fecha", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A guest row, scoped to exactly one event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guest {
    pub id: i64,
    #[serde(rename = "evento_id")]
    pub event_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "confirmacion", default, deserialize_with = "deserialize_rsvp")]
    pub confirmation: Option<Rsvp>,
    #[serde(rename = "acompanante", default, deserialize_with = "deserialize_rsvp")]
    pub companion: Option<Rsvp>,
    #[serde(rename = "restricciones_alimenticias", default)]
    pub dietary_restrictions: Option<String>,
}

impl Guest {
    /// A guest has responded once a confirmation is recorded
    pub fn has_responded(&self) -> bool {
        self.confirmation.is_some()
    }
}

/// Guest row as read from a spreadsheet, before it has an id
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewGuest {
    #[serde(rename = "evento_id")]
    pub event_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "confirmacion")]
    pub confirmation: Option<Rsvp>,
    #[serde(rename = "acompanante")]
    pub companion: Option<Rsvp>,
    #[serde(rename = "restricciones_alimenticias")]
    pub dietary_restrictions: Option<String>,
}

/// Partial update of a guest's answer; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GuestResponseUpdate {
    #[serde(rename = "confirmacion", skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Rsvp>,
    #[serde(rename = "acompanante", skip_serializing_if = "Option::is_none")]
    pub companion: Option<Rsvp>,
    #[serde(rename = "restricciones_alimenticias", skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<String>,
}

impl GuestResponseUpdate {
    pub fn is_empty(&self) -> bool {
        self.confirmation.is_none() && self.companion.is_none() && self.dietary_restrictions.is_none()
    }
}

/// A guest row joined with the event it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct GuestMembership {
    pub guest: Guest,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsvp_parse_normalizes_case() {
        assert_eq!(Rsvp::parse("SÍ"), Some(Rsvp::Yes));
        assert_eq!(Rsvp::parse(" si "), Some(Rsvp::Yes));
        assert_eq!(Rsvp::parse("No"), Some(Rsvp::No));
        assert_eq!(Rsvp::parse(""), None);
        assert_eq!(Rsvp::parse("quizás"), None);
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("whatsapp:+5215512345678"), "5215512345678");
        assert_eq!(normalize_number("5215512345678@c.us"), "5215512345678");
        assert_eq!(normalize_number(" +52 155 1234-5678 "), "5215512345678");
    }

    #[test]
    fn test_guest_deserializes_blank_confirmation_as_unset() {
        let json = r#"{
            "id": 1, "evento_id": 2, "nombre": "Ana", "numero": "5551",
            "confirmacion": "", "acompanante": "sí", "restricciones_alimenticias": null
        }"#;
        let guest: Guest = serde_json::from_str(json).unwrap();
        assert_eq!(guest.confirmation, None);
        assert_eq!(guest.companion, Some(Rsvp::Yes));
        assert!(!guest.has_responded());
    }

    #[test]
    fn test_event_accepts_naive_creation_timestamp() {
        let json = r#"{
            "id": 7, "organizador_id": 1, "nombre": "Boda",
            "descripcion": "", "fecha": null, "fecha_creacion": "2024-05-01T18:30:00.123456"
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.created_at.is_some());
        assert_eq!(event.date_label(), "Sin fecha definida");
    }

    #[test]
    fn test_partial_update_skips_unset_fields() {
        let update = GuestResponseUpdate {
            confirmation: Some(Rsvp::No),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"confirmacion": "No"}));
    }
}
