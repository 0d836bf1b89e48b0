//! Attendance summaries for an event

use crate::error::{Error, Result};
use crate::models::{Guest, Rsvp};
use crate::store::RsvpStore;

/// Response counts for one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventReport {
    pub total: usize,
    pub confirmed: usize,
    pub declined: usize,
    pub pending: usize,
    /// Names of guests without a confirmation, in guest order
    pub pending_names: Vec<String>,
}

impl EventReport {
    pub fn from_guests(guests: &[Guest]) -> Self {
        let mut report = EventReport {
            total: guests.len(),
            ..Default::default()
        };
        for guest in guests {
            match guest.confirmation {
                Some(Rsvp::Yes) => report.confirmed += 1,
                Some(Rsvp::No) => report.declined += 1,
                None => {
                    report.pending += 1;
                    report.pending_names.push(guest.name.clone());
                }
            }
        }
        report
    }

    pub fn responded(&self) -> usize {
        self.total - self.pending
    }

    /// True when nobody is pending. Vacuously true for an empty guest list.
    pub fn all_responded(&self) -> bool {
        self.pending == 0
    }

    /// Summary sent to the organizer
    pub fn render(&self, event_name: &str) -> String {
        format!(
            "📊 Reporte de \"{}\":\n- Total invitados: {}\n- Confirmados: {}\n- Rechazados: {}\n- Pendientes: {}",
            event_name, self.total, self.confirmed, self.declined, self.pending
        )
    }

    /// Numbered list of guests still pending
    pub fn render_pending(&self) -> String {
        if self.all_responded() {
            return "✅ Todos los invitados han respondido".to_string();
        }

        let mut message = format!(
            "📝 Invitados pendientes ({}/{}):\n",
            self.pending, self.total
        );
        for (i, name) in self.pending_names.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, name));
        }
        message
    }
}

/// Load the event and its guests and build the report
pub async fn event_report(store: &dyn RsvpStore, event_id: i64) -> Result<(String, EventReport)> {
    let event = store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| Error::Validation("Error al obtener datos del evento".to_string()))?;
    let guests = store.guests_by_event(event_id).await?;
    Ok((event.name, EventReport::from_guests(&guests)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(name: &str, confirmation: Option<Rsvp>) -> Guest {
        Guest {
            id: 0,
            event_id: 1,
            name: name.to_string(),
            number: "5551".to_string(),
            confirmation,
            companion: None,
            dietary_restrictions: None,
        }
    }

    #[test]
    fn test_counts_and_pending_names() {
        let report = EventReport::from_guests(&[
            guest("Ana", Some(Rsvp::Yes)),
            guest("Luis", Some(Rsvp::No)),
            guest("Eva", None),
            guest("Sol", Some(Rsvp::Yes)),
        ]);

        assert_eq!(report.total, 4);
        assert_eq!(report.confirmed, 2);
        assert_eq!(report.declined, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.responded(), 3);
        assert_eq!(report.pending_names, ["Eva"]);
        assert!(!report.all_responded());
    }

    #[test]
    fn test_render() {
        let report = EventReport::from_guests(&[guest("Ana", Some(Rsvp::Yes)), guest("Eva", None)]);
        assert_eq!(
            report.render("Boda"),
            "📊 Reporte de \"Boda\":\n- Total invitados: 2\n- Confirmados: 1\n- Rechazados: 0\n- Pendientes: 1"
        );
        assert_eq!(report.render_pending(), "📝 Invitados pendientes (1/2):\n1. Eva\n");
    }

    #[test]
    fn test_empty_event_counts_as_complete() {
        let report = EventReport::from_guests(&[]);
        assert!(report.all_responded());
        assert_eq!(report.total, 0);
    }
}
