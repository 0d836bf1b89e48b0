//! Bulk invitation sending

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rsvp_core::spreadsheet;
use tracing::{error, info};

use crate::error::Result;
use crate::messages;
use crate::transport::Transport;

/// Outcome of one bulk send
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReport {
    pub total: usize,
    pub sent: usize,
    pub errors: Vec<String>,
}

impl SendReport {
    pub fn render(&self) -> String {
        let mut text = format!(
            "📊 Reporte de envío:\n- Total procesados: {}\n- Mensajes enviados: {}\n- Errores: {}",
            self.total,
            self.sent,
            self.errors.len()
        );
        if !self.errors.is_empty() {
            text.push_str("\n\nDetalles de errores:");
            for detail in &self.errors {
                text.push('\n');
                text.push_str(detail);
            }
        }
        text
    }
}

/// Sends the invitation to every guest of a sheet who has not answered yet
pub struct InvitationSender {
    transport: Arc<dyn Transport>,
    delay: Duration,
}

impl InvitationSender {
    pub fn new(transport: Arc<dyn Transport>, delay: Duration) -> Self {
        Self { transport, delay }
    }

    /// Send invitations for the guests listed in `sheet`.
    ///
    /// Guests with a yes/no confirmation are skipped. A failed send is
    /// recorded in the report and the loop moves on.
    pub async fn send_all(&self, sheet: &Path) -> Result<SendReport> {
        let guests = spreadsheet::read_guests(sheet, 0)?;
        let mut report = SendReport::default();

        for guest in guests.iter().filter(|g| g.confirmation.is_none()) {
            report.total += 1;
            let text = messages::invitation(&guest.name);
            match self.transport.send_text(&guest.number, &text).await {
                Ok(()) => {
                    report.sent += 1;
                    info!("Invitation sent to {} ({})", guest.name, guest.number);
                }
                Err(e) => {
                    error!("Invitation to {} ({}) failed: {}", guest.name, guest.number, e);
                    report
                        .errors
                        .push(format!("❌ Error al enviar a {} ({}): {}", guest.name, guest.number, e));
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            "Bulk send finished: {} processed, {} sent, {} errors",
            report.total,
            report.sent,
            report.errors.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rsvp_core::{Guest, Rsvp};
    use std::sync::Mutex;

    use crate::error::WhatsAppError;

    #[derive(Default)]
    struct FlakyTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn send_text(&self, to: &str, _body: &str) -> Result<()> {
            if to == "5559" {
                return Err(WhatsAppError::Api("número inválido".to_string()));
            }
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }

        async fn send_file(&self, _to: &str, _path: &Path, _caption: &str) -> Result<()> {
            Ok(())
        }

        async fn fetch_media(&self, _url: &str, _dest: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn guest(name: &str, number: &str, confirmation: Option<Rsvp>) -> Guest {
        Guest {
            id: 0,
            event_id: 1,
            name: name.to_string(),
            number: number.to_string(),
            confirmation,
            companion: None,
            dietary_restrictions: None,
        }
    }

    #[tokio::test]
    async fn test_skips_answered_guests_and_collects_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("temp_evento_1.xlsx");
        spreadsheet::write_guests(
            &[
                guest("Ana", "5551", None),
                guest("Luis", "5552", Some(Rsvp::Yes)),
                guest("Eva", "5559", None),
            ],
            &sheet,
        )
        .unwrap();

        let transport = Arc::new(FlakyTransport::default());
        let sender = InvitationSender::new(transport.clone(), Duration::ZERO);
        let report = sender.send_all(&sheet).await.unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(*transport.sent.lock().unwrap(), ["5551"]);
        assert!(report.render().contains("❌ Error al enviar a Eva (5559)"));
    }

    #[test]
    fn test_render_without_errors() {
        let report = SendReport {
            total: 3,
            sent: 3,
            errors: Vec::new(),
        };
        assert_eq!(
            report.render(),
            "📊 Reporte de envío:\n- Total procesados: 3\n- Mensajes enviados: 3\n- Errores: 0"
        );
    }
}
