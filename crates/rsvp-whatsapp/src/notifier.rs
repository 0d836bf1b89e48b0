//! Organizer notification once every guest has answered

use rsvp_core::report::event_report;
use rsvp_core::spreadsheet;
use rsvp_core::Event;
use tracing::{error, info, warn};

use crate::context::BotContext;
use crate::error::Result;
use crate::messages;

/// Notify the organizer when all guests of `event` have responded.
///
/// Returns whether the notification fired. Events without guests never fire.
pub async fn notify_if_complete(ctx: &BotContext, event: &Event) -> Result<bool> {
    let (event_name, report) = event_report(ctx.store.as_ref(), event.id).await?;
    if report.total == 0 || !report.all_responded() {
        return Ok(false);
    }

    info!(
        "All {} guests of event {} have responded, notifying organizer",
        report.total, event.id
    );

    let Some(organizer) = ctx.store.organizer_by_id(event.organizer_id).await? else {
        warn!("Organizer {} of event {} not found", event.organizer_id, event.id);
        return Ok(false);
    };

    let text = messages::all_responded(report.total, &event_name, &report.render(&event_name));
    ctx.send(&organizer.number, &text).await;

    let path = ctx.export_path(&spreadsheet::export_file_name(event.id));
    match spreadsheet::export_event(ctx.store.as_ref(), event.id, &path).await {
        Ok(path) => {
            if let Err(e) = ctx
                .send_file(&organizer.number, &path, messages::COMPLETE_EXCEL_CAPTION)
                .await
            {
                error!("Could not deliver final spreadsheet to {}: {}", organizer.number, e);
            }
        }
        Err(e) => error!("Could not export event {}: {}", event.id, e),
    }

    Ok(true)
}
