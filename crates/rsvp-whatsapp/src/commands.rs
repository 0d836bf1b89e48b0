//! Organizer `!` commands
//!
//! Every command is declared once in [`COMMANDS`] together with the
//! preconditions it needs. [`handle_command`] checks those centrally, in
//! table order, before the command body runs.

use std::time::Duration;

use rsvp_core::report::event_report;
use rsvp_core::{DEFAULT_ORGANIZER_NAME, Event, NewEvent, Organizer, VerifyOutcome, spreadsheet};
use tracing::{error, info, warn};

use crate::context::BotContext;
use crate::error::{Result, WhatsAppError};
use crate::invitations::InvitationSender;
use crate::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Reset,
    Help,
    Verify,
    Create,
    Events,
    DeleteConfirm,
    Delete,
    Report,
    Send,
    Excel,
}

/// One row of the command table
#[derive(Debug)]
pub struct CommandEntry {
    pub kind: CommandKind,
    pub keyword: &'static str,
    /// Whether text may follow the keyword
    pub takes_args: bool,
    pub requires_verification: bool,
    pub requires_organizer: bool,
    pub requires_event: bool,
    /// Prefix of the message shown when the command body fails
    pub failure: &'static str,
}

const fn entry(kind: CommandKind, keyword: &'static str, failure: &'static str) -> CommandEntry {
    CommandEntry {
        kind,
        keyword,
        takes_args: false,
        requires_verification: false,
        requires_organizer: false,
        requires_event: false,
        failure,
    }
}

/// Matched in order: `!borrar confirmar` must precede `!borrar`
pub const COMMANDS: &[CommandEntry] = &[
    entry(CommandKind::Reset, "!reset", "Error al resetear"),
    entry(CommandKind::Help, "!ayuda", "Error"),
    CommandEntry {
        takes_args: true,
        ..entry(CommandKind::Verify, "!verificar", "Error al verificar")
    },
    CommandEntry {
        takes_args: true,
        requires_verification: true,
        ..entry(CommandKind::Create, "!crear", "Error al crear evento")
    },
    CommandEntry {
        requires_verification: true,
        requires_organizer: true,
        ..entry(CommandKind::Events, "!eventos", "Error al obtener eventos")
    },
    CommandEntry {
        requires_verification: true,
        requires_organizer: true,
        ..entry(CommandKind::DeleteConfirm, "!borrar confirmar", "Error al borrar evento")
    },
    CommandEntry {
        takes_args: true,
        requires_verification: true,
        requires_organizer: true,
        ..entry(CommandKind::Delete, "!borrar", "Error al borrar evento")
    },
    CommandEntry {
        requires_event: true,
        ..entry(CommandKind::Report, "!reporte", "Error al generar reporte")
    },
    CommandEntry {
        requires_event: true,
        ..entry(CommandKind::Send, "!enviar", "Error al enviar invitaciones")
    },
    CommandEntry {
        requires_event: true,
        ..entry(CommandKind::Excel, "!excel", "Error al preparar el Excel")
    },
];

/// A recognized command and the text after its keyword
#[derive(Debug)]
pub struct ParsedCommand<'a> {
    pub entry: &'static CommandEntry,
    pub args: &'a str,
}

/// Text after `keyword` if `text` starts with it as a whole word
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Match `text` against the command table.
///
/// Keywords are case-insensitive; arguments keep their original case.
pub fn parse(text: &str) -> Option<ParsedCommand<'_>> {
    let text = text.trim();
    COMMANDS.iter().find_map(|entry| {
        let args = strip_keyword(text, entry.keyword)?;
        if !entry.takes_args && !args.is_empty() {
            return None;
        }
        Some(ParsedCommand { entry, args })
    })
}

/// Split `!crear` arguments into name and description.
///
/// `"Name" "Description"` uses the quoted parts; unquoted text is all name.
pub fn parse_event_args(args: &str) -> Option<(String, String)> {
    let text = args.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with('"') {
        let parts: Vec<&str> = text.split('"').collect();
        if parts.len() >= 3 {
            let name = parts[1].trim();
            if name.is_empty() {
                return None;
            }
            let description = if parts.len() >= 5 { parts[3].trim() } else { "" };
            return Some((name.to_string(), description.to_string()));
        }
    }

    Some((text.to_string(), String::new()))
}

/// Run an organizer command and return the reply to send.
///
/// `None` means the command already delivered its output.
pub async fn handle_command(ctx: &BotContext, number: &str, text: &str) -> Option<String> {
    info!("Processing command from {}: {}", number, text);

    let Some(command) = parse(text) else {
        cancel_pending_deletion(ctx, number);
        return Some(messages::UNKNOWN_COMMAND.to_string());
    };
    let entry = command.entry;

    if entry.requires_verification && !ctx.verification.is_verified(number) {
        info!("Rejected {} from unverified number {}", entry.keyword, number);
        return Some(messages::NOT_AUTHORIZED.to_string());
    }

    if entry.kind != CommandKind::DeleteConfirm {
        cancel_pending_deletion(ctx, number);
    }

    match run_guarded(ctx, number, &command).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Command {} failed for {}: {}", entry.keyword, number, e);
            Some(format!("❌ {}: {}", entry.failure, e))
        }
    }
}

fn cancel_pending_deletion(ctx: &BotContext, number: &str) {
    if ctx.sessions.is_confirming_deletion(number) {
        info!("Pending deletion cancelled for {}", number);
        ctx.sessions.set_confirming_deletion(number, None, None, false);
    }
}

async fn run_guarded(ctx: &BotContext, number: &str, command: &ParsedCommand<'_>) -> Result<Option<String>> {
    let entry = command.entry;
    let organizer = ctx.store.find_organizer_by_number(number).await?;

    if entry.requires_organizer && organizer.is_none() {
        return Ok(Some(messages::NOT_REGISTERED_ORGANIZER.to_string()));
    }

    let mut event = None;
    if entry.requires_event {
        let resolved = match &organizer {
            Some(organizer) => ctx.resolve_active_event(number, organizer.id).await?,
            None => None,
        };
        match resolved {
            Some(resolved) => event = Some(resolved),
            None => return Ok(Some(messages::NO_ACTIVE_EVENT.to_string())),
        }
    }

    match (entry.kind, organizer, event) {
        (CommandKind::Reset, organizer, _) => reset(ctx, number, organizer).await,
        (CommandKind::Help, _, _) => Ok(Some(messages::HELP.to_string())),
        (CommandKind::Verify, organizer, _) => verify(ctx, number, organizer, command.args).await,
        (CommandKind::Create, organizer, _) => create(ctx, number, organizer, command.args).await,
        (CommandKind::Events, Some(organizer), _) => list_events(ctx, number, &organizer).await,
        (CommandKind::DeleteConfirm, _, _) => confirm_delete(ctx, number).await,
        (CommandKind::Delete, Some(organizer), _) => request_delete(ctx, number, &organizer, command.args).await,
        (CommandKind::Report, _, Some(event)) => report(ctx, &event).await,
        (CommandKind::Send, _, Some(event)) => send_invitations(ctx, &event).await,
        (CommandKind::Excel, _, Some(event)) => send_excel(ctx, number, &event).await,
        // Guards above make the remaining combinations unreachable
        _ => Ok(Some(messages::UNKNOWN_COMMAND.to_string())),
    }
}

async fn reset(ctx: &BotContext, number: &str, organizer: Option<Organizer>) -> Result<Option<String>> {
    let Some(organizer) = organizer else {
        return Ok(Some("❌ Error al resetear: Organizador no encontrado".to_string()));
    };

    for event in ctx.store.events_by_organizer(organizer.id).await? {
        ctx.store.delete_event(event.id).await?;
    }
    ctx.store.delete_organizer(organizer.id).await?;
    ctx.sessions.clear(number);
    ctx.verification.clear(number);

    info!("Organizer {} reset", number);
    Ok(Some(messages::RESET_DONE.to_string()))
}

async fn verify(ctx: &BotContext, number: &str, organizer: Option<Organizer>, code: &str) -> Result<Option<String>> {
    info!("Processing verification for {}", number);

    let reply = match ctx.verification.verify_code(number, code) {
        VerifyOutcome::Verified => {
            if organizer.is_none() {
                info!("Registering organizer for verified number {}", number);
                ctx.store.register_organizer(number, DEFAULT_ORGANIZER_NAME).await?;
            }
            messages::VERIFIED
        }
        VerifyOutcome::Missing => messages::CODE_MISSING,
        VerifyOutcome::Expired => messages::CODE_EXPIRED,
        VerifyOutcome::Mismatch => messages::CODE_MISMATCH,
    };
    Ok(Some(reply.to_string()))
}

async fn create(ctx: &BotContext, number: &str, organizer: Option<Organizer>, args: &str) -> Result<Option<String>> {
    let Some((name, description)) = parse_event_args(args) else {
        return Ok(Some(messages::CREATE_USAGE.to_string()));
    };

    let organizer = match organizer {
        Some(organizer) => organizer,
        None => ctx.store.register_organizer(number, DEFAULT_ORGANIZER_NAME).await?,
    };

    let event = ctx
        .store
        .create_event(NewEvent {
            organizer_id: organizer.id,
            name,
            description,
            date: None,
        })
        .await?;
    ctx.sessions.set_active_event(number, event.id);

    info!("Event {} created for {}", event.id, number);
    Ok(Some(messages::event_created(&event.name)))
}

async fn list_events(ctx: &BotContext, number: &str, organizer: &Organizer) -> Result<Option<String>> {
    let events = ctx.store.events_by_organizer(organizer.id).await?;
    if events.is_empty() {
        return Ok(Some(messages::NO_EVENTS.to_string()));
    }

    ctx.sessions.set_waiting_for_selection(number, true);
    Ok(Some(messages::event_list(&events)))
}

async fn request_delete(ctx: &BotContext, number: &str, organizer: &Organizer, args: &str) -> Result<Option<String>> {
    let Ok(index) = args.parse::<usize>() else {
        return Ok(Some(messages::DELETE_USAGE.to_string()));
    };

    let events = ctx.store.events_by_organizer(organizer.id).await?;
    if events.is_empty() {
        return Ok(Some(messages::NO_EVENTS_TO_DELETE.to_string()));
    }
    if index < 1 || index > events.len() {
        return Ok(Some(messages::invalid_event_number(events.len())));
    }

    let target = &events[index - 1];
    ctx.sessions
        .set_confirming_deletion(number, Some(target.id), Some(target.name.clone()), true);
    Ok(Some(messages::confirm_deletion(&target.name)))
}

async fn confirm_delete(ctx: &BotContext, number: &str) -> Result<Option<String>> {
    let (Some(event_id), name) = ctx.sessions.event_to_delete(number) else {
        return Ok(Some(messages::DELETE_USAGE.to_string()));
    };
    ctx.sessions.set_confirming_deletion(number, None, None, false);

    ctx.store.delete_event(event_id).await?;
    if ctx.sessions.active_event(number) == Some(event_id) {
        ctx.sessions.clear_active_event(number);
    }

    info!("Event {} deleted by {}", event_id, number);
    Ok(Some(messages::event_deleted(name.as_deref().unwrap_or_default())))
}

async fn report(ctx: &BotContext, event: &Event) -> Result<Option<String>> {
    let (name, report) = event_report(ctx.store.as_ref(), event.id).await?;
    Ok(Some(format!("{}\n\n{}", report.render(&name), report.render_pending())))
}

async fn send_invitations(ctx: &BotContext, event: &Event) -> Result<Option<String>> {
    let path = ctx.export_path(&format!("temp_evento_{}.xlsx", event.id));
    spreadsheet::export_event(ctx.store.as_ref(), event.id, &path).await?;

    let sender = InvitationSender::new(
        ctx.transport.clone(),
        Duration::from_millis(ctx.settings.send_delay_ms),
    );
    let result = sender.send_all(&path).await;

    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!("Could not remove temporary sheet {}: {}", path.display(), e);
    }

    Ok(Some(result?.render()))
}

async fn send_excel(ctx: &BotContext, number: &str, event: &Event) -> Result<Option<String>> {
    let path = ctx.export_path(&spreadsheet::export_file_name(event.id));
    let path = spreadsheet::export_event(ctx.store.as_ref(), event.id, &path).await?;

    ctx.send(number, messages::EXCEL_PREPARING).await;
    match ctx.send_file(number, &path, messages::EXCEL_CAPTION).await {
        Ok(()) => {}
        Err(WhatsAppError::Unsupported(transport)) => {
            info!("{} cannot send files, keeping {} on the server", transport, path.display());
            ctx.send(number, &messages::excel_kept_on_server(&path.display().to_string()))
                .await;
        }
        Err(e) => error!("Could not send spreadsheet to {}: {}", number, e),
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> Option<CommandKind> {
        parse(text).map(|c| c.entry.kind)
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(kind("!AYUDA"), Some(CommandKind::Help));
        assert_eq!(kind("  !Eventos "), Some(CommandKind::Events));
    }

    #[test]
    fn test_arguments_keep_case() {
        let command = parse("!CREAR \"Boda de Ana\"").unwrap();
        assert_eq!(command.entry.kind, CommandKind::Create);
        assert_eq!(command.args, "\"Boda de Ana\"");
    }

    #[test]
    fn test_confirm_takes_precedence_over_delete() {
        assert_eq!(kind("!borrar confirmar"), Some(CommandKind::DeleteConfirm));
        assert_eq!(kind("!borrar 2"), Some(CommandKind::Delete));
        assert_eq!(parse("!borrar 2").unwrap().args, "2");
    }

    #[test]
    fn test_unknown_and_trailing_text() {
        assert_eq!(kind("!saludar"), None);
        assert_eq!(kind("!ayuda ya"), None);
        assert_eq!(kind("!eventosx"), None);
    }

    #[test]
    fn test_every_event_command_requires_an_event() {
        for entry in COMMANDS {
            let needs_event = matches!(
                entry.kind,
                CommandKind::Report | CommandKind::Send | CommandKind::Excel
            );
            assert_eq!(entry.requires_event, needs_event, "{}", entry.keyword);
        }
    }

    #[test]
    fn test_parse_event_args() {
        assert_eq!(
            parse_event_args("\"Boda de Juan\" \"15 de diciembre\""),
            Some(("Boda de Juan".to_string(), "15 de diciembre".to_string()))
        );
        assert_eq!(
            parse_event_args("\"Cena\""),
            Some(("Cena".to_string(), String::new()))
        );
        assert_eq!(
            parse_event_args("Fiesta sorpresa"),
            Some(("Fiesta sorpresa".to_string(), String::new()))
        );
        assert_eq!(parse_event_args("   "), None);
        assert_eq!(parse_event_args("\"\" \"x\""), None);
    }
}
