//! Local chat simulator
//!
//! Runs the message router in a REPL. Every line is delivered as if it came
//! from the current sender; outbound WhatsApp messages are printed instead of
//! sent.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings, MenuBuilder,
    Prompt, PromptEditMode, PromptHistorySearch, Reedline, ReedlineEvent, ReedlineMenu, Signal, Span,
    Suggestion,
};
use rsvp_core::{Config, normalize_number, store};
use rsvp_whatsapp::{InboundMessage, Media, MessageRouter, RsvpBot, Transport, WhatsAppError};
use tracing::info;

/// Simulator commands, then the bot commands worth completing
const COMMANDS: &[(&str, &str)] = &[
    ("/from", "Cambiar el número remitente: /from 5215512345678"),
    ("/codigo", "Generar un código de verificación para el remitente"),
    ("/adjunto", "Enviar el Excel preparado como adjunto"),
    ("/estado", "Mostrar la sesión del remitente"),
    ("/help", "Mostrar esta ayuda"),
    ("/exit", "Salir"),
    ("!ayuda", "Comandos del bot"),
    ("!verificar", "Verificar un código"),
    ("!crear", "Crear un evento"),
    ("!eventos", "Listar eventos"),
    ("!borrar", "Borrar un evento"),
    ("!enviar", "Enviar invitaciones"),
    ("!reporte", "Reporte del evento activo"),
    ("!excel", "Excel actualizado"),
];

const DEFAULT_SENDER: &str = "5210000000000";

/// Transport that prints outbound messages to the terminal
struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send_text(&self, to: &str, body: &str) -> rsvp_whatsapp::Result<()> {
        println!("{}", Color::Green.bold().paint(format!("📤 → {}", to)));
        println!("{}\n", body);
        Ok(())
    }

    async fn send_file(&self, to: &str, path: &Path, caption: &str) -> rsvp_whatsapp::Result<()> {
        println!(
            "{}",
            Color::Green.bold().paint(format!("📎 → {}: {}", to, path.display()))
        );
        println!("{}\n", caption);
        Ok(())
    }

    async fn fetch_media(&self, _url: &str, _dest: &Path) -> rsvp_whatsapp::Result<()> {
        Err(WhatsAppError::Unsupported("console"))
    }
}

#[derive(Clone)]
struct CommandCompleter;

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') && !line.starts_with('!') {
            return Vec::new();
        }

        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt showing the current sender
struct SenderPrompt {
    sender: String,
}

impl Prompt for SenderPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(Color::Cyan.bold().paint(format!("{} > ", self.sender)).to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(&self, _history_search: PromptHistorySearch) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

fn keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

/// What the REPL should do after a simulator command
enum Action {
    Continue,
    Exit,
    Deliver(InboundMessage),
}

/// Run the simulator against the configured store and LLM
pub async fn run_cli(config: Config) -> anyhow::Result<()> {
    let store = store::from_config(&config.storage)?;
    let bot = RsvpBot::with_transport(&config, store, Arc::new(ConsoleTransport))?;
    let router = bot.router();

    let sender = config
        .rsvp
        .admin_number
        .as_deref()
        .map(normalize_number)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_SENDER.to_string());
    info!("Starting chat simulator as {}", sender);

    print_welcome();

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(60))
            .with_only_buffer_difference(false),
    );
    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(DefaultHinter::default().with_style(Style::new().dimmed())))
        .with_edit_mode(Box::new(Emacs::new(keybindings())));

    let mut prompt = SenderPrompt { sender };

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match simulator_command(&router, &mut prompt.sender, input).await {
                    Action::Continue => {}
                    Action::Exit => break,
                    Action::Deliver(message) => {
                        let (status, text) = router.handle(message).await;
                        let style = if status.is_success() { Color::DarkGray } else { Color::Red };
                        println!("{}\n", style.paint(format!("[{}] {}", status.as_u16(), text)));
                    }
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
            }
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("\n❌ Error: {}\n", err);
                break;
            }
        }
    }

    println!("\n👋 ¡Hasta luego!\n");
    Ok(())
}

async fn simulator_command(router: &MessageRouter, sender: &mut String, input: &str) -> Action {
    if !input.starts_with('/') {
        return Action::Deliver(InboundMessage::new(sender, input));
    }

    let (command, arg) = input.split_once(' ').unwrap_or((input, ""));
    let ctx = router.context();

    match command.to_lowercase().as_str() {
        "/exit" | "/quit" | "/q" => return Action::Exit,
        "/help" | "/?" => print_help(),
        "/from" => {
            let number = normalize_number(arg);
            if number.is_empty() {
                eprintln!("\nUso: /from 5215512345678\n");
            } else {
                println!("\n✅ Ahora escribes como {}\n", number);
                *sender = number;
            }
        }
        "/codigo" => {
            let code = ctx.verification.generate_code(sender);
            ctx.send(sender, &rsvp_whatsapp::messages::verification_code(&code))
                .await;
        }
        "/adjunto" => {
            return Action::Deliver(InboundMessage::new(sender, "").with_media(Media::Staged));
        }
        "/estado" => {
            let state = ctx.sessions.get(sender);
            println!();
            println!("  Evento activo: {:?}", state.active_event);
            println!("  Esperando selección: {}", state.awaiting_selection);
            println!("  Borrado pendiente: {:?}", state.pending_deletion);
            println!("  Verificado: {}", ctx.verification.is_verified(sender));
            println!("  Historial: {} mensajes", state.history.len());
            println!();
        }
        _ => eprintln!("\n❓ Comando desconocido: {}. Usa /help.\n", input),
    }
    Action::Continue
}

fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          📨 rsvp-gateway - simulador de WhatsApp           ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Escribe mensajes como si fueras el remitente actual       ║");
    println!("║  Comandos: /from, /codigo, /adjunto, /estado, /exit        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_help() {
    println!();
    println!("📖 Comandos del simulador:");
    for (cmd, desc) in COMMANDS.iter().filter(|(cmd, _)| cmd.starts_with('/')) {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("💡 Los mensajes que empiezan con ! se entregan al bot como comandos");
    println!();
}
