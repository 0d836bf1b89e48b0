//! rsvp-gateway: WhatsApp event RSVP bot
//!
//! Usage:
//!   rsvp-gateway           - Start the webhook server
//!   rsvp-gateway --cli     - Start the local chat simulator
//!   rsvp-gateway --help    - Show help

mod cli;

use rsvp_core::Config;
use rsvp_whatsapp::RsvpBot;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    Server,
    Cli,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("rsvp-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting rsvp-gateway...");
    tracing::info!(
        "LLM: {:?} ({}), storage: {:?}, transport: {:?}",
        config.llm.provider,
        config.llm.model,
        config.storage.backend,
        config.whatsapp.transport
    );

    match mode {
        RunMode::Cli => cli::run_cli(config).await,
        _ => run_server(config).await,
    }
}

fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--cli" | "-c" => return RunMode::Cli,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }
    RunMode::Server
}

fn print_help() {
    println!("rsvp-gateway - WhatsApp event RSVP bot");
    println!();
    println!("Usage:");
    println!("  rsvp-gateway           Start the webhook server");
    println!("  rsvp-gateway --cli     Start the local chat simulator");
    println!("  rsvp-gateway --help    Show this help message");
    println!("  rsvp-gateway --version Show version");
    println!();
    println!("Configuration is read from rsvp-gateway.toml when present,");
    println!("then from the environment (a .env file is loaded first).");
    println!();
    println!("Environment Variables:");
    println!("  OPENAI_API_KEY       LLM API key (or LLM_API_KEY, required)");
    println!("  LLM_PROVIDER         openai or claude (default: openai)");
    println!("  LLM_MODEL            Model name (default: gpt-3.5-turbo)");
    println!("  USE_WHATSAPP_WEB     Use the whatsapp-web.js bridge instead of Twilio");
    println!("  WHATSAPP_SERVER_URL  Bridge URL (default: http://localhost:3000)");
    println!("  TWILIO_ACCOUNT_SID   Twilio account SID");
    println!("  TWILIO_AUTH_TOKEN    Twilio auth token");
    println!("  TWILIO_PHONE_NUMBER  Twilio WhatsApp sender number");
    println!("  STORAGE_BACKEND      supabase or sqlite (default: supabase)");
    println!("  SUPABASE_URL         Supabase project URL");
    println!("  SUPABASE_KEY         Supabase API key");
    println!("  SQLITE_PATH          SQLite database file (default: data/rsvp.db)");
    println!("  PORT                 Webhook port (default: 5000)");
    println!("  ADMIN_NUMBER         Number allowed to import spreadsheets");
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let bot = RsvpBot::from_config(&config)?;

    let mut handle = tokio::spawn(async move {
        if let Err(e) = bot.start().await {
            tracing::error!("Webhook server error: {}", e);
        }
    });
    tracing::info!("Webhook server started on port {}", config.server.port);
    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
        }
        _ = &mut handle => tracing::warn!("Webhook server exited"),
    }

    handle.abort();
    tracing::info!("rsvp-gateway stopped");
    Ok(())
}
