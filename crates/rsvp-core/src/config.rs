//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `rsvp-gateway.toml` in the working directory
//! 3. Defaults
//!
//! Values in the TOML file may reference environment variables as `${VAR_NAME}`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Name of the optional configuration file
pub const CONFIG_FILE: &str = "rsvp-gateway.toml";

/// LLM provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible chat completions
    #[default]
    OpenAi,
    /// Anthropic messages API
    Claude,
}

impl LlmProvider {
    fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => LlmProvider::Claude,
            _ => LlmProvider::OpenAi,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub provider: LlmProvider,
    /// Custom endpoint; the provider's public API when unset
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::OpenAi,
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Which WhatsApp gateway carries messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Twilio WhatsApp API
    #[default]
    Twilio,
    /// Local whatsapp-web.js bridge
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub transport: TransportKind,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// Sender number, with or without the leading `+`
    pub twilio_phone_number: String,
    /// Base URL of the whatsapp-web.js bridge
    pub bridge_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Twilio,
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: default_twilio_number(),
            bridge_url: bridge_url_for_port(DEFAULT_BRIDGE_PORT),
        }
    }
}

const DEFAULT_BRIDGE_PORT: &str = "3000";

fn default_twilio_number() -> String {
    "+14155238886".to_string()
}

fn bridge_url_for_port(port: &str) -> String {
    format!("http://localhost:{}", port)
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Supabase,
    Sqlite,
}

impl StorageBackend {
    fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sqlite" => StorageBackend::Sqlite,
            _ => StorageBackend::Supabase,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub supabase_url: String,
    pub supabase_key: String,
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Supabase,
            supabase_url: String::new(),
            supabase_key: String::new(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> String {
    "data/rsvp.db".to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for the landing page
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_static_dir() -> String {
    "static".to_string()
}

/// Bot behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpConfig {
    /// Path where an uploaded guest spreadsheet is staged
    pub excel_file: String,
    /// Directory for exported spreadsheets
    pub export_dir: String,
    /// Number allowed to trigger imports without being an organizer
    pub admin_number: Option<String>,
    /// Pause between bulk invitation sends
    pub send_delay_ms: u64,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self {
            excel_file: default_excel_file(),
            export_dir: default_export_dir(),
            admin_number: None,
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

fn default_excel_file() -> String {
    "invitados.xlsx".to_string()
}

fn default_export_dir() -> String {
    ".".to_string()
}

fn default_send_delay_ms() -> u64 {
    1000
}

/// Main configuration for rsvp-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub whatsapp: WhatsAppConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub rsvp: RsvpConfig,
}

impl Config {
    /// Replace `${VAR_NAME}` with the variable's value; unknown variables
    /// expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Parse TOML content with `${VAR}` expansion, without environment overrides
    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(config))
    }

    /// Load `rsvp-gateway.toml` if present, otherwise the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(Error::Config(
                "LLM_API_KEY or OPENAI_API_KEY not set".to_string(),
            ));
        }
        Ok(())
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let whatsapp = toml.whatsapp.unwrap_or_default();
        let storage = toml.storage.unwrap_or_default();
        let server = toml.server.unwrap_or_default();
        let rsvp = toml.rsvp.unwrap_or_default();

        let transport = match whatsapp.transport.as_deref().map(str::to_lowercase).as_deref() {
            Some("web") => TransportKind::Web,
            _ => TransportKind::Twilio,
        };

        Config {
            llm: LlmConfig {
                api_key: llm.api_key.unwrap_or_default(),
                model: llm.model.unwrap_or_else(default_model),
                provider: llm
                    .provider
                    .as_deref()
                    .map(LlmProvider::from_name)
                    .unwrap_or_default(),
                base_url: llm.base_url.filter(|url| !url.is_empty()),
            },
            whatsapp: WhatsAppConfig {
                transport,
                twilio_account_sid: whatsapp.twilio_account_sid.unwrap_or_default(),
                twilio_auth_token: whatsapp.twilio_auth_token.unwrap_or_default(),
                twilio_phone_number: whatsapp
                    .twilio_phone_number
                    .unwrap_or_else(default_twilio_number),
                bridge_url: whatsapp
                    .bridge_url
                    .unwrap_or_else(|| bridge_url_for_port(DEFAULT_BRIDGE_PORT)),
            },
            storage: StorageConfig {
                backend: storage
                    .backend
                    .as_deref()
                    .map(StorageBackend::from_name)
                    .unwrap_or_default(),
                supabase_url: storage.supabase_url.unwrap_or_default(),
                supabase_key: storage.supabase_key.unwrap_or_default(),
                sqlite_path: storage.sqlite_path.unwrap_or_else(default_sqlite_path),
            },
            server: ServerConfig {
                port: server.port.unwrap_or_else(default_port),
                static_dir: server.static_dir.unwrap_or_else(default_static_dir),
            },
            rsvp: RsvpConfig {
                excel_file: rsvp.excel_file.unwrap_or_else(default_excel_file),
                export_dir: rsvp.export_dir.unwrap_or_else(default_export_dir),
                admin_number: rsvp.admin_number.filter(|n| !n.is_empty()),
                send_delay_ms: rsvp.send_delay_ms.unwrap_or_else(default_send_delay_ms),
            },
        }
    }

    /// Environment variables take precedence over file values
    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        // LLM
        if let Some(api_key) = var("LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.llm.api_key = api_key;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = var("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::from_name(&provider);
        }
        if let Some(base_url) = var("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        // WhatsApp
        if let Some(flag) = var("USE_WHATSAPP_WEB") {
            self.whatsapp.transport = if flag.eq_ignore_ascii_case("true") {
                TransportKind::Web
            } else {
                TransportKind::Twilio
            };
        }
        if let Some(port) = var("WHATSAPP_SERVER_PORT") {
            self.whatsapp.bridge_url = bridge_url_for_port(&port);
        }
        if let Some(url) = var("WHATSAPP_SERVER_URL") {
            self.whatsapp.bridge_url = url;
        }
        if let Some(sid) = var("TWILIO_ACCOUNT_SID") {
            self.whatsapp.twilio_account_sid = sid;
        }
        if let Some(token) = var("TWILIO_AUTH_TOKEN") {
            self.whatsapp.twilio_auth_token = token;
        }
        if let Some(number) = var("TWILIO_PHONE_NUMBER") {
            self.whatsapp.twilio_phone_number = number;
        }

        // Storage
        if let Some(backend) = var("STORAGE_BACKEND") {
            self.storage.backend = StorageBackend::from_name(&backend);
        }
        if let Some(url) = var("SUPABASE_URL") {
            self.storage.supabase_url = url;
        }
        if let Some(key) = var("SUPABASE_KEY") {
            self.storage.supabase_key = key;
        }
        if let Some(path) = var("SQLITE_PATH") {
            self.storage.sqlite_path = path;
        }

        // Server
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = var("STATIC_DIR") {
            self.server.static_dir = dir;
        }

        // RSVP
        if let Some(file) = var("EXCEL_FILE") {
            self.rsvp.excel_file = file;
        }
        if let Some(dir) = var("EXPORT_DIR") {
            self.rsvp.export_dir = dir;
        }
        if let Some(number) = var("ADMIN_NUMBER") {
            self.rsvp.admin_number = Some(number);
        }
        if let Some(delay) = var("SEND_DELAY_MS").and_then(|d| d.parse().ok()) {
            self.rsvp.send_delay_ms = delay;
        }
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    whatsapp: Option<TomlWhatsAppConfig>,
    storage: Option<TomlStorageConfig>,
    server: Option<TomlServerConfig>,
    rsvp: Option<TomlRsvpConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// "openai" or "claude"
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWhatsAppConfig {
    /// "twilio" or "web"
    #[serde(default)]
    transport: Option<String>,
    #[serde(default)]
    twilio_account_sid: Option<String>,
    #[serde(default)]
    twilio_auth_token: Option<String>,
    #[serde(default)]
    twilio_phone_number: Option<String>,
    #[serde(default)]
    bridge_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlStorageConfig {
    /// "supabase" or "sqlite"
    #[serde(default)]
    backend: Option<String>,
    #[serde(default)]
    supabase_url: Option<String>,
    #[serde(default)]
    supabase_key: Option<String>,
    #[serde(default)]
    sqlite_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    static_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlRsvpConfig {
    #[serde(default)]
    excel_file: Option<String>,
    #[serde(default)]
    export_dir: Option<String>,
    #[serde(default)]
    admin_number: Option<String>,
    #[serde(default)]
    send_delay_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert!(config.api_key.is_empty());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_whatsapp_config_default() {
        let config = WhatsAppConfig::default();
        assert_eq!(config.transport, TransportKind::Twilio);
        assert_eq!(config.twilio_phone_number, "+14155238886");
        assert_eq!(config.bridge_url, "http://localhost:3000");
    }

    #[test]
    fn test_server_and_rsvp_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.rsvp.excel_file, "invitados.xlsx");
        assert_eq!(config.rsvp.send_delay_ms, 1000);
        assert!(config.rsvp.admin_number.is_none());
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(LlmProvider::from_name("Claude"), LlmProvider::Claude);
        assert_eq!(LlmProvider::from_name("anthropic"), LlmProvider::Claude);
        assert_eq!(LlmProvider::from_name("openai"), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::from_name("glm"), LlmProvider::OpenAi);
        assert_eq!(StorageBackend::from_name("SQLite"), StorageBackend::Sqlite);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("RSVP_GATEWAY_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${RSVP_GATEWAY_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${RSVP_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("RSVP_GATEWAY_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_passthrough() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
        assert_eq!(Config::expand_env_vars("$5 and {x}"), "$5 and {x}");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[llm]
provider = "claude"
model = "claude-3-5-haiku-latest"
api_key = "test_key"

[whatsapp]
transport = "web"
bridge_url = "http://localhost:4000"

[storage]
backend = "sqlite"
sqlite_path = "/tmp/rsvp.db"

[server]
port = 8080
static_dir = "public"

[rsvp]
excel_file = "lista.xlsx"
admin_number = "5215550000000"
send_delay_ms = 250
"#;

        let config = Config::from_toml_str(toml_content).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Claude);
        assert_eq!(config.llm.model, "claude-3-5-haiku-latest");
        assert_eq!(config.llm.api_key, "test_key");
        assert_eq!(config.whatsapp.transport, TransportKind::Web);
        assert_eq!(config.whatsapp.bridge_url, "http://localhost:4000");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.sqlite_path, "/tmp/rsvp.db");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.static_dir, "public");
        assert_eq!(config.rsvp.excel_file, "lista.xlsx");
        assert_eq!(config.rsvp.admin_number.as_deref(), Some("5215550000000"));
        assert_eq!(config.rsvp.send_delay_ms, 250);
        assert_eq!(config.rsvp.export_dir, ".");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.whatsapp.transport, TransportKind::Twilio);
        assert_eq!(config.storage.sqlite_path, "data/rsvp.db");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[llm\nmodel = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
