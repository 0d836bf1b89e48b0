//! HTTP surface: inbound webhook, bridge callbacks and the landing page

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, FromRequest, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rsvp_core::normalize_number;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::error::{Result, WhatsAppError};
use crate::messages;
use crate::router::{InboundMessage, Media, MessageRouter};

/// Webhook server state
pub struct WebhookState {
    pub router: MessageRouter,
}

/// Message posted by the whatsapp-web.js bridge
#[derive(Debug, Deserialize)]
struct BridgePayload {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "HasMedia", default)]
    has_media: bool,
}

impl From<BridgePayload> for InboundMessage {
    fn from(payload: BridgePayload) -> Self {
        let message = InboundMessage::new(&payload.from, &payload.body);
        if payload.has_media {
            message.with_media(Media::Staged)
        } else {
            message
        }
    }
}

/// Twilio webhook form fields
#[derive(Debug, Deserialize)]
struct TwilioPayload {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "MediaUrl0")]
    media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    media_content_type: Option<String>,
}

impl From<TwilioPayload> for InboundMessage {
    fn from(payload: TwilioPayload) -> Self {
        let message = InboundMessage::new(&payload.from, &payload.body);
        match payload.media_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => message.with_media(Media::Remote {
                url,
                content_type: payload.media_content_type,
            }),
            None => message,
        }
    }
}

/// Build the HTTP routes. Unmatched paths are served from `static_dir`.
pub fn routes(router: MessageRouter, static_dir: impl AsRef<Path>) -> Router {
    let state = Arc::new(WebhookState { router });

    Router::new()
        .route("/webhook", post(receive_message))
        .route("/process-excel", post(process_excel))
        .route("/generar-codigo", post(generate_code))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Webhook server
pub struct WebhookServer {
    addr: SocketAddr,
    app: Router,
}

impl WebhookServer {
    pub fn new(addr: SocketAddr, router: MessageRouter, static_dir: impl AsRef<Path>) -> Self {
        Self {
            addr,
            app: routes(router, static_dir),
        }
    }

    pub async fn start(self) -> Result<()> {
        info!("Starting RSVP webhook server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| WhatsAppError::Config(format!("cannot bind {}: {}", self.addr, e)))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| WhatsAppError::Http(e.to_string()))?;

        Ok(())
    }
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Bridge messages arrive as JSON, Twilio messages as a form
async fn receive_message(State(state): State<Arc<WebhookState>>, request: Request) -> Response {
    let message: InboundMessage = if is_json(&request) {
        match Json::<BridgePayload>::from_request(request, &()).await {
            Ok(Json(payload)) => payload.into(),
            Err(rejection) => return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response(),
        }
    } else {
        match Form::<TwilioPayload>::from_request(request, &()).await {
            Ok(Form(payload)) => payload.into(),
            Err(rejection) => return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response(),
        }
    };

    state.router.handle(message).await.into_response()
}

#[derive(Debug, Deserialize)]
struct ProcessExcelRequest {
    #[serde(default)]
    from: String,
}

fn status_body(status: StatusCode, ok: bool, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    let label = if ok { "success" } else { "error" };
    (status, Json(json!({ "status": label, "message": message.into() })))
}

/// Import the spreadsheet the bridge staged for `from`
async fn process_excel(
    State(state): State<Arc<WebhookState>>,
    Json(request): Json<ProcessExcelRequest>,
) -> (StatusCode, Json<Value>) {
    let ctx = state.router.context();
    let number = normalize_number(&request.from);
    let staged = Path::new(&ctx.settings.excel_file);

    if !staged.exists() {
        return status_body(
            StatusCode::BAD_REQUEST,
            false,
            format!("No se encontró el archivo {}", ctx.settings.excel_file),
        );
    }

    let organizer = match ctx.store.find_organizer_by_number(&number).await {
        Ok(Some(organizer)) => organizer,
        Ok(None) if ctx.is_admin(&number) => {
            match ctx
                .store
                .register_organizer(&number, rsvp_core::DEFAULT_ORGANIZER_NAME)
                .await
            {
                Ok(organizer) => organizer,
                Err(e) => {
                    error!("Could not register admin {}: {}", number, e);
                    return status_body(StatusCode::INTERNAL_SERVER_ERROR, false, e.to_string());
                }
            }
        }
        Ok(None) => {
            return status_body(
                StatusCode::FORBIDDEN,
                false,
                "Solo el organizador puede enviar archivos Excel",
            );
        }
        Err(e) => {
            error!("Organizer lookup failed for {}: {}", number, e);
            return status_body(StatusCode::INTERNAL_SERVER_ERROR, false, e.to_string());
        }
    };

    let event = match ctx.resolve_active_event(&number, organizer.id).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            return status_body(
                StatusCode::BAD_REQUEST,
                false,
                "No hay un evento activo. Crea un evento primero usando !crear",
            );
        }
        Err(e) => return status_body(StatusCode::INTERNAL_SERVER_ERROR, false, e.to_string()),
    };

    match state.router.import_spreadsheet(event.id, staged).await {
        Ok(message) => {
            ctx.send(&number, &format!("✅ {}", message)).await;
            status_body(StatusCode::OK, true, message)
        }
        Err(message) => {
            ctx.send(&number, &format!("❌ {}", message)).await;
            status_body(StatusCode::BAD_REQUEST, false, message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodeRequest {
    #[serde(default)]
    numero: String,
}

/// Generate a verification code and deliver it over WhatsApp
async fn generate_code(
    State(state): State<Arc<WebhookState>>,
    Json(request): Json<CodeRequest>,
) -> (StatusCode, Json<Value>) {
    let ctx = state.router.context();
    let number = normalize_number(&request.numero);
    info!("Generating verification code for: {}", number);

    if number.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Número de teléfono no proporcionado" })),
        );
    }

    let code = ctx.verification.generate_code(&number);
    let delivered = ctx.send(&number, &messages::verification_code(&code)).await;
    info!("Verification code delivered to {}: {}", number, delivered);

    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Código enviado correctamente" })),
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
