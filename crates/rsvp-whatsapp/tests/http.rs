//! HTTP routes driven through `tower::ServiceExt::oneshot`

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use common::{Harness, attending};
use rsvp_core::{RsvpStore, spreadsheet};
use rsvp_whatsapp::{messages, routes};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    std::fs::write(h.dir.path().join("index.html"), "<h1>Registro de organizadores</h1>").unwrap();
    routes(h.router.clone(), h.dir.path())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn landing_page_is_served_from_static_dir() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Registro de organizadores"));
}

#[tokio::test]
async fn static_dir_does_not_escape_its_root() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(
            Request::builder()
                .uri("/../../etc/passwd")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn generate_code_sends_it_over_whatsapp() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(post_json("/generar-codigo", json!({"numero": "+52 1 55 0000 0001"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"success": true, "message": "Código enviado correctamente"})
    );

    let entry = h.ctx().verification.entry("5215500000001").unwrap();
    assert_eq!(
        h.transport.last_text_to("5215500000001").unwrap(),
        messages::verification_code(&entry.code)
    );
}

#[tokio::test]
async fn generate_code_requires_a_number() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(post_json("/generar-codigo", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], json!(false));
}

#[tokio::test]
async fn twilio_form_from_unknown_sender_is_rejected() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(post_form(
            "/webhook",
            "From=whatsapp%3A%2B5215599999999&Body=hola%20a%20todos",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        h.transport.last_text_to("5215599999999").unwrap(),
        messages::NOT_A_GUEST
    );
}

#[tokio::test]
async fn bridge_json_reply_updates_guest() {
    let h = Harness::new();
    let organizer = h.verified_organizer("5215500000001").await;
    let event = h.event(&organizer, "Boda").await;
    h.guests(&event, &[("Ana", "5215511111111"), ("Luis", "5215522222222")]).await;
    h.classifier.answer("Claro que sí asistiré", attending());

    let response = app(&h)
        .oneshot(post_json(
            "/webhook",
            json!({"From": "5215511111111@c.us", "Body": "Claro que sí asistiré", "HasMedia": false}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("¡Gracias Ana!"));
    let guests = h.store.guests_by_event(event.id).await.unwrap();
    assert!(guests[0].has_responded());
}

#[tokio::test]
async fn process_excel_needs_the_staged_file() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(post_json("/process-excel", json!({"from": "5215500000001@c.us"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("error"));
}

fn stage_sheet(h: &Harness, event_id: i64) {
    let guest = rsvp_core::Guest {
        id: 0,
        event_id,
        name: "Ana".to_string(),
        number: "5215511111111".to_string(),
        confirmation: None,
        companion: None,
        dietary_restrictions: None,
    };
    spreadsheet::write_guests(&[guest], std::path::Path::new(&h.ctx().settings.excel_file)).unwrap();
}

#[tokio::test]
async fn process_excel_is_forbidden_for_strangers() {
    let h = Harness::new();
    stage_sheet(&h, 1);

    let response = app(&h)
        .oneshot(post_json("/process-excel", json!({"from": "5215599999999@c.us"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn process_excel_imports_for_organizer() {
    let h = Harness::new();
    let organizer = h.verified_organizer("5215500000001").await;
    let event = h.event(&organizer, "Boda").await;
    stage_sheet(&h, event.id);

    let response = app(&h)
        .oneshot(post_json("/process-excel", json!({"from": "5215500000001@c.us"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "success", "message": spreadsheet::import_success_message(1)})
    );
    assert_eq!(h.store.guests_by_event(event.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn process_excel_admin_without_event_gets_bad_request() {
    let h = Harness::new();
    stage_sheet(&h, 1);

    let response = app(&h)
        .oneshot(post_json("/process-excel", json!({"from": "5210000000000@c.us"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    // Admin was registered on the way
    assert!(
        h.store
            .find_organizer_by_number("5210000000000")
            .await
            .unwrap()
            .is_some()
    );
}
