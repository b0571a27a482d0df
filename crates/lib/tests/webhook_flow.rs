//! Integration tests: a fake messaging API records every outbound request while the webhook
//! server runs on a free port. The server tasks are left running when each test ends.

use axum::{extract::State, http::StatusCode, Json, Router};
use nanbot::channels::{Outbound, WhatsAppChannel, DEFAULT_HEADER_TEXT};
use nanbot::config::Config;
use nanbot::delivery::DeliveryError;
use nanbot::webhook;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

#[derive(Clone, Default)]
struct Upstream {
    bodies: Arc<Mutex<Vec<Value>>>,
    fail: Arc<AtomicBool>,
}

impl Upstream {
    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    async fn wait_for(&self, n: usize) -> Vec<Value> {
        for _ in 0..100 {
            if self.bodies.lock().unwrap().len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.bodies()
    }
}

async fn record(State(up): State<Upstream>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    up.bodies.lock().unwrap().push(body);
    if up.fail.load(Ordering::SeqCst) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "temporarily unavailable", "code": 2 } })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "messages": [{ "id": "wamid.test" }] })),
        )
    }
}

async fn start_upstream(fail: bool) -> (String, Upstream) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let up = Upstream::default();
    up.fail.store(fail, Ordering::SeqCst);
    let app = Router::new().fallback(record).with_state(up.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), up)
}

fn config_for(upstream: &str, port: u16) -> Config {
    let mut c = Config::default();
    c.server.port = port;
    c.server.bind = "127.0.0.1".to_string();
    c.whatsapp.api_token = Some("test-token".to_string());
    c.whatsapp.phone_number_id = Some("1234567890".to_string());
    c.whatsapp.api_version = Some("v21.0".to_string());
    c.whatsapp.api_base_url = upstream.to_string();
    c.whatsapp.verify_token = Some("s3cret".to_string());
    c.delivery.initial_delay_ms = 5;
    c.delivery.read_receipt_delay_ms = 5;
    c.dialogue.pacing = false;
    c
}

/// Start upstream + webhook, wait until GET / answers. Returns the webhook base URL.
async fn start_bot() -> (String, Upstream) {
    let (upstream_url, up) = start_upstream(false).await;
    let port = free_port();
    let config = config_for(&upstream_url, port);
    let config_path = std::env::temp_dir()
        .join(format!("nanbot-webhook-test-{}", uuid::Uuid::new_v4()))
        .join("config.json");
    tokio::spawn(async move {
        let _ = webhook::run_server(config, config_path).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/", base)).send().await {
            if resp.status().is_success() {
                return (base, up);
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("webhook on {} did not come up within 5s", base);
}

async fn post_event(base: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}{}", base, webhook::HOOK_PATH))
        .json(&body)
        .send()
        .await
        .expect("post webhook")
}

#[tokio::test]
async fn health_reports_running_and_configured() {
    let (base, _) = start_bot().await;
    let json: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["runtime"], "running");
    assert_eq!(json["whatsapp"], "configured");
}

#[tokio::test]
async fn verification_handshake() {
    if std::env::var("WHATSAPP_VERIFY_TOKEN").is_ok() {
        return;
    }
    let (base, _) = start_bot().await;
    let ok = reqwest::get(format!(
        "{}{}?hub.mode=subscribe&hub.verify_token=s3cret&hub.challenge=4242",
        base,
        webhook::HOOK_PATH
    ))
    .await
    .unwrap();
    assert_eq!(ok.status(), reqwest::StatusCode::OK);
    assert_eq!(ok.text().await.unwrap(), "4242");

    let denied = reqwest::get(format!(
        "{}{}?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=4242",
        base,
        webhook::HOOK_PATH
    ))
    .await
    .unwrap();
    assert_eq!(denied.status(), reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_body_is_rejected_at_the_door() {
    let (base, up) = start_bot().await;
    let resp = post_event(&base, json!({ "event": "message_created" })).await;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid request");
    assert_eq!(json["details"], "Message event without message data");

    let resp = post_event(&base, json!({ "message": {} })).await;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(up.bodies().is_empty());
}

#[tokio::test]
async fn greeting_gets_read_receipt_welcome_and_main_menu() {
    let (base, up) = start_bot().await;
    let resp = post_event(
        &base,
        json!({
            "event": "message_created",
            "message": { "id": "m1", "from": "+51900000000", "type": "text", "text": { "body": "Hola" } }
        }),
    )
    .await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let bodies = up.wait_for(4).await;
    assert_eq!(bodies.len(), 4, "{:#?}", bodies);

    assert_eq!(bodies[0]["status"], "read");
    assert_eq!(bodies[0]["message_id"], "m1");

    assert_eq!(bodies[1]["type"], "text");
    assert_eq!(bodies[1]["to"], "+51900000000");
    assert!(bodies[1]["text"]["body"]
        .as_str()
        .unwrap()
        .starts_with("*¡Bienvenido a Expresos Ñan!*"));

    assert_eq!(bodies[2]["type"], "text");
    assert!(bodies[2]["text"]["body"]
        .as_str()
        .unwrap()
        .starts_with("*Nuestros Servicios Principales:*"));

    assert_eq!(bodies[3]["type"], "interactive");
    assert_eq!(bodies[3]["interactive"]["header"]["text"], DEFAULT_HEADER_TEXT);
    let titles: Vec<&str> = bodies[3]["interactive"]["action"]["buttons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["reply"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["📋 Ver Servicios", "💡 Consejos Mudanza", "ℹ️ Información"]
    );
}

#[tokio::test]
async fn unknown_button_gets_only_the_main_menu() {
    let (base, up) = start_bot().await;
    post_event(
        &base,
        json!({
            "event": "message_created",
            "message": {
                "from": "+51900000000",
                "type": "interactive",
                "interactive": { "type": "button_reply", "button_reply": { "id": "unknown_id", "title": "?" } }
            }
        }),
    )
    .await;

    up.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let bodies = up.bodies();
    assert_eq!(bodies.len(), 1, "{:#?}", bodies);
    assert_eq!(bodies[0]["type"], "interactive");
    assert_eq!(bodies[0]["interactive"]["action"]["buttons"][0]["reply"]["id"], "services");
}

#[tokio::test]
async fn non_message_events_are_ignored() {
    let (base, up) = start_bot().await;
    let resp = post_event(&base, json!({ "event": "conversation_status_changed" })).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(up.bodies().is_empty());
}

#[tokio::test]
async fn failing_upstream_exhausts_retries_with_delivery_error() {
    let (upstream_url, up) = start_upstream(true).await;
    let config = config_for(&upstream_url, free_port());
    let channel = WhatsAppChannel::from_config(&config, DEFAULT_HEADER_TEXT);

    let err = channel
        .send_text("+51900000000", "hola")
        .await
        .expect_err("upstream always fails");
    match err {
        DeliveryError::Api {
            status,
            attempts,
            detail,
            ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(attempts, 3);
            assert_eq!(detail.and_then(|d| d.code), Some(2));
        }
        other => panic!("expected api error, got {:?}", other),
    }
    assert_eq!(up.bodies().len(), 3);
}
