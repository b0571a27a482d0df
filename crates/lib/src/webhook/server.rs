//! Webhook HTTP server: health, subscription verification, inbound message events.

use crate::channels::{WhatsAppChannel, DEFAULT_HEADER_TEXT};
use crate::config::{self, Config};
use crate::content::Catalog;
use crate::dialogue::{Dispatcher, InMemoryConversationStore};
use crate::webhook::protocol::{self, VerifyQuery, MESSAGE_CREATED};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Route receiving inbound events and verification requests.
pub const HOOK_PATH: &str = "/chatwoot-hook";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    /// Expected `hub.verify_token`; verification is refused when unset.
    pub verify_token: Option<String>,
    pub whatsapp_configured: bool,
    /// Dispatch tasks still running; drained on shutdown.
    pub in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl WebhookState {
    pub fn new(config: Config, dispatcher: Dispatcher, whatsapp_configured: bool) -> Self {
        let verify_token = config::resolve_verify_token(&config);
        Self {
            config: Arc::new(config),
            dispatcher,
            verify_token,
            whatsapp_configured,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }
}

/// Catalog, WhatsApp channel and in-memory store wired into a dispatcher.
/// `config_path` anchors a relative `dialogue.catalogPath`.
pub fn build_dispatcher(config: &Config, config_path: &Path) -> Result<(Dispatcher, bool)> {
    let catalog_path = config::resolve_catalog_path(config, config_path);
    let catalog = Catalog::load_or_builtin(catalog_path.as_deref()).with_context(|| {
        match &catalog_path {
            Some(p) => format!("loading catalog {}", p.display()),
            None => "loading builtin catalog".to_string(),
        }
    })?;
    let header = catalog
        .header
        .clone()
        .unwrap_or_else(|| DEFAULT_HEADER_TEXT.to_string());
    let channel = WhatsAppChannel::from_config(config, &header);
    let configured = channel.is_configured();
    let dispatcher = Dispatcher::new(
        Arc::new(channel),
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(catalog),
    )
    .with_pacing(config.dialogue.pacing);
    Ok((dispatcher, configured))
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(HOOK_PATH, get(verify_webhook).post(receive_webhook))
        .with_state(state)
}

/// Run the webhook server on `server.bind:server.port` until SIGINT/SIGTERM, then wait for
/// in-flight dispatches to finish.
pub async fn run_server(config: Config, config_path: PathBuf) -> Result<()> {
    let bind = config.server.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) && config::resolve_verify_token(&config).is_none() {
        log::warn!(
            "webhook bound to {} without a verify token; subscription verification will be refused (set whatsapp.verifyToken or WHATSAPP_VERIFY_TOKEN)",
            bind
        );
    }
    let (dispatcher, configured) = build_dispatcher(&config, &config_path)?;
    let port = config.server.port;
    let state = WebhookState::new(config, dispatcher, configured);
    let in_flight = state.in_flight.clone();

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook listening on {}{}", bind_addr, HOOK_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;

    let mut tasks = in_flight.lock().await;
    if !tasks.is_empty() {
        log::info!("waiting for {} in-flight conversation turn(s)", tasks.len());
    }
    while tasks.join_next().await.is_some() {}
    log::info!("webhook stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("installing Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("installing SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    let whatsapp = if state.whatsapp_configured {
        "configured"
    } else {
        "unconfigured"
    };
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
        "whatsapp": whatsapp,
    }))
}

/// GET /chatwoot-hook: echo `hub.challenge` when mode is subscribe and the token matches.
async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let subscribe = query.mode.as_deref() == Some("subscribe");
    let token_ok = match (&state.verify_token, query.verify_token.as_deref()) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };
    if subscribe && token_ok {
        log::info!("webhook subscription verified");
        (StatusCode::OK, query.challenge.unwrap_or_default()).into_response()
    } else {
        log::warn!("webhook verification refused (mode {:?})", query.mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /chatwoot-hook: validate, hand message events to the dispatcher on their own task, ack.
async fn receive_webhook(State(state): State<WebhookState>, body: Bytes) -> Response {
    let envelope = match protocol::parse_envelope(&body) {
        Ok(e) => e,
        Err(details) => {
            log::warn!("rejected webhook: {}", details);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request", "details": details })),
            )
                .into_response();
        }
    };
    let Some(message) = envelope.message.filter(|_| envelope.event == MESSAGE_CREATED) else {
        log::debug!("ignoring webhook event '{}'", envelope.event);
        return (StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response();
    };

    let dispatcher = state.dispatcher.clone();
    let mut tasks = state.in_flight.lock().await;
    while tasks.try_join_next().is_some() {}
    tasks.spawn(async move {
        dispatcher.handle(&message).await;
    });
    (StatusCode::OK, Json(json!({ "status": "received" }))).into_response()
}
