use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sana::config::AppConfig;
use sana::handlers;
use sana::services::ai::openai::OpenAiProvider;
use sana::services::calendar::FreeBusyClient;
use sana::services::messaging::whatsapp::WhatsAppProvider;
use sana::services::sink::WebhookSink;
use sana::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    anyhow::ensure!(
        !config.openai_api_key.is_empty(),
        "OPENAI_API_KEY must be set"
    );
    tracing::info!("using OpenAI model {}", config.openai_model);

    let llm = OpenAiProvider::new(config.openai_api_key.clone(), config.openai_model.clone());
    let busy = FreeBusyClient::new(
        config.freebusy_url.clone(),
        config.google_calendar_id.clone(),
        config.google_access_token.clone(),
    );
    let sink = WebhookSink::new(config.make_webhook_url.clone());
    let messaging = WhatsAppProvider::new(
        config.wa_phone_number_id.clone(),
        config.wa_access_token.clone(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        llm: Box::new(llm),
        busy: Box::new(busy),
        sink: Box::new(sink),
        messaging: Box::new(messaging),
        sessions: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/availability", post(handlers::availability::availability_day))
        .route(
            "/availability-range",
            post(handlers::availability::availability_range),
        )
        .route("/book", post(handlers::availability::book))
        .route(
            "/whatsapp",
            get(handlers::webhook::verify).post(handlers::webhook::receive),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
