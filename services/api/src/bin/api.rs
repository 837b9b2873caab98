//! services/api/src/bin/api.rs

use api_lib::{
    adapters::chat_llm::OpenAiChatAdapter,
    config::Config,
    error::ApiError,
    web::{
        create_session_handler, get_range_handler, get_snapshot_handler, rest::ApiDoc,
        search_document_handler, state::AppState, ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Chat Adapter ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let chat_adapter = Arc::new(OpenAiChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), chat_adapter));

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{session_id}/snapshot", get(get_snapshot_handler))
        .route("/sessions/{session_id}/search", get(search_document_handler))
        .route("/sessions/{session_id}/range", get(get_range_handler))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
