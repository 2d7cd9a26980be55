use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow};
use axum::middleware;
use axum::{Router, extract::Request, response::Response};
use http::{HeaderValue, header};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::ai::chat::Advisor;
use crate::api::state::AppState;
use crate::core::AppConfig;
use crate::core::logging::init_tracing;

async fn set_static_cache_control(request: Request, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

pub fn app(shared_state: Arc<RwLock<AppState>>) -> Router {
    let cors = CorsLayer::permissive();
    let static_dir = shared_state
        .read()
        .map(|state| state.config.static_dir.clone())
        .unwrap_or_else(|_| "./web-ui".to_string());

    Router::new()
        // API routes
        .nest("/api", routes::router())
        // Static assets including the investor dataset at
        // /data/vcs.csv
        .fallback_service(
            ServiceBuilder::new()
                .layer(middleware::from_fn(set_static_cache_control))
                .service(ServeDir::new(static_dir)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::clone(&shared_state))
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    init_tracing(&format!(
        "{}=debug,tower_http=debug,axum::rejection=trace",
        env!("CARGO_CRATE_NAME")
    ));

    let advisor = Advisor::from_config(&config)?;
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, chat replies will report a configuration error");
    }
    tracing::info!("Investor dataset: {}", advisor.dataset());

    let app_state = AppState::new(advisor, config);
    let shared_state = Arc::new(RwLock::new(app_state));
    let app = app(Arc::clone(&shared_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("Server error: {}", e))
}
