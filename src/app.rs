use std::net::SocketAddr;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{ip_rate_limiter, rate_limit, security_headers};
use crate::state::AppState;
use crate::{auth, wines};

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let limiter = ip_rate_limiter(&state.config.rate_limit)?;

    let api = Router::new()
        .merge(auth::router())
        .merge(wines::router())
        .route("/health", get(health))
        .layer(axum::middleware::from_fn_with_state(limiter, rate_limit));

    let cors = cors_layer(&state);

    Ok(Router::new()
        .nest("/api", api)
        .route("/", get(welcome))
        .fallback(route_not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers))
        .layer(cors)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        ))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(tower_http::cors::AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        CorsLayer::permissive()
    }
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Welcome to Wine Catalog API",
        "version": env!("CARGO_PKG_VERSION"),
        "documentation": "/api/health",
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "success": true,
        "message": "Wine Catalog API is healthy and running",
        "timestamp": timestamp,
        "data": {
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "uptime": state.uptime_secs(),
        },
    }))
}

async fn route_not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} not found", uri.path()),
        })),
    )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3001".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    // connect-info makes the client address available to the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
