use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use tracing::warn;

use crate::config::RateLimitConfig;

pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Builds the per-IP limiter for the `/api` subtree. The window is spread
/// over the request budget so a full burst refills across the window.
pub fn ip_rate_limiter(cfg: &RateLimitConfig) -> anyhow::Result<Arc<IpRateLimiter>> {
    let burst = NonZeroU32::new(cfg.max_requests).context("rate limit max_requests must be > 0")?;
    let period = Duration::from_secs(cfg.window_secs) / cfg.max_requests;
    let quota = Quota::with_period(period)
        .context("rate limit window must be > 0")?
        .allow_burst(burst);
    Ok(Arc::new(RateLimiter::keyed(quota)))
}

pub async fn rate_limit(
    State(limiter): State<Arc<IpRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if limiter.check_key(&ip).is_err() {
        warn!(%ip, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": "Too many requests from this IP, please try again later.",
            })),
        )
            .into_response();
    }

    next.run(req).await
}

pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );
    headers.insert(
        HeaderName::from_static("x-download-options"),
        HeaderValue::from_static("noopen"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    response
}
