use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client_ip::resolve_client_ip;
use crate::error::AppError;
use crate::geo::GeoInfo;
use crate::record::VisitorRecord;
use crate::AppState;

/// Run the visitor pipeline for one request: resolve the client IP, look
/// up geolocation, assemble the record, persist it best-effort. Returns
/// the record and whether the write succeeded.
async fn run_pipeline(
    state: &AppState,
    headers: &HeaderMap,
    peer: SocketAddr,
) -> (VisitorRecord, bool) {
    let ip = resolve_client_ip(
        headers,
        Some(peer),
        state.config.platform_ip_header.as_deref(),
    );

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let geo = state.geo.lookup(&ip).await;

    let record = VisitorRecord::new(ip, user_agent, geo, referer, accept_language, Utc::now());

    // Persistence failure must never block the user-facing response.
    let saved = match state.store.save(&record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to persist visitor record {}: {e}", record.id);
            false
        }
    };

    (record, saved)
}

pub async fn index(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let (record, saved) = run_pipeline(&state, &headers, peer).await;

    let mut ctx = tera::Context::new();
    ctx.insert("visitor", &record);
    ctx.insert("saved", &saved);
    let html = state.tera.render("index.html", &ctx)?;
    Ok(Html(html))
}

#[derive(Serialize)]
pub struct VisitorInfoResponse {
    pub ip_address: String,
    pub user_agent: String,
    pub country_info: GeoInfo,
    pub timestamp: DateTime<Utc>,
}

pub async fn visitor_info(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<VisitorInfoResponse> {
    let (record, _saved) = run_pipeline(&state, &headers, peer).await;

    Json(VisitorInfoResponse {
        ip_address: record.ip_address,
        user_agent: record.user_agent,
        country_info: record.country_info,
        timestamp: record.timestamp,
    })
}
