//! System endpoints: health check and network configuration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::TokenDto;
use crate::app_state::AppState;
use crate::domain::DexProvider;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    network: String,
    chain_id: u64,
    cached_pools: usize,
    ws_clients: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, network and the number of cached reserves snapshots.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.pool_data.network();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            network: network.name().to_string(),
            chain_id: network.chain_id(),
            cached_pools: state.pool_data.cache().len().await,
            ws_clients: state.event_bus.receiver_count(),
        }),
    )
}

/// Provider support on the configured network.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    provider: DexProvider,
    supported: bool,
    fee_rate: Option<f64>,
    description: String,
}

/// `GET /config/providers` — List DEX providers.
#[utoipa::path(
    get,
    path = "/config/providers",
    tag = "System",
    summary = "List DEX providers",
    description = "Returns every known provider and whether it can be queried on the configured network.",
    responses(
        (status = 200, description = "Provider catalog", body = Vec<ProviderInfo>),
    )
)]
pub async fn providers_handler(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.pool_data.network();
    let providers: Vec<ProviderInfo> = DexProvider::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            provider,
            supported: network.factory(provider).is_ok(),
            fee_rate: provider.fee_rate(),
            description: match provider {
                DexProvider::UniswapV2 => "Uniswap V2 constant product (x · y = k)",
                DexProvider::SushiswapV2 => "SushiSwap, Uniswap V2 fork",
                DexProvider::UniswapV3 => "Uniswap V3 concentrated liquidity (not implemented)",
            }
            .to_string(),
        })
        .collect();
    (StatusCode::OK, Json(providers))
}

/// `GET /config/bridge-tokens` — Intermediate tokens used for two-hop routes.
#[utoipa::path(
    get,
    path = "/config/bridge-tokens",
    tag = "System",
    summary = "List bridge tokens",
    description = "Returns the tokens tried as intermediate hops, wrapped native asset first.",
    responses(
        (status = 200, description = "Bridge tokens", body = Vec<TokenDto>),
    )
)]
pub async fn bridge_tokens_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut tokens = Vec::new();
    for address in state.pool_data.network().bridge_tokens() {
        match state.pool_data.tokens().resolve(*address).await {
            Ok(token) => tokens.push(TokenDto::from(&token)),
            Err(error) => tracing::warn!(%address, %error, "bridge token metadata unavailable"),
        }
    }
    (StatusCode::OK, Json(tokens))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/providers", get(providers_handler))
        .route("/config/bridge-tokens", get(bridge_tokens_handler))
}
