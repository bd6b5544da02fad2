//! Pool handlers: reserves, pool data, batch lookup, price impact, cache.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BatchPoolsRequest, BatchPoolsResponse, CacheClearedResponse, PairFailureDto,
    PoolDataResponse, PoolReservesResponse, PriceImpactRequest, PriceImpactResponse,
    ProviderQuery,
};
use crate::app_state::AppState;
use crate::domain::parse_address;
use crate::error::{ErrorResponse, RouterError};

/// Upper bound on pairs accepted by one batch request.
const MAX_BATCH_PAIRS: usize = 100;

/// `GET /pools/{token_a}/{token_b}/reserves` — Raw reserves of a pair.
///
/// # Errors
///
/// Returns [`RouterError::PairNotFound`] if the provider has no pair, or
/// an address/provider/chain error.
#[utoipa::path(
    get,
    path = "/api/v1/pools/{token_a}/{token_b}/reserves",
    tag = "Pools",
    summary = "Get pair reserves",
    description = "Returns the raw reserves of the pair in request order. Served from cache while younger than the reserves TTL.",
    params(
        ("token_a" = String, Path, description = "First token address"),
        ("token_b" = String, Path, description = "Second token address"),
        ProviderQuery,
    ),
    responses(
        (status = 200, description = "Reserves snapshot", body = PoolReservesResponse),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 404, description = "Pair not found", body = ErrorResponse),
        (status = 422, description = "Unsupported provider", body = ErrorResponse),
    )
)]
pub async fn get_reserves(
    State(state): State<AppState>,
    Path((token_a, token_b)): Path<(String, String)>,
    Query(query): Query<ProviderQuery>,
) -> Result<impl IntoResponse, RouterError> {
    let reserves = state
        .pool_data
        .get_pool_reserves(
            parse_address(&token_a)?,
            parse_address(&token_b)?,
            query.provider(),
        )
        .await?;
    Ok(Json(PoolReservesResponse::from(&reserves)))
}

/// `GET /pools/{token_a}/{token_b}` — Pool view with analytics.
///
/// # Errors
///
/// Same as [`get_reserves`], plus token metadata read failures.
#[utoipa::path(
    get,
    path = "/api/v1/pools/{token_a}/{token_b}",
    tag = "Pools",
    summary = "Get pool data",
    description = "Returns token metadata, reserves, fee rate, liquidity metric and recommended slippage of the pair.",
    params(
        ("token_a" = String, Path, description = "First token address"),
        ("token_b" = String, Path, description = "Second token address"),
        ProviderQuery,
    ),
    responses(
        (status = 200, description = "Pool data", body = PoolDataResponse),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 404, description = "Pair not found", body = ErrorResponse),
        (status = 422, description = "Unsupported provider", body = ErrorResponse),
    )
)]
pub async fn get_pool(
    State(state): State<AppState>,
    Path((token_a, token_b)): Path<(String, String)>,
    Query(query): Query<ProviderQuery>,
) -> Result<impl IntoResponse, RouterError> {
    let pool = state
        .pool_data
        .get_pool_data(
            parse_address(&token_a)?,
            parse_address(&token_b)?,
            query.provider(),
        )
        .await?;
    let slippage = state.pool_data.get_recommended_slippage(&pool);
    Ok(Json(PoolDataResponse::new(&pool, slippage)))
}

/// `POST /pools/batch` — Look up many pairs at once.
///
/// # Errors
///
/// Returns [`RouterError::InvalidRequest`] for an empty or oversized batch
/// and [`RouterError::InvalidAddress`] for malformed addresses. Per-pair
/// lookup failures are reported in the response body instead.
#[utoipa::path(
    post,
    path = "/api/v1/pools/batch",
    tag = "Pools",
    summary = "Batch pool lookup",
    description = "Fetches pool data for up to 100 pairs. Pairs are fetched concurrently in small batches; failing pairs are listed under `failures` without failing the request.",
    request_body = BatchPoolsRequest,
    responses(
        (status = 200, description = "Pools and per-pair failures", body = BatchPoolsResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn batch_pools(
    State(state): State<AppState>,
    Json(req): Json<BatchPoolsRequest>,
) -> Result<impl IntoResponse, RouterError> {
    if req.pairs.is_empty() || req.pairs.len() > MAX_BATCH_PAIRS {
        return Err(RouterError::InvalidRequest(format!(
            "pairs must contain between 1 and {MAX_BATCH_PAIRS} entries"
        )));
    }
    let pairs = req
        .pairs
        .iter()
        .map(|p| p.to_request())
        .collect::<Result<Vec<_>, _>>()?;

    let batch = state.pool_data.get_multiple_pools(&pairs).await;
    let mut pools: Vec<PoolDataResponse> = batch
        .pools
        .values()
        .map(|pool| PoolDataResponse::new(pool, state.pool_data.get_recommended_slippage(pool)))
        .collect();
    pools.sort_by(|a, b| a.pair_address.cmp(&b.pair_address));

    Ok(Json(BatchPoolsResponse {
        pools,
        failures: batch.failures.iter().map(PairFailureDto::from).collect(),
    }))
}

/// `POST /price-impact` — Price impact, expected output and optimal size.
///
/// # Errors
///
/// Returns a validation error for a bad amount or ceiling, or any error
/// of the pool lookup.
#[utoipa::path(
    post,
    path = "/api/v1/price-impact",
    tag = "Pools",
    summary = "Price impact analysis",
    description = "Computes the curve price impact and fee-adjusted output of selling `amount_in`. With `max_price_impact` set, also returns the largest amount whose impact stays within it.",
    request_body = PriceImpactRequest,
    responses(
        (status = 200, description = "Impact analysis", body = PriceImpactResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Pair not found", body = ErrorResponse),
    )
)]
pub async fn price_impact(
    State(state): State<AppState>,
    Json(req): Json<PriceImpactRequest>,
) -> Result<impl IntoResponse, RouterError> {
    if !req.amount_in.is_finite() || req.amount_in < 0.0 {
        return Err(RouterError::InvalidRequest(format!(
            "amount_in must be a non-negative number, got {}",
            req.amount_in
        )));
    }
    if let Some(ceiling) = req.max_price_impact
        && (!ceiling.is_finite() || ceiling <= 0.0 || ceiling > 100.0)
    {
        return Err(RouterError::InvalidRequest(format!(
            "max_price_impact must be in (0, 100], got {ceiling}"
        )));
    }

    let token_in = parse_address(&req.token_in)?;
    let token_out = parse_address(&req.token_out)?;
    let service = &state.pool_data;
    let pool = service
        .get_pool_data(token_in, token_out, req.provider.unwrap_or_default())
        .await?;

    let impact = service.calculate_price_impact(&pool, req.amount_in, token_in)?;
    let expected_output = service.expected_output(&pool, req.amount_in, token_in)?;
    let optimal_trade_size = req
        .max_price_impact
        .map(|ceiling| {
            service.calculate_optimal_trade_size(&pool, req.amount_in, token_in, ceiling)
        })
        .transpose()?;

    Ok(Json(PriceImpactResponse {
        pair_address: pool.pair_address().to_string(),
        amount_in: req.amount_in,
        price_impact: impact,
        expected_output,
        optimal_trade_size,
        recommended_slippage: service.get_recommended_slippage(&pool),
    }))
}

/// `DELETE /cache` — Evict all cached reserves and pool data.
#[utoipa::path(
    delete,
    path = "/api/v1/cache",
    tag = "Pools",
    summary = "Clear the pool cache",
    description = "Evicts every cached reserves snapshot and pool view and broadcasts a `pool_cache_cleared` event.",
    responses(
        (status = 200, description = "Cache cleared", body = CacheClearedResponse),
    )
)]
pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let evicted = state.pool_data.clear_cache().await;
    Json(CacheClearedResponse { evicted })
}

/// Pool routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pools/batch", post(batch_pools))
        .route("/pools/{token_a}/{token_b}", get(get_pool))
        .route("/pools/{token_a}/{token_b}/reserves", get(get_reserves))
        .route("/price-impact", post(price_impact))
        .route("/cache", delete(clear_cache))
}
