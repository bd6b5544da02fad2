//! Pool-related DTOs: reserves, pool data, batch lookups and analytics.
//!
//! Raw reserves are serialized as decimal strings to keep full `u128`
//! precision; human-unit amounts are plain JSON numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::TokenDto;
use crate::domain::{DexProvider, LiquidityPool, PoolReserves, parse_address};
use crate::error::RouterError;
use crate::service::{PairFailure, PairRequest};

/// Response body for `GET /pools/{token_a}/{token_b}/reserves`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolReservesResponse {
    /// Pair contract address.
    pub pair_address: String,
    /// Provider of the pair.
    pub provider: DexProvider,
    /// First token, in request order.
    pub token_a: String,
    /// Second token, in request order.
    pub token_b: String,
    /// Raw reserve of `token_a`.
    pub reserve_a: String,
    /// Raw reserve of `token_b`.
    pub reserve_b: String,
    /// When the snapshot was read from chain.
    pub fetched_at: DateTime<Utc>,
    /// Snapshot age in milliseconds.
    pub age_ms: u64,
}

impl From<&PoolReserves> for PoolReservesResponse {
    fn from(r: &PoolReserves) -> Self {
        Self {
            pair_address: r.pair_address.to_string(),
            provider: r.provider,
            token_a: r.token_a.to_string(),
            token_b: r.token_b.to_string(),
            reserve_a: r.reserve_a.to_string(),
            reserve_b: r.reserve_b.to_string(),
            fetched_at: r.fetched_at,
            age_ms: u64::try_from(r.age().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Response body for `GET /pools/{token_a}/{token_b}` and batch entries.
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolDataResponse {
    /// Pair contract address.
    pub pair_address: String,
    /// Provider of the pair.
    pub provider: DexProvider,
    /// First token.
    pub token_a: TokenDto,
    /// Second token.
    pub token_b: TokenDto,
    /// Raw reserve of `token_a`.
    pub reserve_a: String,
    /// Raw reserve of `token_b`.
    pub reserve_b: String,
    /// Trading fee as a fraction (0.003 = 0.3 %).
    pub fee_rate: f64,
    /// Geometric mean of both reserves in human units.
    pub liquidity: f64,
    /// Suggested slippage tolerance in percent.
    pub recommended_slippage: f64,
    /// When the underlying reserves were read.
    pub fetched_at: DateTime<Utc>,
}

impl PoolDataResponse {
    /// Builds the response from a pool view and its slippage recommendation.
    #[must_use]
    pub fn new(pool: &LiquidityPool, recommended_slippage: f64) -> Self {
        Self {
            pair_address: pool.pair_address().to_string(),
            provider: pool.provider(),
            token_a: TokenDto::from(&pool.token_a),
            token_b: TokenDto::from(&pool.token_b),
            reserve_a: pool.reserves.reserve_a.to_string(),
            reserve_b: pool.reserves.reserve_b.to_string(),
            fee_rate: pool.fee_rate,
            liquidity: pool.liquidity,
            recommended_slippage,
            fetched_at: pool.reserves.fetched_at,
        }
    }
}

/// One pair of a batch request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PairDto {
    /// First token address.
    pub token_a: String,
    /// Second token address.
    pub token_b: String,
    /// Provider, `uniswap_v2` when omitted.
    #[serde(default)]
    pub provider: Option<DexProvider>,
}

impl PairDto {
    /// Parses the addresses.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidAddress`] if either address is malformed.
    pub fn to_request(&self) -> Result<PairRequest, RouterError> {
        Ok(PairRequest {
            token_a: parse_address(&self.token_a)?,
            token_b: parse_address(&self.token_b)?,
            provider: self.provider.unwrap_or_default(),
        })
    }
}

/// Request body for `POST /pools/batch`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchPoolsRequest {
    /// Pairs to look up.
    pub pairs: Vec<PairDto>,
}

/// A pair that could not be served.
#[derive(Debug, Serialize, ToSchema)]
pub struct PairFailureDto {
    /// First token address.
    pub token_a: String,
    /// Second token address.
    pub token_b: String,
    /// Provider queried.
    pub provider: DexProvider,
    /// Numeric error code.
    pub code: u32,
    /// Error message.
    pub message: String,
}

impl From<&PairFailure> for PairFailureDto {
    fn from(f: &PairFailure) -> Self {
        Self {
            token_a: f.pair.token_a.to_string(),
            token_b: f.pair.token_b.to_string(),
            provider: f.pair.provider,
            code: f.error.error_code(),
            message: f.error.to_string(),
        }
    }
}

/// Response body for `POST /pools/batch`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchPoolsResponse {
    /// Pools served.
    pub pools: Vec<PoolDataResponse>,
    /// Pairs that failed.
    pub failures: Vec<PairFailureDto>,
}

/// Request body for `POST /price-impact`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PriceImpactRequest {
    /// Token sold.
    pub token_in: String,
    /// Token bought.
    pub token_out: String,
    /// Amount of `token_in` in human units.
    pub amount_in: f64,
    /// When set, also compute the largest amount within this impact (percent).
    #[serde(default)]
    pub max_price_impact: Option<f64>,
    /// Provider, `uniswap_v2` when omitted.
    #[serde(default)]
    pub provider: Option<DexProvider>,
}

/// Response body for `POST /price-impact`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PriceImpactResponse {
    /// Pair contract address.
    pub pair_address: String,
    /// Amount evaluated, in human units.
    pub amount_in: f64,
    /// Curve price impact in percent.
    pub price_impact: f64,
    /// Expected output after the fee, in human units.
    pub expected_output: f64,
    /// Largest amount within `max_price_impact`, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_trade_size: Option<f64>,
    /// Suggested slippage tolerance in percent.
    pub recommended_slippage: f64,
}

/// Response body for `DELETE /cache`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CacheClearedResponse {
    /// Number of reserves snapshots evicted.
    pub evicted: usize,
}
