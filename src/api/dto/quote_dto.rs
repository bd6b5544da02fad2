//! Quote DTOs for `POST /quote`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::TokenDto;
use crate::domain::{DexProvider, OptimalRoute, RouteKind, RouteLeg, RouteSegment, parse_address};
use crate::error::RouterError;
use crate::service::RouteRequest;

/// Request body for `POST /quote`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Token to sell.
    pub token_in: String,
    /// Token to buy.
    pub token_out: String,
    /// Amount of `token_in`, in human units.
    pub amount_in: f64,
    /// Per-hop price impact ceiling in percent (default 5).
    #[serde(default)]
    pub max_price_impact: Option<f64>,
    /// Provider, `uniswap_v2` when omitted.
    #[serde(default)]
    pub provider: Option<DexProvider>,
}

impl QuoteRequest {
    /// Converts into the optimizer's request type.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidAddress`] if either address is malformed.
    pub fn to_route_request(&self) -> Result<RouteRequest, RouterError> {
        Ok(RouteRequest {
            token_in: parse_address(&self.token_in)?,
            token_out: parse_address(&self.token_out)?,
            amount_in: self.amount_in,
            max_price_impact: self.max_price_impact,
            provider: self.provider.unwrap_or_default(),
        })
    }
}

/// One hop of a quoted route.
#[derive(Debug, Serialize, ToSchema)]
pub struct RouteSegmentDto {
    /// Token sold into the pool.
    pub token_in: String,
    /// Token received.
    pub token_out: String,
    /// Amount sold, in human units.
    pub amount_in: f64,
    /// Expected amount received, in human units.
    pub amount_out: f64,
    /// Price impact of this hop in percent.
    pub price_impact: f64,
    /// Pair contract traded against.
    pub pair_address: String,
    /// Provider of the pair.
    pub provider: DexProvider,
}

impl From<&RouteSegment> for RouteSegmentDto {
    fn from(s: &RouteSegment) -> Self {
        Self {
            token_in: s.token_in.address().to_string(),
            token_out: s.token_out.address().to_string(),
            amount_in: s.amount_in,
            amount_out: s.amount_out,
            price_impact: s.price_impact,
            pair_address: s.pool.pair_address().to_string(),
            provider: s.pool.provider(),
        }
    }
}

/// A leg of a quoted route.
#[derive(Debug, Serialize, ToSchema)]
pub struct RouteLegDto {
    /// Share of the routed input, in percent.
    pub percentage: f64,
    /// Input of the leg.
    pub amount_in: f64,
    /// Output of the leg.
    pub amount_out: f64,
    /// Hops of the leg.
    pub segments: Vec<RouteSegmentDto>,
}

impl From<&RouteLeg> for RouteLegDto {
    fn from(leg: &RouteLeg) -> Self {
        Self {
            percentage: leg.percentage,
            amount_in: leg.amount_in,
            amount_out: leg.amount_out,
            segments: leg.segments.iter().map(RouteSegmentDto::from).collect(),
        }
    }
}

/// Response body for `POST /quote`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    /// Token sold.
    pub token_in: TokenDto,
    /// Token bought.
    pub token_out: TokenDto,
    /// Amount asked for.
    pub requested_amount_in: f64,
    /// Amount routed (may be smaller after fitting to the impact ceiling).
    pub amount_in: f64,
    /// Total expected output.
    pub amount_out: f64,
    /// Worst hop price impact in percent.
    pub price_impact: f64,
    /// Route shape: `direct`, `bridge` or `split`.
    pub route_type: String,
    /// Human-readable route description.
    pub route: String,
    /// `true` when volume is split across legs.
    pub is_split: bool,
    /// Route legs.
    pub legs: Vec<RouteLegDto>,
    /// Token address path of each leg.
    pub paths: Vec<Vec<String>>,
    /// Suggested slippage tolerance in percent (shallowest pool on the route).
    pub recommended_slippage: f64,
}

impl QuoteResponse {
    /// Builds the response for a selected route.
    #[must_use]
    pub fn new(route: &OptimalRoute, recommended_slippage: f64) -> Self {
        let route_type = match route.kind {
            RouteKind::Direct => "direct",
            RouteKind::Bridge { .. } => "bridge",
            RouteKind::Split { .. } => "split",
        };
        Self {
            token_in: TokenDto::from(&route.token_in),
            token_out: TokenDto::from(&route.token_out),
            requested_amount_in: route.requested_amount_in,
            amount_in: route.amount_in,
            amount_out: route.amount_out,
            price_impact: route.price_impact,
            route_type: route_type.to_string(),
            route: route.kind.to_string(),
            is_split: route.is_split,
            legs: route.legs.iter().map(RouteLegDto::from).collect(),
            paths: route
                .paths
                .iter()
                .map(|path| path.iter().map(ToString::to_string).collect())
                .collect(),
            recommended_slippage,
        }
    }
}
