//! OpenAPI documentation.
//!
//! The document is served under `/api-docs/openapi.json`, with Swagger UI
//! at `/swagger-ui` when the `swagger-ui` feature is enabled.

use utoipa::OpenApi;

use super::dto::{
    BatchPoolsRequest, BatchPoolsResponse, CacheClearedResponse, PairDto, PairFailureDto,
    PoolDataResponse, PoolReservesResponse, PriceImpactRequest, PriceImpactResponse,
    QuoteRequest, QuoteResponse, RouteLegDto, RouteSegmentDto, TokenDto,
};
use super::handlers::{pool, quote, system};
use crate::domain::DexProvider;
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI documentation structure.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "swap-router API",
        description = "Swap route optimizer and pool reserves cache for constant-product DEXes. \
                       Quotes direct, bridged and split routes and exposes pool analytics.",
        license(name = "MIT")
    ),
    tags(
        (name = "Quotes", description = "Route search"),
        (name = "Pools", description = "Pool reserves, analytics and cache"),
        (name = "System", description = "Health and network configuration")
    ),
    paths(
        quote::quote,
        pool::get_reserves,
        pool::get_pool,
        pool::batch_pools,
        pool::price_impact,
        pool::clear_cache,
        system::health_handler,
        system::providers_handler,
        system::bridge_tokens_handler,
    ),
    components(schemas(
        QuoteRequest,
        QuoteResponse,
        RouteLegDto,
        RouteSegmentDto,
        TokenDto,
        PoolReservesResponse,
        PoolDataResponse,
        PairDto,
        BatchPoolsRequest,
        BatchPoolsResponse,
        PairFailureDto,
        PriceImpactRequest,
        PriceImpactResponse,
        CacheClearedResponse,
        DexProvider,
        ErrorResponse,
        ErrorBody,
    ))
)]
pub struct ApiDoc;

/// Returns the OpenAPI JSON document.
#[must_use]
pub fn openapi_json() -> String {
    ApiDoc::openapi().to_json().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let json = openapi_json();
        assert!(json.contains("swap-router API"));
        for path in [
            "/api/v1/quote",
            "/api/v1/pools/{token_a}/{token_b}",
            "/api/v1/pools/{token_a}/{token_b}/reserves",
            "/api/v1/pools/batch",
            "/api/v1/price-impact",
            "/api/v1/cache",
            "/health",
            "/config/providers",
            "/config/bridge-tokens",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
    }
}
