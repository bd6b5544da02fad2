//! Quote handler: best route between two tokens.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

use crate::api::dto::{QuoteRequest, QuoteResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RouterError};

/// `POST /quote` — Find the route with the highest expected output.
///
/// The search is cancelled when the client disconnects or when the
/// configured quote budget elapses.
///
/// # Errors
///
/// Returns [`RouterError::NoRouteFound`] when no candidate is viable,
/// [`RouterError::Cancelled`] when the budget elapses, or a validation error.
#[utoipa::path(
    post,
    path = "/api/v1/quote",
    tag = "Quotes",
    summary = "Quote a swap",
    description = "Evaluates the direct pool, two-hop routes through each bridge token and a 50/50 split through the wrapped native asset, and returns the candidate with the highest expected output. Every hop respects `max_price_impact`; the routed amount may be smaller than requested.",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Best route", body = QuoteResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "No viable route", body = ErrorResponse),
        (status = 408, description = "Quote budget exceeded", body = ErrorResponse),
        (status = 502, description = "Chain node error", body = ErrorResponse),
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, RouterError> {
    let request = req.to_route_request()?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let search = state.optimizer.find_optimal_route(&request, &cancel);
    let route = match tokio::time::timeout(state.quote_timeout, search).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(
                token_in = %request.token_in,
                token_out = %request.token_out,
                budget_ms = state.quote_timeout.as_millis(),
                "quote budget exceeded"
            );
            return Err(RouterError::Cancelled);
        }
    };

    let slippage = state.optimizer.recommended_slippage(&route);
    Ok(Json(QuoteResponse::new(&route, slippage)))
}

/// Quote routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/quote", post(quote))
}
