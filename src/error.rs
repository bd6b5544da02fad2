//! Router error types with HTTP status code mapping.
//!
//! [`RouterError`] is the central error type of the service. Pool lookups
//! and route searches return it directly; the HTTP layer turns each
//! variant into a status code and a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DexProvider;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "pair not found: 0xA0b8…/0xC02a… on uniswap_v2",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`RouterError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                  |
/// |-----------|-----------------------|------------------------------|
/// | 1000–1999 | Validation/Capability | 400 Bad Request / 422        |
/// | 2000–2999 | Not Found             | 404 Not Found                |
/// | 3000–3999 | Upstream / Server     | 500 / 502 / 504 / 408        |
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A string could not be parsed as an EVM address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The token is not one of the two tokens of the pool.
    #[error("token {token} is not part of pool {pool}")]
    TokenNotInPool {
        /// Offending token address.
        token: String,
        /// Pair address of the pool.
        pool: String,
    },

    /// The provider is known but has no implementation on this network.
    #[error("unsupported provider: {provider} on {network}")]
    UnsupportedProvider {
        /// Requested provider.
        provider: DexProvider,
        /// Network the service runs against.
        network: String,
    },

    /// The provider factory has no pool for the pair.
    #[error("pair not found: {token_a}/{token_b} on {provider}")]
    PairNotFound {
        /// First token of the request.
        token_a: String,
        /// Second token of the request.
        token_b: String,
        /// Provider that was queried.
        provider: DexProvider,
    },

    /// Every route candidate between the two tokens was rejected.
    #[error("no route found from {token_in} to {token_out}")]
    NoRouteFound {
        /// Input token address.
        token_in: String,
        /// Output token address.
        token_out: String,
    },

    /// A JSON-RPC call failed (transport, node error or malformed reply).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// A JSON-RPC call did not complete within the configured timeout.
    #[error("rpc call timed out after {timeout_ms} ms")]
    RpcTimeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The caller abandoned the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAddress(_) => 1002,
            Self::TokenNotInPool { .. } => 1003,
            Self::UnsupportedProvider { .. } => 1004,
            Self::PairNotFound { .. } => 2001,
            Self::NoRouteFound { .. } => 2002,
            Self::Internal(_) => 3000,
            Self::Rpc(_) => 3001,
            Self::RpcTimeout { .. } => 3002,
            Self::Cancelled => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAddress(_) | Self::TokenNotInPool { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::UnsupportedProvider { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PairNotFound { .. } | Self::NoRouteFound { .. } => StatusCode::NOT_FOUND,
            Self::Rpc(_) => StatusCode::BAD_GATEWAY,
            Self::RpcTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for errors caused by the upstream chain node rather
    /// than by the request itself.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::RpcTimeout { .. })
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
