//! Route optimizer: direct, bridged and split route search.

use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::RoutingPolicy;
use crate::domain::{
    CandidateOutcome, CandidateRejection, DexProvider, LiquidityPool, MarketEvent, OptimalRoute,
    RouteKind, RouteLeg, RouteSearch, RouteSegment, Token,
};
use crate::error::RouterError;

use super::PoolDataService;

/// A quote request in domain terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Token to sell.
    pub token_in: Address,
    /// Token to buy.
    pub token_out: Address,
    /// Amount of `token_in` to sell, in human units.
    pub amount_in: f64,
    /// Per-segment price impact ceiling in percent; the policy default when `None`.
    pub max_price_impact: Option<f64>,
    /// Provider whose pools are used.
    pub provider: DexProvider,
}

/// Searches the pools of one provider for the route with the best output.
///
/// Candidates are evaluated in a fixed order (direct, bridges, split) and
/// compared by expected output. Each pool lookup goes through the shared
/// [`PoolDataService`] cache.
#[derive(Debug, Clone)]
pub struct RouteOptimizerService {
    pool_data: Arc<PoolDataService>,
    policy: RoutingPolicy,
}

impl RouteOptimizerService {
    /// Creates an optimizer over `pool_data`.
    #[must_use]
    pub const fn new(pool_data: Arc<PoolDataService>, policy: RoutingPolicy) -> Self {
        Self { pool_data, policy }
    }

    /// The pool data service used for lookups.
    #[must_use]
    pub const fn pool_data(&self) -> &Arc<PoolDataService> {
        &self.pool_data
    }

    /// Routing thresholds in use.
    #[must_use]
    pub const fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Slippage tolerance for `route`: the loosest recommendation among
    /// the pools it trades against.
    #[must_use]
    pub fn recommended_slippage(&self, route: &OptimalRoute) -> f64 {
        route
            .segments()
            .map(|segment| self.pool_data.get_recommended_slippage(&segment.pool))
            .fold(0.0, f64::max)
    }

    /// Returns the route with the highest expected output and publishes a
    /// `route_quoted` event.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidRequest`] for a malformed request.
    /// - [`RouterError::NoRouteFound`] when every candidate was rejected.
    /// - [`RouterError::Cancelled`] if `cancel` fires during the search.
    pub async fn find_optimal_route(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<OptimalRoute, RouterError> {
        let search = self.explore_routes(request, cancel).await?;
        for (kind, reason) in search.rejections() {
            tracing::debug!(%kind, %reason, "route candidate rejected");
        }
        let route = search
            .into_best()
            .ok_or_else(|| RouterError::NoRouteFound {
                token_in: request.token_in.to_string(),
                token_out: request.token_out.to_string(),
            })?;

        tracing::info!(
            token_in = route.token_in.symbol(),
            token_out = route.token_out.symbol(),
            amount_in = route.amount_in,
            amount_out = route.amount_out,
            price_impact = route.price_impact,
            route = %route.kind,
            "route selected"
        );
        let _ = self.pool_data.event_bus().publish(MarketEvent::RouteQuoted {
            token_in: route.token_in.address(),
            token_out: route.token_out.address(),
            amount_in: route.amount_in.to_string(),
            amount_out: route.amount_out.to_string(),
            price_impact: route.price_impact,
            route: route.kind.to_string(),
            pair_addresses: route.pair_addresses(),
            timestamp: Utc::now(),
        });
        Ok(route)
    }

    /// Evaluates every applicable candidate and returns all outcomes.
    ///
    /// Stops after the direct attempt when the amount is small or the
    /// direct impact is comfortably under the ceiling.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidRequest`] for a malformed request.
    /// - [`RouterError::Cancelled`] if `cancel` fires during the search.
    /// - Token resolution failures for the two endpoints.
    pub async fn explore_routes(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<RouteSearch, RouterError> {
        let ceiling = self.validate(request)?;
        ensure_active(cancel)?;

        let tokens = self.pool_data.tokens();
        let (token_in, token_out) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RouterError::Cancelled),
            pair = async {
                tokio::try_join!(
                    tokens.resolve(request.token_in),
                    tokens.resolve(request.token_out)
                )
            } => pair?,
        };
        let quote = Quote {
            token_in,
            token_out,
            amount: request.amount_in,
            ceiling,
            provider: request.provider,
        };

        let mut search = RouteSearch::default();

        let direct = self.direct_candidate(&quote, cancel).await;
        ensure_active(cancel)?;
        let comfortable = match &direct {
            Ok(route) => {
                quote.amount < self.policy.small_amount_threshold
                    || route.price_impact <= self.policy.comfortable_impact_ratio * ceiling
            }
            Err(_) => false,
        };
        search.candidates.push(CandidateOutcome {
            kind: RouteKind::Direct,
            result: direct,
        });
        if comfortable {
            search.early_exit = true;
            return Ok(search);
        }

        for via in self.pool_data.network().bridge_tokens() {
            if *via == quote.token_in.address() || *via == quote.token_out.address() {
                continue;
            }
            ensure_active(cancel)?;
            let outcome = self.bridge_candidate(&quote, *via, cancel).await;
            ensure_active(cancel)?;
            search.candidates.push(outcome);
        }

        let weth = self.pool_data.network().wrapped_native().clone();
        let touches_weth = quote.token_in.address() == weth.address()
            || quote.token_out.address() == weth.address();
        if quote.amount >= self.policy.split_route_threshold && !touches_weth {
            ensure_active(cancel)?;
            let result = self.split_candidate(&quote, &weth, cancel).await;
            ensure_active(cancel)?;
            search.candidates.push(CandidateOutcome {
                kind: RouteKind::Split {
                    via: weth.address(),
                },
                result,
            });
        }

        Ok(search)
    }

    fn validate(&self, request: &RouteRequest) -> Result<f64, RouterError> {
        if request.token_in == request.token_out {
            return Err(RouterError::InvalidRequest(
                "token_in and token_out must differ".to_string(),
            ));
        }
        if !request.amount_in.is_finite() || request.amount_in <= 0.0 {
            return Err(RouterError::InvalidRequest(format!(
                "amount_in must be a positive number, got {}",
                request.amount_in
            )));
        }
        let ceiling = request
            .max_price_impact
            .unwrap_or(self.policy.default_max_price_impact);
        if !ceiling.is_finite() || ceiling <= 0.0 || ceiling > 100.0 {
            return Err(RouterError::InvalidRequest(format!(
                "max_price_impact must be in (0, 100], got {ceiling}"
            )));
        }
        Ok(ceiling)
    }

    async fn direct_candidate(
        &self,
        quote: &Quote,
        cancel: &CancellationToken,
    ) -> Result<OptimalRoute, CandidateRejection> {
        let pool = self
            .lookup(&quote.token_in, &quote.token_out, quote.provider, cancel)
            .await?;
        let amount = self.fit_entry(&pool, &quote.token_in, quote.amount, quote.ceiling)?;
        let segment = self.segment(&pool, &quote.token_in, amount)?;
        Ok(OptimalRoute::from_legs(
            quote.token_in.clone(),
            quote.token_out.clone(),
            quote.amount,
            RouteKind::Direct,
            vec![RouteLeg::new(100.0, vec![segment])],
        ))
    }

    async fn bridge_candidate(
        &self,
        quote: &Quote,
        via: Address,
        cancel: &CancellationToken,
    ) -> CandidateOutcome {
        let resolved = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RouterError::Cancelled),
            token = self.pool_data.tokens().resolve(via) => token,
        };
        let bridge = match resolved {
            Ok(token) => token,
            Err(err) => {
                return CandidateOutcome {
                    kind: RouteKind::Bridge {
                        via,
                        via_symbol: via.to_string(),
                    },
                    result: Err(err.into()),
                };
            }
        };
        let kind = RouteKind::Bridge {
            via,
            via_symbol: bridge.symbol().to_string(),
        };
        let result = self.bridge_route(quote, &bridge, kind.clone(), cancel).await;
        CandidateOutcome { kind, result }
    }

    async fn bridge_route(
        &self,
        quote: &Quote,
        bridge: &Token,
        kind: RouteKind,
        cancel: &CancellationToken,
    ) -> Result<OptimalRoute, CandidateRejection> {
        let first = self
            .lookup(&quote.token_in, bridge, quote.provider, cancel)
            .await?;
        let second = self
            .lookup(bridge, &quote.token_out, quote.provider, cancel)
            .await?;

        let amount = self.fit_entry(&first, &quote.token_in, quote.amount, quote.ceiling)?;
        let hop1 = self.segment(&first, &quote.token_in, amount)?;
        let hop2 = self.segment(&second, bridge, hop1.amount_out)?;
        within_ceiling(&hop2, 1, quote.ceiling)?;

        Ok(OptimalRoute::from_legs(
            quote.token_in.clone(),
            quote.token_out.clone(),
            quote.amount,
            kind,
            vec![RouteLeg::new(100.0, vec![hop1, hop2])],
        ))
    }

    async fn split_candidate(
        &self,
        quote: &Quote,
        bridge: &Token,
        cancel: &CancellationToken,
    ) -> Result<OptimalRoute, CandidateRejection> {
        let direct = self
            .lookup(&quote.token_in, &quote.token_out, quote.provider, cancel)
            .await?;
        let first = self
            .lookup(&quote.token_in, bridge, quote.provider, cancel)
            .await?;
        let second = self
            .lookup(bridge, &quote.token_out, quote.provider, cancel)
            .await?;

        let half = quote.amount / 2.0;
        let direct_hop = self.segment(&direct, &quote.token_in, half)?;
        within_ceiling(&direct_hop, 0, quote.ceiling)?;
        let hop1 = self.segment(&first, &quote.token_in, quote.amount - half)?;
        within_ceiling(&hop1, 0, quote.ceiling)?;
        let hop2 = self.segment(&second, bridge, hop1.amount_out)?;
        within_ceiling(&hop2, 1, quote.ceiling)?;

        Ok(OptimalRoute::from_legs(
            quote.token_in.clone(),
            quote.token_out.clone(),
            quote.amount,
            RouteKind::Split {
                via: bridge.address(),
            },
            vec![
                RouteLeg::new(50.0, vec![direct_hop]),
                RouteLeg::new(50.0, vec![hop1, hop2]),
            ],
        ))
    }

    async fn lookup(
        &self,
        a: &Token,
        b: &Token,
        provider: DexProvider,
        cancel: &CancellationToken,
    ) -> Result<LiquidityPool, RouterError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RouterError::Cancelled),
            pool = self.pool_data.get_pool_data(a.address(), b.address(), provider) => pool,
        }
    }

    /// Shrinks an entry amount to the ceiling, rejecting fits that keep too
    /// little of the requested volume.
    fn fit_entry(
        &self,
        pool: &LiquidityPool,
        token_in: &Token,
        requested: f64,
        ceiling: f64,
    ) -> Result<f64, CandidateRejection> {
        let fitted = self.pool_data.calculate_optimal_trade_size(
            pool,
            requested,
            token_in.address(),
            ceiling,
        )?;
        if fitted <= 0.0 || fitted < requested * self.policy.min_fit_ratio {
            return Err(CandidateRejection::TooSmallAfterFit { fitted, requested });
        }
        Ok(fitted)
    }

    fn segment(
        &self,
        pool: &LiquidityPool,
        token_in: &Token,
        amount_in: f64,
    ) -> Result<RouteSegment, RouterError> {
        let token_out = pool
            .counterpart(token_in.address())
            .cloned()
            .ok_or_else(|| RouterError::TokenNotInPool {
                token: token_in.address().to_string(),
                pool: pool.pair_address().to_string(),
            })?;
        let price_impact = self
            .pool_data
            .calculate_price_impact(pool, amount_in, token_in.address())?;
        let amount_out = self
            .pool_data
            .expected_output(pool, amount_in, token_in.address())?;
        Ok(RouteSegment {
            path: vec![token_in.address(), token_out.address()],
            token_in: token_in.clone(),
            token_out,
            amount_in,
            amount_out,
            price_impact,
            pool: pool.oriented(token_in.address()),
        })
    }
}

/// Resolved request shared by the candidate builders.
#[derive(Debug)]
struct Quote {
    token_in: Token,
    token_out: Token,
    amount: f64,
    ceiling: f64,
    provider: DexProvider,
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), RouterError> {
    if cancel.is_cancelled() {
        Err(RouterError::Cancelled)
    } else {
        Ok(())
    }
}

fn within_ceiling(
    segment: &RouteSegment,
    hop: usize,
    ceiling: f64,
) -> Result<(), CandidateRejection> {
    if segment.price_impact > ceiling {
        return Err(CandidateRejection::ImpactExceeded {
            hop,
            impact: segment.price_impact,
            ceiling,
        });
    }
    Ok(())
}
