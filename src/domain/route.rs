//! Route candidates, segments and search outcomes.

use std::fmt;

use alloy_primitives::Address;
use serde::Serialize;

use super::{LiquidityPool, Token};
use crate::error::RouterError;

/// One hop of a route through a single pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    /// Token sold into the pool.
    pub token_in: Token,
    /// Token received from the pool.
    pub token_out: Token,
    /// Amount sold, in human units.
    pub amount_in: f64,
    /// Expected amount received (fee included), in human units.
    pub amount_out: f64,
    /// Curve price impact of this hop, in percent.
    pub price_impact: f64,
    /// Pool the hop trades against.
    pub pool: LiquidityPool,
    /// Ordered token addresses of the hop.
    pub path: Vec<Address>,
}

/// A chain of segments carrying a share of the routed volume.
///
/// Unsplit routes have exactly one leg at 100 %.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    /// Share of the route input carried by this leg, in percent.
    pub percentage: f64,
    /// Input of the first segment.
    pub amount_in: f64,
    /// Output of the last segment.
    pub amount_out: f64,
    /// Consecutive hops; each hop's input is the previous hop's output.
    pub segments: Vec<RouteSegment>,
}

impl RouteLeg {
    /// Builds a leg from consecutive segments.
    #[must_use]
    pub fn new(percentage: f64, segments: Vec<RouteSegment>) -> Self {
        let amount_in = segments.first().map_or(0.0, |s| s.amount_in);
        let amount_out = segments.last().map_or(0.0, |s| s.amount_out);
        Self {
            percentage,
            amount_in,
            amount_out,
            segments,
        }
    }

    /// Token addresses visited by the leg, start to end.
    #[must_use]
    pub fn path(&self) -> Vec<Address> {
        let mut path = Vec::with_capacity(self.segments.len() + 1);
        for segment in &self.segments {
            for address in &segment.path {
                if path.last() != Some(address) {
                    path.push(*address);
                }
            }
        }
        path
    }
}

/// Shape of a route candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteKind {
    /// Single pool between the two tokens.
    Direct,
    /// Two hops through an intermediate token.
    Bridge {
        /// Intermediate token address.
        via: Address,
        /// Intermediate token symbol.
        via_symbol: String,
    },
    /// Volume split between a direct leg and a bridged leg.
    Split {
        /// Intermediate token of the bridged leg.
        via: Address,
    },
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Bridge { via_symbol, .. } => write!(f, "bridge via {via_symbol}"),
            Self::Split { via } => write!(f, "split via {via}"),
        }
    }
}

/// The recommendation returned to a caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalRoute {
    /// Token sold.
    pub token_in: Token,
    /// Token bought.
    pub token_out: Token,
    /// Amount the caller asked to sell.
    pub requested_amount_in: f64,
    /// Amount actually routed; smaller than requested when the entry hop
    /// was shrunk to respect the price impact ceiling.
    pub amount_in: f64,
    /// Total expected output over all legs.
    pub amount_out: f64,
    /// Worst price impact over every segment, in percent.
    pub price_impact: f64,
    /// Shape of the route.
    pub kind: RouteKind,
    /// Parallel legs; percentages sum to 100.
    pub legs: Vec<RouteLeg>,
    /// `true` when volume is split across more than one leg.
    pub is_split: bool,
    /// Token address path of every leg.
    pub paths: Vec<Vec<Address>>,
}

impl OptimalRoute {
    /// Assembles a route from its legs, deriving totals, worst impact and paths.
    #[must_use]
    pub fn from_legs(
        token_in: Token,
        token_out: Token,
        requested_amount_in: f64,
        kind: RouteKind,
        legs: Vec<RouteLeg>,
    ) -> Self {
        let amount_in = legs.iter().map(|leg| leg.amount_in).sum();
        let amount_out = legs.iter().map(|leg| leg.amount_out).sum();
        let price_impact = legs
            .iter()
            .flat_map(|leg| leg.segments.iter())
            .map(|segment| segment.price_impact)
            .fold(0.0, f64::max);
        let paths = legs.iter().map(RouteLeg::path).collect();
        Self {
            token_in,
            token_out,
            requested_amount_in,
            amount_in,
            amount_out,
            price_impact,
            kind,
            is_split: legs.len() > 1,
            legs,
            paths,
        }
    }

    /// Every segment of every leg.
    pub fn segments(&self) -> impl Iterator<Item = &RouteSegment> {
        self.legs.iter().flat_map(|leg| leg.segments.iter())
    }

    /// Pair addresses of all pools the route touches.
    #[must_use]
    pub fn pair_addresses(&self) -> Vec<Address> {
        self.segments().map(|s| s.pool.pair_address()).collect()
    }
}

/// Why a route candidate was excluded from comparison.
#[derive(Debug, thiserror::Error)]
pub enum CandidateRejection {
    /// A pool lookup for one of the hops failed.
    #[error("pool unavailable: {0}")]
    Unavailable(#[from] RouterError),

    /// Shrinking the entry amount to the impact ceiling left too little.
    #[error("fitted amount {fitted} is below the minimum share of requested {requested}")]
    TooSmallAfterFit {
        /// Largest amount within the ceiling.
        fitted: f64,
        /// Amount the candidate was asked to carry.
        requested: f64,
    },

    /// A hop whose input could not be shrunk exceeds the impact ceiling.
    #[error("hop {hop} price impact {impact:.4}% exceeds ceiling {ceiling}%")]
    ImpactExceeded {
        /// Zero-based hop index within its leg.
        hop: usize,
        /// Impact of the hop.
        impact: f64,
        /// Ceiling it was checked against.
        ceiling: f64,
    },
}

/// Result of evaluating one candidate.
#[derive(Debug)]
pub struct CandidateOutcome {
    /// Candidate shape.
    pub kind: RouteKind,
    /// The route, or the reason it was rejected.
    pub result: Result<OptimalRoute, CandidateRejection>,
}

impl CandidateOutcome {
    /// Returns `true` if the candidate produced a route.
    #[must_use]
    pub fn is_viable(&self) -> bool {
        self.result.is_ok()
    }
}

/// All candidates evaluated for one quote request, in evaluation order.
#[derive(Debug, Default)]
pub struct RouteSearch {
    /// Evaluated candidates.
    pub candidates: Vec<CandidateOutcome>,
    /// `true` when the search stopped after the direct attempt.
    pub early_exit: bool,
}

impl RouteSearch {
    /// Viable routes sorted by expected output, best first.
    #[must_use]
    pub fn ranked(&self) -> Vec<&OptimalRoute> {
        let mut routes: Vec<&OptimalRoute> = self
            .candidates
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .collect();
        routes.sort_by(|a, b| b.amount_out.total_cmp(&a.amount_out));
        routes
    }

    /// Consumes the search and returns the route with the highest output.
    #[must_use]
    pub fn into_best(self) -> Option<OptimalRoute> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.result.ok())
            .max_by(|a, b| a.amount_out.total_cmp(&b.amount_out))
    }

    /// Rejected candidates with their reasons.
    pub fn rejections(&self) -> impl Iterator<Item = (&RouteKind, &CandidateRejection)> {
        self.candidates
            .iter()
            .filter_map(|c| c.result.as_ref().err().map(|e| (&c.kind, e)))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DexProvider, PoolReserves};
    use chrono::Utc;
    use tokio::time::Instant;

    fn token(byte: u8, symbol: &str) -> Token {
        Token::new(Address::repeat_byte(byte), symbol, symbol, 18)
    }

    fn segment(
        from: &Token,
        to: &Token,
        amount_in: f64,
        amount_out: f64,
        impact: f64,
    ) -> RouteSegment {
        let reserves = PoolReserves {
            pair_address: Address::repeat_byte(0xaa),
            provider: DexProvider::UniswapV2,
            token_a: from.address(),
            token_b: to.address(),
            reserve_a: 1,
            reserve_b: 1,
            fetched_at: Utc::now(),
            captured_at: Instant::now(),
        };
        RouteSegment {
            token_in: from.clone(),
            token_out: to.clone(),
            amount_in,
            amount_out,
            price_impact: impact,
            pool: LiquidityPool::derive(reserves, from.clone(), to.clone(), 0.003),
            path: vec![from.address(), to.address()],
        }
    }

    #[test]
    fn price_impact_is_worst_segment() {
        let (a, x, b) = (token(1, "A"), token(2, "X"), token(3, "B"));
        let direct = RouteLeg::new(50.0, vec![segment(&a, &b, 50.0, 49.0, 0.7)]);
        let bridged = RouteLeg::new(
            50.0,
            vec![segment(&a, &x, 50.0, 25.0, 2.5), segment(&x, &b, 25.0, 48.0, 0.4)],
        );
        let route = OptimalRoute::from_legs(
            a,
            b,
            100.0,
            RouteKind::Split { via: x.address() },
            vec![direct, bridged],
        );
        assert_eq!(route.price_impact, 2.5);
        assert!(route.is_split);
        assert_eq!(route.amount_in, 100.0);
        assert_eq!(route.amount_out, 97.0);
        assert_eq!(route.paths.len(), 2);
        assert_eq!(route.paths.get(1).map(Vec::len), Some(3));
    }

    #[test]
    fn best_is_highest_output() {
        let (a, b) = (token(1, "A"), token(3, "B"));
        let low = OptimalRoute::from_legs(
            a.clone(),
            b.clone(),
            10.0,
            RouteKind::Direct,
            vec![RouteLeg::new(100.0, vec![segment(&a, &b, 10.0, 9.0, 1.0)])],
        );
        let high = OptimalRoute::from_legs(
            a.clone(),
            b.clone(),
            10.0,
            RouteKind::Bridge {
                via: Address::repeat_byte(2),
                via_symbol: "X".to_string(),
            },
            vec![RouteLeg::new(100.0, vec![segment(&a, &b, 10.0, 9.5, 3.0)])],
        );
        let search = RouteSearch {
            candidates: vec![
                CandidateOutcome {
                    kind: low.kind.clone(),
                    result: Ok(low),
                },
                CandidateOutcome {
                    kind: RouteKind::Direct,
                    result: Err(CandidateRejection::Unavailable(RouterError::PairNotFound {
                        token_a: a.address().to_string(),
                        token_b: b.address().to_string(),
                        provider: DexProvider::UniswapV2,
                    })),
                },
                CandidateOutcome {
                    kind: high.kind.clone(),
                    result: Ok(high),
                },
            ],
            early_exit: false,
        };
        assert_eq!(search.ranked().len(), 2);
        assert_eq!(search.rejections().count(), 1);
        let Some(best) = search.into_best() else {
            panic!("expected a route");
        };
        assert_eq!(best.amount_out, 9.5);
    }
}
