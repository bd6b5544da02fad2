//! Constant-product (`x * y = k`) pricing helpers.
//!
//! All amounts are in human units (already scaled by token decimals).
//! Price impact is reported in percent and measures curve slippage only;
//! the trading fee is applied separately by [`amount_out`].

/// Inputs smaller than this fraction of the input reserve report zero
/// price impact, so rounding noise never shows up as impact.
pub const NEGLIGIBLE_INPUT_RATIO: f64 = 1e-4;

/// Distance (in percentage points) to the impact ceiling at which the
/// trade-size search stops.
pub const IMPACT_TOLERANCE: f64 = 0.1;

/// Liquidity at or above which a pool counts as very liquid.
pub const DEEP_LIQUIDITY: f64 = 1_000_000.0;

/// Liquidity at or above which a pool counts as moderately liquid.
pub const MODERATE_LIQUIDITY: f64 = 100_000.0;

/// Relative shortfall, in percent, of the curve output against the output
/// at the current spot price.
///
/// Returns exactly `0.0` for non-positive or negligible inputs and `100.0`
/// when the pool has an empty side.
#[must_use]
pub fn price_impact(reserve_in: f64, reserve_out: f64, amount_in: f64) -> f64 {
    if amount_in <= 0.0 {
        return 0.0;
    }
    if reserve_in <= 0.0 || reserve_out <= 0.0 {
        return 100.0;
    }
    if amount_in < reserve_in * NEGLIGIBLE_INPUT_RATIO {
        return 0.0;
    }
    let spot_out = amount_in * reserve_out / reserve_in;
    let curve_out = amount_in * reserve_out / (reserve_in + amount_in);
    ((spot_out - curve_out) / spot_out * 100.0).max(0.0)
}

/// Fee-adjusted constant-product output for selling `amount_in`.
#[must_use]
pub fn amount_out(reserve_in: f64, reserve_out: f64, amount_in: f64, fee_rate: f64) -> f64 {
    if amount_in <= 0.0 || reserve_in <= 0.0 || reserve_out <= 0.0 {
        return 0.0;
    }
    let effective_in = amount_in * (1.0 - fee_rate);
    effective_in * reserve_out / (reserve_in + effective_in)
}

/// Largest amount in `[0, max_amount]` whose impact stays within
/// `max_price_impact`.
///
/// Returns `max_amount` unchanged when it already satisfies the ceiling.
/// Otherwise bisects for at most `max_iterations` rounds and stops early
/// once a trial amount lands within [`IMPACT_TOLERANCE`] below the ceiling. The
/// result never exceeds the ceiling; it is `0.0` when no trial amount did.
#[must_use]
pub fn optimal_trade_size<F>(
    max_amount: f64,
    max_price_impact: f64,
    max_iterations: u32,
    impact: F,
) -> f64
where
    F: Fn(f64) -> f64,
{
    if max_amount <= 0.0 {
        return 0.0;
    }
    if impact(max_amount) <= max_price_impact {
        return max_amount;
    }

    let mut low = 0.0;
    let mut high = max_amount;
    for _ in 0..max_iterations {
        let mid = (low + high) / 2.0;
        let trial = impact(mid);
        if trial <= max_price_impact {
            low = mid;
            if max_price_impact - trial <= IMPACT_TOLERANCE {
                break;
            }
        } else {
            high = mid;
        }
    }
    low
}

/// Coarse slippage recommendation (percent) from a pool's liquidity metric.
#[must_use]
pub fn recommended_slippage(liquidity: f64) -> f64 {
    if liquidity >= DEEP_LIQUIDITY {
        0.5
    } else if liquidity >= MODERATE_LIQUIDITY {
        1.0
    } else {
        2.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negligible_inputs_have_no_impact() {
        assert_eq!(price_impact(1_000.0, 1_000.0, 0.0), 0.0);
        assert_eq!(price_impact(1_000.0, 1_000.0, 0.05), 0.0);
        assert!(price_impact(1_000.0, 1_000.0, 0.2) > 0.0);
    }

    #[test]
    fn impact_is_monotonic_in_amount() {
        let mut previous = 0.0;
        for step in 0..200 {
            let amount = f64::from(step) * 7.5;
            let impact = price_impact(1_000.0, 3_000.0, amount);
            assert!(impact >= previous, "impact dropped at {amount}");
            previous = impact;
        }
    }

    #[test]
    fn impact_matches_closed_form() {
        // amount / (reserve_in + amount)
        let impact = price_impact(950.0, 10.0, 50.0);
        assert!((impact - 5.0).abs() < 1e-9);
    }

    #[test]
    fn amount_out_applies_fee() {
        let without_fee = amount_out(1_000.0, 1_000.0, 10.0, 0.0);
        let with_fee = amount_out(1_000.0, 1_000.0, 10.0, 0.003);
        assert!(with_fee < without_fee);
        assert!((without_fee - 10_000.0 / 1_010.0).abs() < 1e-9);
    }

    #[test]
    fn optimal_size_returns_max_when_within_ceiling() {
        let size = optimal_trade_size(10.0, 5.0, 10, |a| price_impact(1_000.0, 1_000.0, a));
        assert_eq!(size, 10.0);
    }

    #[test]
    fn optimal_size_converges_near_ceiling() {
        let impact = |a| price_impact(1_000.0, 1_000.0, a);
        let size = optimal_trade_size(1_000.0, 5.0, 10, impact);
        assert!(size < 1_000.0);
        let reached = impact(size);
        assert!(reached <= 5.0);
        assert!(5.0 - reached <= IMPACT_TOLERANCE, "impact {reached}");
    }

    #[test]
    fn optimal_size_is_zero_when_nothing_fits() {
        let size = optimal_trade_size(1_000.0, 5.0, 10, |_| 50.0);
        assert_eq!(size, 0.0);
    }

    #[test]
    fn slippage_tiers() {
        assert_eq!(recommended_slippage(5_000_000.0), 0.5);
        assert_eq!(recommended_slippage(250_000.0), 1.0);
        assert_eq!(recommended_slippage(99.0), 2.0);
    }
}
