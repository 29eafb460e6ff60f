//! Inverse solve: target consumer price → main margin rate.
//!
//! Runs the forward chain backwards while holding the wholesale and
//! consumer margins fixed. The solved rate is kept at full precision;
//! only [`round_rate_for_display`] rounds it.

use crate::types::{MarginStage, PricingError, PricingInput};

use super::forward::{compute, validate_rate};
use super::TAX_MULTIPLIER;

/// Decimal places shown for a rate.
pub const DISPLAY_RATE_DECIMALS: i32 = 2;

/// Rate returned by [`inverse_main_margin`] when the target cannot be solved.
pub const FALLBACK_RATE: f64 = 0.0;

/// Solve for the main margin rate that makes the ladder end at
/// `target_consumer_price`.
pub fn solve_main_margin(
    cost_price: f64,
    wholesale_margin_rate: f64,
    consumer_margin_rate: f64,
    target_consumer_price: f64,
) -> Result<f64, PricingError> {
    if !target_consumer_price.is_finite() || target_consumer_price <= 0.0 {
        return Err(unsolvable(format!(
            "target price {target_consumer_price} must be positive"
        )));
    }
    if !cost_price.is_finite() || cost_price <= 0.0 {
        return Err(unsolvable(format!("cost price {cost_price} must be positive")));
    }
    validate_rate(MarginStage::Wholesale, wholesale_margin_rate)
        .and_then(|_| validate_rate(MarginStage::Consumer, consumer_margin_rate))
        .map_err(|e| unsolvable(e.to_string()))?;

    let wholesale_price = remove_margin(target_consumer_price, consumer_margin_rate);
    let main_supply_with_tax = remove_margin(wholesale_price, wholesale_margin_rate);
    let main_supply_net = main_supply_with_tax / TAX_MULTIPLIER;

    if !main_supply_net.is_finite() || main_supply_net <= 0.0 {
        return Err(unsolvable(format!(
            "net supply price {main_supply_net} must be positive"
        )));
    }

    let rate = (1.0 - cost_price / main_supply_net) * 100.0;
    // Targets far above cost push the rate to exactly 100 in f64.
    if validate_rate(MarginStage::Main, rate).is_err() {
        return Err(unsolvable(format!(
            "target price {target_consumer_price} needs a main margin of 100% or more"
        )));
    }
    compute(&PricingInput::new(
        cost_price,
        rate,
        wholesale_margin_rate,
        consumer_margin_rate,
    ))
    .map_err(|e| unsolvable(e.to_string()))?;

    Ok(rate)
}

/// Same as [`solve_main_margin`], but an unsolvable target yields
/// [`FALLBACK_RATE`] instead of an error.
pub fn inverse_main_margin(
    cost_price: f64,
    wholesale_margin_rate: f64,
    consumer_margin_rate: f64,
    target_consumer_price: f64,
) -> f64 {
    solve_main_margin(
        cost_price,
        wholesale_margin_rate,
        consumer_margin_rate,
        target_consumer_price,
    )
    .unwrap_or(FALLBACK_RATE)
}

/// Round a rate to the precision shown to users.
pub fn round_rate_for_display(rate: f64) -> f64 {
    round_to(rate, DISPLAY_RATE_DECIMALS)
}

/// Price before a margin of `rate` percent was applied.
#[inline]
fn remove_margin(price: f64, rate: f64) -> f64 {
    price * (1.0 - rate / 100.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn unsolvable(reason: String) -> PricingError {
    PricingError::InverseUnsolvable { reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
