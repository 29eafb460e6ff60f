//! Forward computation: cost and margins → consumer price.
//!
//! Each stage divides its input by `(1 - rate/100)`, with a fixed 10%
//! tax markup applied after the first stage. Inputs are validated before
//! any division and every derived value is checked afterwards, so callers
//! never see `Infinity`, `NaN` or negative prices.

use crate::types::{MarginStage, PricingError, PricingInput, PricingResult};

use super::TAX_MULTIPLIER;

/// Compute the full price ladder for `input`.
pub fn compute(input: &PricingInput) -> Result<PricingResult, PricingError> {
    validate(input)?;

    let main_supply_net = apply_margin(input.cost_price, input.main_margin_rate);
    let main_supply_with_tax = main_supply_net * TAX_MULTIPLIER;
    let wholesale_price = apply_margin(main_supply_with_tax, input.wholesale_margin_rate);
    let consumer_price = apply_margin(wholesale_price, input.consumer_margin_rate);

    let total_margin_amount = consumer_price - input.cost_price;
    let final_margin_rate = total_margin_amount / consumer_price * 100.0;

    let result = PricingResult {
        main_supply_net,
        main_supply_with_tax,
        wholesale_price,
        consumer_price,
        total_margin_amount,
        final_margin_rate,
    };

    // A finite cost can still overflow somewhere up the chain.
    if !is_finite(&result) {
        return Err(PricingError::InvalidCost {
            cost: input.cost_price,
        });
    }
    Ok(result)
}

fn is_finite(result: &PricingResult) -> bool {
    [
        result.main_supply_net,
        result.main_supply_with_tax,
        result.wholesale_price,
        result.consumer_price,
        result.total_margin_amount,
        result.final_margin_rate,
    ]
    .iter()
    .all(|v| v.is_finite())
}

/// Check cost first, then each stage in ladder order.
pub fn validate(input: &PricingInput) -> Result<(), PricingError> {
    if !input.cost_price.is_finite() || input.cost_price <= 0.0 {
        return Err(PricingError::InvalidCost {
            cost: input.cost_price,
        });
    }
    for stage in MarginStage::ALL {
        validate_rate(stage, input.rate(stage))?;
    }
    Ok(())
}

pub(crate) fn validate_rate(stage: MarginStage, rate: f64) -> Result<(), PricingError> {
    if !rate.is_finite() || rate >= 100.0 {
        return Err(PricingError::InvalidMargin { stage, rate });
    }
    Ok(())
}

/// Price after a margin of `rate` percent on top of `price`.
#[inline]
fn apply_margin(price: f64, rate: f64) -> f64 {
    price / (1.0 - rate / 100.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
