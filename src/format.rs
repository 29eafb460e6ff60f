//! Display formatting for ladder values.
//!
//! Currency is shown in whole units with thousands separators; rates with
//! two decimals. Only the symbol is configurable.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::engine::TAX_RATE;
use crate::types::{PricingInput, PricingResult};

/// Format `value` as whole currency units, e.g. `₩127,101` or `-₩5`.
///
/// Rounds half away from zero. Non-finite values render as `-`.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let units = Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_i128());

    match units {
        Some(n) if n < 0 => format!("-{symbol}{}", group_thousands(n.unsigned_abs())),
        Some(n) => format!("{symbol}{}", group_thousands(n.unsigned_abs())),
        None => "-".to_string(),
    }
}

/// Format a percentage with two decimals, e.g. `56.73%`.
pub fn format_rate(rate: f64) -> String {
    if rate.is_finite() {
        format!("{rate:.2}%")
    } else {
        "-".to_string()
    }
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Ladder summary
// ---------------------------------------------------------------------------

/// One labelled row of the ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

/// Human-readable rendering of a full ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderSummary {
    pub lines: Vec<SummaryLine>,
}

impl LadderSummary {
    pub fn new(input: &PricingInput, result: &PricingResult, symbol: &str) -> Self {
        let money = |v: f64| format_currency(v, symbol);
        let rows = [
            ("Cost price (excl. tax)", money(input.cost_price)),
            (
                "Main margin (GP rate)",
                format_rate(input.main_margin_rate),
            ),
            ("Main supply price (net)", money(result.main_supply_net)),
            (
                "Main supply price (incl. tax)",
                format!("{} (+{:.0}% tax)", money(result.main_supply_with_tax), TAX_RATE * 100.0),
            ),
            ("Wholesale margin", format_rate(input.wholesale_margin_rate)),
            ("Wholesale price", money(result.wholesale_price)),
            ("Consumer margin", format_rate(input.consumer_margin_rate)),
            ("Consumer price", money(result.consumer_price)),
            ("Total margin", money(result.total_margin_amount)),
            ("Final margin rate", format_rate(result.final_margin_rate)),
        ];

        Self {
            lines: rows
                .into_iter()
                .map(|(label, value)| SummaryLine {
                    label: label.to_string(),
                    value,
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for LadderSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.lines.iter().map(|l| l.label.len()).max().unwrap_or(0);
        for line in &self.lines {
            writeln!(f, "{:<width$}  {}", line.label, line.value)?;
        }
        Ok(())
    }
}
