//! Shared types for the price ladder.
//!
//! The input record, the derived ladder, the editable fields and the
//! error taxonomy. Engine, session, commentary and dashboard modules all
//! depend on these without depending on each other.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The single source of truth for a pricing session.
///
/// Rates are percentages. Every rate must stay strictly below 100 for the
/// forward chain to be defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    /// Cost price, excluding tax.
    pub cost_price: f64,
    /// GP rate applied at the first stage (cost → net supply price).
    pub main_margin_rate: f64,
    pub wholesale_margin_rate: f64,
    pub consumer_margin_rate: f64,
}

impl PricingInput {
    pub fn new(
        cost_price: f64,
        main_margin_rate: f64,
        wholesale_margin_rate: f64,
        consumer_margin_rate: f64,
    ) -> Self {
        Self {
            cost_price,
            main_margin_rate,
            wholesale_margin_rate,
            consumer_margin_rate,
        }
    }

    /// Rate for a given stage.
    pub fn rate(&self, stage: MarginStage) -> f64 {
        match stage {
            MarginStage::Main => self.main_margin_rate,
            MarginStage::Wholesale => self.wholesale_margin_rate,
            MarginStage::Consumer => self.consumer_margin_rate,
        }
    }
}

impl fmt::Display for PricingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cost={:.2} main={:.2}% wholesale={:.2}% consumer={:.2}%",
            self.cost_price,
            self.main_margin_rate,
            self.wholesale_margin_rate,
            self.consumer_margin_rate,
        )
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// The derived price ladder. Always recomputed from a [`PricingInput`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub main_supply_net: f64,
    pub main_supply_with_tax: f64,
    pub wholesale_price: f64,
    pub consumer_price: f64,
    pub total_margin_amount: f64,
    /// Total margin as a percentage of the consumer price.
    pub final_margin_rate: f64,
}

impl fmt::Display for PricingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "net={:.2} taxed={:.2} wholesale={:.2} consumer={:.2} margin={:.2} ({:.2}%)",
            self.main_supply_net,
            self.main_supply_with_tax,
            self.wholesale_price,
            self.consumer_price,
            self.total_margin_amount,
            self.final_margin_rate,
        )
    }
}

// ---------------------------------------------------------------------------
// Stages and fields
// ---------------------------------------------------------------------------

/// One of the three margin stages of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginStage {
    Main,
    Wholesale,
    Consumer,
}

impl MarginStage {
    pub const ALL: [MarginStage; 3] = [Self::Main, Self::Wholesale, Self::Consumer];
}

impl fmt::Display for MarginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Wholesale => write!(f, "wholesale"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// An editable input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CostPrice,
    MainMarginRate,
    WholesaleMarginRate,
    ConsumerMarginRate,
    TargetPrice,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CostPrice => "cost_price",
            Self::MainMarginRate => "main_margin_rate",
            Self::WholesaleMarginRate => "wholesale_margin_rate",
            Self::ConsumerMarginRate => "consumer_margin_rate",
            Self::TargetPrice => "target_price",
        };
        f.write_str(name)
    }
}

/// A single user edit: which field changed and its new value.
///
/// Serialized as `{"field": "main_margin_rate", "value": 30.0}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Edit {
    CostPrice(f64),
    MainMarginRate(f64),
    WholesaleMarginRate(f64),
    ConsumerMarginRate(f64),
    TargetPrice(f64),
}

impl Edit {
    pub fn field(&self) -> Field {
        match self {
            Self::CostPrice(_) => Field::CostPrice,
            Self::MainMarginRate(_) => Field::MainMarginRate,
            Self::WholesaleMarginRate(_) => Field::WholesaleMarginRate,
            Self::ConsumerMarginRate(_) => Field::ConsumerMarginRate,
            Self::TargetPrice(_) => Field::TargetPrice,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Self::CostPrice(v)
            | Self::MainMarginRate(v)
            | Self::WholesaleMarginRate(v)
            | Self::ConsumerMarginRate(v)
            | Self::TargetPrice(v) => v,
        }
    }

    /// Whether this edit drives the inverse direction.
    pub fn is_target(&self) -> bool {
        matches!(self, Self::TargetPrice(_))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Pricing failures. Forward failures make every derived field unavailable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid cost price: {cost} (must be positive and keep every price finite)")]
    InvalidCost { cost: f64 },

    #[error("Invalid {stage} margin rate: {rate}% (must be below 100%)")]
    InvalidMargin { stage: MarginStage, rate: f64 },

    #[error("Cannot solve main margin: {reason}")]
    InverseUnsolvable { reason: String },
}

impl PricingError {
    /// Short machine-readable tag used by the JSON API.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCost { .. } => "invalid_cost",
            Self::InvalidMargin { .. } => "invalid_margin",
            Self::InverseUnsolvable { .. } => "inverse_unsolvable",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
