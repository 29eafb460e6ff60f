//! Edit synchronization between the forward and inverse directions.
//!
//! The consumer price is derived from the margins, but the target price
//! field is also a user-editable proxy for the main margin. Mirroring the
//! consumer price into the target field and solving the main margin from
//! the target field would trigger each other forever, so every edit records
//! which side it came from and propagation consults that once:
//!
//! ```text
//!            edit(cost | margin)                    edit(target)
//!   Idle ───────────────────────▶ FromForwardEdit   Idle ───────────▶ FromTargetEdit
//!     ▲   recompute, mirror target        │           ▲  solve main margin,   │
//!     └───────────────────────────────────┘           └── recompute, no mirror┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{Edit, Field, PricingError, PricingInput, PricingResult};

use super::{forward, inverse};

// ---------------------------------------------------------------------------
// Direction and policy
// ---------------------------------------------------------------------------

/// Where the edit currently being propagated came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "field", rename_all = "snake_case")]
pub enum SyncDirection {
    #[default]
    Idle,
    /// Cost or a margin was edited; the target field mirrors the result.
    FromForwardEdit(Field),
    /// The target price was edited; it stays exactly as typed.
    FromTargetEdit,
}

impl SyncDirection {
    /// Whether propagation should overwrite the target price field.
    pub fn mirrors_target(&self) -> bool {
        matches!(self, Self::FromForwardEdit(_))
    }
}

/// What to do when a target price cannot be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverseFallback {
    /// Write a 0% main margin and report the failure alongside the outcome.
    #[default]
    ZeroRate,
    /// Refuse the edit and leave the session untouched.
    Reject,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of applying one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub revision: u64,
    pub direction: SyncDirection,
    /// Recomputed ladder, or why it is unavailable.
    pub result: Result<PricingResult, PricingError>,
    /// Set when a target edit could not be solved and the fallback rate was used.
    pub inverse_error: Option<PricingError>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single interactive pricing session.
///
/// Owns the [`PricingInput`] and the target price display field. Exactly
/// one edit is in flight at a time; `apply` runs it to completion.
#[derive(Debug, Clone)]
pub struct PricingSession {
    input: PricingInput,
    target_price: Option<f64>,
    direction: SyncDirection,
    fallback: InverseFallback,
    revision: u64,
}

impl PricingSession {
    /// Start a session. The target field starts mirrored from `input`.
    pub fn new(input: PricingInput, fallback: InverseFallback) -> Self {
        let target_price = forward::compute(&input)
            .ok()
            .map(|r| mirrored_target(r.consumer_price));
        Self {
            input,
            target_price,
            direction: SyncDirection::Idle,
            fallback,
            revision: 0,
        }
    }

    pub fn input(&self) -> &PricingInput {
        &self.input
    }

    /// Current value of the target price field, if it has ever held one.
    pub fn target_price(&self) -> Option<f64> {
        self.target_price
    }

    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    pub fn fallback(&self) -> InverseFallback {
        self.fallback
    }

    /// Number of edits applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The ladder for the current input.
    pub fn result(&self) -> Result<PricingResult, PricingError> {
        forward::compute(&self.input)
    }

    /// Apply one edit and propagate it.
    ///
    /// Only fails under [`InverseFallback::Reject`], in which case the session
    /// is left exactly as it was.
    pub fn apply(&mut self, edit: Edit) -> Result<EditOutcome, PricingError> {
        let mut inverse_error = None;

        match edit {
            Edit::TargetPrice(target) => {
                let solved = inverse::solve_main_margin(
                    self.input.cost_price,
                    self.input.wholesale_margin_rate,
                    self.input.consumer_margin_rate,
                    target,
                );
                let rate = match solved {
                    Ok(rate) => rate,
                    Err(e) if self.fallback == InverseFallback::Reject => {
                        warn!(target, error = %e, "Target price rejected");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(
                            target,
                            error = %e,
                            fallback_rate = inverse::FALLBACK_RATE,
                            "Target price unsolvable, using fallback rate"
                        );
                        inverse_error = Some(e);
                        inverse::FALLBACK_RATE
                    }
                };
                self.direction = SyncDirection::FromTargetEdit;
                self.target_price = Some(target);
                self.input.main_margin_rate = rate;
            }
            Edit::CostPrice(v) => self.begin_forward(Field::CostPrice, |i| i.cost_price = v),
            Edit::MainMarginRate(v) => {
                self.begin_forward(Field::MainMarginRate, |i| i.main_margin_rate = v)
            }
            Edit::WholesaleMarginRate(v) => {
                self.begin_forward(Field::WholesaleMarginRate, |i| i.wholesale_margin_rate = v)
            }
            Edit::ConsumerMarginRate(v) => {
                self.begin_forward(Field::ConsumerMarginRate, |i| i.consumer_margin_rate = v)
            }
        }

        self.revision += 1;
        let direction = self.direction;
        let result = self.propagate();

        info!(
            revision = self.revision,
            field = %edit.field(),
            value = edit.value(),
            direction = ?direction,
            ok = result.is_ok(),
            "Edit applied"
        );

        Ok(EditOutcome {
            revision: self.revision,
            direction,
            result,
            inverse_error,
        })
    }

    fn begin_forward(&mut self, field: Field, set: impl FnOnce(&mut PricingInput)) {
        set(&mut self.input);
        self.direction = SyncDirection::FromForwardEdit(field);
    }

    /// Recompute the ladder, mirror it into the target field if the edit
    /// came from the forward side, then go back to idle.
    fn propagate(&mut self) -> Result<PricingResult, PricingError> {
        let result = forward::compute(&self.input);

        match (&result, self.direction.mirrors_target()) {
            (Ok(r), true) => {
                let mirrored = mirrored_target(r.consumer_price);
                debug!(target = mirrored, "Mirroring consumer price into target field");
                self.target_price = Some(mirrored);
            }
            (Ok(_), false) => debug!("Target edit, mirror suppressed"),
            (Err(e), _) => debug!(error = %e, "Ladder unavailable, target field left as is"),
        }

        self.direction = SyncDirection::Idle;
        result
    }
}

/// The target field holds whole currency units.
fn mirrored_target(consumer_price: f64) -> f64 {
    consumer_price.round()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
