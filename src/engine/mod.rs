//! Pricing engine — forward ladder, inverse margin solve, edit sync.

pub mod forward;
pub mod inverse;
pub mod sync;

pub use forward::compute;
pub use inverse::{inverse_main_margin, solve_main_margin};
pub use sync::{EditOutcome, InverseFallback, PricingSession, SyncDirection};

/// Tax applied after the first stage. Not configurable.
pub const TAX_RATE: f64 = 0.10;

pub(crate) const TAX_MULTIPLIER: f64 = 1.0 + TAX_RATE;
