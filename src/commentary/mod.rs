//! Natural-language commentary on a finished price ladder.
//!
//! Defines the `CommentaryService` trait, the deterministic prompt built
//! from a [`PricingResult`], and HTTP providers for OpenRouter and
//! Anthropic. Commentary is display-only: nothing here reads or writes
//! session state, and failures are never retried.

pub mod anthropic;
pub mod openrouter;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, CommentaryConfig};
use crate::format::{format_currency, format_rate};
use crate::types::PricingResult;

use anthropic::AnthropicClient;
use openrouter::OpenRouterClient;

/// Abstraction over a text-generation backend.
///
/// Implementors send a prompt and return the generated text. The caller
/// decides what counts as a usable response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentaryService: Send + Sync {
    /// Generate commentary for `prompt`.
    async fn comment(&self, prompt: &str) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

/// What the presentation layer shows for a commentary request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommentaryOutcome {
    Ready { text: String, model: String },
    Failed { message: String },
}

impl CommentaryOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Fixed instructions for the advisor persona.
pub fn system_prompt() -> &'static str {
    "You are a retail pricing advisor. You review a product's price ladder \
     (cost, supply, wholesale and consumer prices with their margins) and \
     comment on whether the final consumer price and overall margin look \
     competitive and sustainable.\n\n\
     RULES:\n\
     1. Use only the figures given; do not invent market data.\n\
     2. Keep the commentary under 150 words.\n\
     3. End with one concrete suggestion."
}

/// Build the user prompt for a ladder. Same inputs always give the same text.
pub fn build_prompt(cost_price: f64, result: &PricingResult, currency_symbol: &str) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str("Please review this price ladder.\n\n");
    prompt.push_str(&format!(
        "COST PRICE: {}\n",
        format_currency(cost_price, currency_symbol)
    ));
    prompt.push_str(&format!(
        "CONSUMER PRICE: {}\n",
        format_currency(result.consumer_price, currency_symbol)
    ));
    prompt.push_str(&format!(
        "FINAL MARGIN RATE: {}\n",
        format_rate(result.final_margin_rate)
    ));
    prompt.push_str(&format!(
        "TOTAL MARGIN AMOUNT: {}\n",
        format_currency(result.total_margin_amount, currency_symbol)
    ));
    prompt.push_str("\nIs this consumer price reasonable for the margin it carries?\n");

    prompt
}

/// Ask `service` for commentary on a ladder.
///
/// Errors and blank responses both become [`CommentaryOutcome::Failed`].
pub async fn request_commentary(
    service: &dyn CommentaryService,
    cost_price: f64,
    result: &PricingResult,
    currency_symbol: &str,
) -> CommentaryOutcome {
    let prompt = build_prompt(cost_price, result, currency_symbol);
    let model = service.model_name().to_string();

    match service.comment(&prompt).await {
        Ok(text) if !text.trim().is_empty() => {
            info!(model = %model, chars = text.len(), "Commentary received");
            CommentaryOutcome::Ready {
                text: text.trim().to_string(),
                model,
            }
        }
        Ok(_) => {
            warn!(model = %model, "Commentary service returned an empty response");
            CommentaryOutcome::Failed {
                message: "Commentary service returned an empty response".to_string(),
            }
        }
        Err(e) => {
            warn!(model = %model, error = %e, "Commentary request failed");
            CommentaryOutcome::Failed {
                message: format!("Commentary unavailable: {e}"),
            }
        }
    }
}

/// Build the configured provider, or `None` when commentary is disabled or
/// no API key is available.
pub fn build_service(cfg: &CommentaryConfig) -> Result<Option<Arc<dyn CommentaryService>>> {
    if !cfg.enabled {
        info!("Commentary disabled in config");
        return Ok(None);
    }

    let api_key = match AppConfig::resolve_secret(&cfg.api_key_env) {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "No commentary API key configured — commentary unavailable");
            return Ok(None);
        }
    };

    let service: Arc<dyn CommentaryService> = match cfg.provider.as_str() {
        "anthropic" => {
            info!(model = %cfg.model, "Using Anthropic commentary provider");
            Arc::new(AnthropicClient::new(
                api_key,
                Some(cfg.model.clone()),
                Some(cfg.max_tokens),
                cfg.timeout_secs,
            )?)
        }
        "openrouter" => {
            info!(model = %cfg.model, "Using OpenRouter commentary provider");
            Arc::new(OpenRouterClient::new(
                api_key,
                Some(cfg.model.clone()),
                Some(cfg.max_tokens),
                cfg.timeout_secs,
            )?)
        }
        other => {
            warn!(provider = other, "Unknown commentary provider, defaulting to OpenRouter");
            Arc::new(OpenRouterClient::new(
                api_key,
                Some(cfg.model.clone()),
                Some(cfg.max_tokens),
                cfg.timeout_secs,
            )?)
        }
    };

    Ok(Some(service))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
