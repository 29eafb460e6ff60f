//! Price ladder — interactive retail pricing.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the pricing session and commentary provider, and serves the
//! dashboard until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use price_ladder::commentary;
use price_ladder::config;
use price_ladder::dashboard::{self, routes::DashboardState};
use price_ladder::engine::PricingSession;
use price_ladder::format::LadderSummary;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("LADDER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    let session = PricingSession::new(cfg.session.defaults, cfg.session.inverse_fallback);
    info!(
        input = %session.input(),
        inverse_fallback = ?session.fallback(),
        currency = %cfg.session.currency_symbol,
        "Pricing session started"
    );

    match session.result() {
        Ok(result) => {
            let summary = LadderSummary::new(session.input(), &result, &cfg.session.currency_symbol);
            info!("Initial ladder:\n{summary}");
        }
        Err(e) => warn!(error = %e, "Initial ladder unavailable"),
    }

    if !cfg.dashboard.enabled {
        info!("Dashboard disabled — nothing left to do");
        return Ok(());
    }

    let service = commentary::build_service(&cfg.commentary)?;
    let state = Arc::new(DashboardState::new(
        session,
        service,
        cfg.session.currency_symbol.clone(),
    ));

    dashboard::serve(state, cfg.dashboard.port, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    })
    .await?;

    info!("Price ladder shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("price_ladder=info"));

    let json_logging = std::env::var("LADDER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
