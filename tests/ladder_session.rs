//! End-to-end checks across the session, commentary and dashboard.
//!
//! Uses an in-memory commentary service so no network access is needed.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use price_ladder::commentary::{request_commentary, CommentaryOutcome, CommentaryService};
use price_ladder::dashboard::build_router;
use price_ladder::dashboard::routes::DashboardState;
use price_ladder::engine::{compute, inverse_main_margin, InverseFallback, PricingSession};
use price_ladder::types::{Edit, PricingError, PricingInput};

/// A commentary service that records prompts and replays a fixed reply.
struct RecordingService {
    reply: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingService {
    fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: Mutex::new(reply.map(str::to_string)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentaryService for RecordingService {
    async fn comment(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("service offline"))
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

fn reference_input() -> PricingInput {
    PricingInput::new(55000.0, 30.0, 15.0, 20.0)
}

#[test]
fn reference_scenario_forward_then_target() {
    let mut session = PricingSession::new(reference_input(), InverseFallback::ZeroRate);
    let r = session.result().unwrap();
    assert!((r.consumer_price - 127100.84).abs() < 0.01);
    assert_eq!(session.target_price(), Some(127101.0));

    let out = session.apply(Edit::TargetPrice(150000.0)).unwrap();
    let r = out.result.unwrap();
    assert!((r.consumer_price - 150000.0).abs() < 1.0);
    assert_eq!(session.target_price(), Some(150000.0));
    assert!(session.input().main_margin_rate > 30.0);
}

#[test]
fn zero_cost_is_invalid_cost() {
    let err = compute(&PricingInput::new(0.0, 30.0, 15.0, 20.0)).unwrap_err();
    assert!(matches!(err, PricingError::InvalidCost { .. }));
}

#[test]
fn compat_inverse_returns_zero_for_bad_target() {
    assert_eq!(inverse_main_margin(55000.0, 15.0, 20.0, -1.0), 0.0);
}

#[test]
fn editing_every_field_keeps_target_in_step() {
    let mut session = PricingSession::new(reference_input(), InverseFallback::ZeroRate);
    let edits = [
        Edit::CostPrice(60000.0),
        Edit::MainMarginRate(25.0),
        Edit::WholesaleMarginRate(12.5),
        Edit::ConsumerMarginRate(18.0),
    ];
    for edit in edits {
        let out = session.apply(edit).unwrap();
        let consumer = out.result.unwrap().consumer_price;
        assert_eq!(session.target_price(), Some(consumer.round()));
    }
    assert_eq!(session.revision(), 4);
}

#[tokio::test]
async fn commentary_prompt_reflects_current_ladder() {
    let service = RecordingService::replying(Some("Competitive price."));
    let input = reference_input();
    let result = compute(&input).unwrap();

    let outcome = request_commentary(&service, input.cost_price, &result, "₩").await;
    assert!(outcome.is_ready());

    let prompts = service.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("₩127,101"));
    assert!(prompts[0].contains("56.73%"));
}

#[tokio::test]
async fn commentary_failure_is_not_retried() {
    let service = RecordingService::replying(None);
    let result = compute(&reference_input()).unwrap();

    let outcome = request_commentary(&service, 55000.0, &result, "₩").await;
    assert_eq!(
        outcome,
        CommentaryOutcome::Failed {
            message: "Commentary unavailable: service offline".to_string()
        }
    );
    assert_eq!(service.prompts().len(), 1);
}

#[tokio::test]
async fn dashboard_round_trip_through_http() {
    let service = Arc::new(RecordingService::replying(Some("Fine.")));
    let state = Arc::new(DashboardState::new(
        PricingSession::new(reference_input(), InverseFallback::ZeroRate),
        Some(service.clone() as Arc<dyn CommentaryService>),
        "₩",
    ));

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/edit")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"field":"target_price","value":150000}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/commentary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["revision"], 1);
    assert!(service.prompts()[0].contains("₩150,000"));

    let session = state.session.read().await;
    assert_eq!(session.target_price(), Some(150000.0));
}
