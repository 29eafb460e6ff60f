//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Edits take the session write lock for the whole edit, so they are
//! applied one at a time. Commentary requests copy what they need and
//! release the lock before calling out.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::commentary::{request_commentary, CommentaryOutcome, CommentaryService};
use crate::engine::inverse::round_rate_for_display;
use crate::engine::{PricingSession, SyncDirection};
use crate::format::LadderSummary;
use crate::types::{Edit, PricingError, PricingInput, PricingResult};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub session: RwLock<PricingSession>,
    pub commentary: RwLock<Option<CommentaryRecord>>,
    pub service: Option<Arc<dyn CommentaryService>>,
    pub currency_symbol: String,
}

impl DashboardState {
    pub fn new(
        session: PricingSession,
        service: Option<Arc<dyn CommentaryService>>,
        currency_symbol: impl Into<String>,
    ) -> Self {
        Self {
            session: RwLock::new(session),
            commentary: RwLock::new(None),
            service,
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Keep `record` unless commentary for a later revision is already stored.
    /// Returns whether it was stored.
    pub async fn store_commentary(&self, record: CommentaryRecord) -> bool {
        let mut slot = self.commentary.write().await;
        if slot.as_ref().is_some_and(|existing| existing.revision > record.revision) {
            debug!(
                request_id = %record.request_id,
                revision = record.revision,
                "Discarding commentary for an older revision"
            );
            return false;
        }
        *slot = Some(record);
        true
    }
}

/// The latest commentary and the session revision it was generated for.
#[derive(Debug, Clone)]
pub struct CommentaryRecord {
    pub request_id: String,
    pub revision: u64,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub outcome: CommentaryOutcome,
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorView {
    pub kind: String,
    pub message: String,
}

impl From<&PricingError> for ErrorView {
    fn from(e: &PricingError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub revision: u64,
    pub input: PricingInput,
    /// Main margin as shown to the user (two decimals).
    pub main_margin_display: f64,
    pub target_price: Option<f64>,
    pub result: Option<PricingResult>,
    pub error: Option<ErrorView>,
    pub summary: Option<LadderSummary>,
}

impl SessionSnapshot {
    pub fn capture(session: &PricingSession, currency_symbol: &str) -> Self {
        let input = *session.input();
        let (result, error, summary) = match session.result() {
            Ok(r) => (
                Some(r),
                None,
                Some(LadderSummary::new(&input, &r, currency_symbol)),
            ),
            Err(e) => (None, Some(ErrorView::from(&e)), None),
        };
        Self {
            revision: session.revision(),
            input,
            main_margin_display: round_rate_for_display(input.main_margin_rate),
            target_price: session.target_price(),
            result,
            error,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditResponse {
    /// Which side the edit was propagated from.
    pub direction: SyncDirection,
    pub snapshot: SessionSnapshot,
    pub inverse_error: Option<ErrorView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentaryView {
    pub request_id: String,
    pub revision: u64,
    /// The session has been edited since this commentary was requested.
    pub stale: bool,
    pub generated_at: String,
    #[serde(flatten)]
    pub outcome: CommentaryOutcome,
}

impl CommentaryView {
    fn from_record(record: &CommentaryRecord, current_revision: u64) -> Self {
        Self {
            request_id: record.request_id.clone(),
            revision: record.revision,
            stale: record.revision != current_revision,
            generated_at: record.generated_at.to_rfc3339(),
            outcome: record.outcome.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorView>);

fn api_error(status: StatusCode, kind: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorView {
            kind: kind.to_string(),
            message: message.into(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let session = state.session.read().await;
    Json(SessionSnapshot::capture(&session, &state.currency_symbol))
}

/// POST /api/edit
pub async fn post_edit(
    State(state): State<AppState>,
    Json(edit): Json<Edit>,
) -> Result<Json<EditResponse>, ApiError> {
    let mut session = state.session.write().await;
    let outcome = session
        .apply(edit)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorView::from(&e))))?;

    Ok(Json(EditResponse {
        direction: outcome.direction,
        snapshot: SessionSnapshot::capture(&session, &state.currency_symbol),
        inverse_error: outcome.inverse_error.as_ref().map(ErrorView::from),
    }))
}

/// POST /api/commentary
pub async fn post_commentary(
    State(state): State<AppState>,
) -> Result<Json<CommentaryView>, ApiError> {
    let Some(service) = state.service.clone() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "commentary_unavailable",
            "No commentary service configured",
        ));
    };

    let (revision, cost_price, result) = {
        let session = state.session.read().await;
        let result = session
            .result()
            .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorView::from(&e))))?;
        (session.revision(), session.input().cost_price, result)
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    info!(request_id = %request_id, revision, "Commentary requested");

    let outcome =
        request_commentary(service.as_ref(), cost_price, &result, &state.currency_symbol).await;

    let record = CommentaryRecord {
        request_id,
        revision,
        generated_at: chrono::Utc::now(),
        outcome,
    };
    let current_revision = state.session.read().await.revision();
    let view = CommentaryView::from_record(&record, current_revision);
    state.store_commentary(record).await;

    Ok(Json(view))
}

/// GET /api/commentary
pub async fn get_commentary(
    State(state): State<AppState>,
) -> Result<Json<CommentaryView>, ApiError> {
    let current_revision = state.session.read().await.revision();
    let commentary = state.commentary.read().await;
    commentary
        .as_ref()
        .map(|record| Json(CommentaryView::from_record(record, current_revision)))
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "no_commentary",
                "No commentary has been requested yet",
            )
        })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::MockCommentaryService;
    use crate::engine::InverseFallback;

    fn session(fallback: InverseFallback) -> PricingSession {
        PricingSession::new(PricingInput::new(55000.0, 30.0, 15.0, 20.0), fallback)
    }

    fn state_with(service: Option<Arc<dyn CommentaryService>>) -> AppState {
        Arc::new(DashboardState::new(
            session(InverseFallback::ZeroRate),
            service,
            "₩",
        ))
    }

    fn ok_service(text: &'static str) -> Arc<dyn CommentaryService> {
        let mut mock = MockCommentaryService::new();
        mock.expect_model_name().return_const("test-model".to_string());
        mock.expect_comment().returning(move |_| Ok(text.to_string()));
        Arc::new(mock)
    }

    #[test]
    fn test_snapshot_valid_session() {
        let snap = SessionSnapshot::capture(&session(InverseFallback::ZeroRate), "₩");
        assert_eq!(snap.revision, 0);
        assert_eq!(snap.target_price, Some(127101.0));
        assert!(snap.result.is_some());
        assert!(snap.error.is_none());
        assert!(snap.summary.is_some());
    }

    #[test]
    fn test_snapshot_invalid_session_hides_derived_fields() {
        let mut s = session(InverseFallback::ZeroRate);
        s.apply(Edit::CostPrice(0.0)).unwrap();
        let snap = SessionSnapshot::capture(&s, "₩");
        assert!(snap.result.is_none());
        assert!(snap.summary.is_none());
        assert_eq!(snap.error.unwrap().kind, "invalid_cost");
    }

    #[test]
    fn test_snapshot_rounds_main_margin_for_display() {
        let mut s = session(InverseFallback::ZeroRate);
        s.apply(Edit::TargetPrice(150000.0)).unwrap();
        let snap = SessionSnapshot::capture(&s, "₩");
        assert_eq!(snap.main_margin_display, 40.69);
        assert_ne!(snap.input.main_margin_rate, 40.69);
    }

    #[tokio::test]
    async fn test_post_edit_target_reports_fallback() {
        let state = state_with(None);
        let Json(resp) = post_edit(State(state), Json(Edit::TargetPrice(-5.0)))
            .await
            .unwrap();
        assert_eq!(resp.snapshot.input.main_margin_rate, 0.0);
        assert_eq!(resp.inverse_error.unwrap().kind, "inverse_unsolvable");
    }

    #[tokio::test]
    async fn test_post_edit_reject_mode_is_422() {
        let state = Arc::new(DashboardState::new(
            session(InverseFallback::Reject),
            None,
            "₩",
        ));
        let err = post_edit(State(state.clone()), Json(Edit::TargetPrice(0.0)))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.session.read().await.revision(), 0);
    }

    #[tokio::test]
    async fn test_post_commentary_without_service() {
        let err = post_commentary(State(state_with(None))).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_post_commentary_invalid_ladder() {
        let state = state_with(Some(ok_service("unused")));
        state
            .session
            .write()
            .await
            .apply(Edit::ConsumerMarginRate(100.0))
            .unwrap();
        let err = post_commentary(State(state)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.1.kind, "invalid_margin");
    }

    #[tokio::test]
    async fn test_commentary_goes_stale_after_edit() {
        let state = state_with(Some(ok_service("Healthy margin.")));
        let Json(view) = post_commentary(State(state.clone())).await.unwrap();
        assert!(!view.stale);
        assert!(view.outcome.is_ready());

        post_edit(State(state.clone()), Json(Edit::MainMarginRate(35.0)))
            .await
            .unwrap();
        let Json(view) = get_commentary(State(state)).await.unwrap();
        assert!(view.stale);
    }

    #[tokio::test]
    async fn test_failed_commentary_leaves_session_alone() {
        let mut mock = MockCommentaryService::new();
        mock.expect_model_name().return_const("test-model".to_string());
        mock.expect_comment()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        let state = state_with(Some(Arc::new(mock)));

        let before = *state.session.read().await.input();
        let Json(view) = post_commentary(State(state.clone())).await.unwrap();
        assert!(matches!(view.outcome, CommentaryOutcome::Failed { .. }));
        assert_eq!(*state.session.read().await.input(), before);
        assert_eq!(state.session.read().await.revision(), 0);
    }

    fn record(request_id: &str, revision: u64) -> CommentaryRecord {
        CommentaryRecord {
            request_id: request_id.into(),
            revision,
            generated_at: chrono::Utc::now(),
            outcome: CommentaryOutcome::Ready {
                text: "ok".into(),
                model: "m".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_late_commentary_for_older_revision_is_discarded() {
        let state = state_with(Some(ok_service("Late reply.")));
        assert!(state.store_commentary(record("newer", 5)).await);

        let Json(view) = post_commentary(State(state.clone())).await.unwrap();
        assert_eq!(view.revision, 0);

        let stored = state.commentary.read().await;
        let stored = stored.as_ref().unwrap();
        assert_eq!(stored.request_id, "newer");
        assert_eq!(stored.revision, 5);
    }

    #[tokio::test]
    async fn test_store_commentary_replaces_same_or_older_revision() {
        let state = state_with(None);
        assert!(state.store_commentary(record("first", 2)).await);
        assert!(state.store_commentary(record("second", 2)).await);
        assert!(!state.store_commentary(record("stale", 1)).await);
        assert!(state.store_commentary(record("third", 3)).await);
        assert_eq!(
            state.commentary.read().await.as_ref().unwrap().request_id,
            "third"
        );
    }

    #[tokio::test]
    async fn test_get_commentary_none_yet() {
        let err = get_commentary(State(state_with(None))).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_commentary_view_serializes_flat() {
        let json = serde_json::to_value(CommentaryView::from_record(&record("r1", 3), 3)).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["text"], "ok");
        assert_eq!(json["stale"], false);
    }
}
