use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use mip_core::client::{DashboardApi, FetchError};
use mip_core::config::Settings;
use mip_core::explain::{self, sections, ExplainCenter, ExplainContextPatch, ExplainHandle, ExplainMode};
use mip_core::glossary::tooltip::{resolve_tooltip, TooltipVariant};
use mip_core::glossary::GlossaryStore;
use mip_core::poll::{LiveHeader, StatusBanner};
use mip_core::suggestions::filter::SuggestionFilter;
use mip_core::time::timestamps;
use mip_core::views::suggestions::{self as suggestions_view, EvidenceSelection, SuggestionsView};
use mip_core::views::today::{self, TodayView};
use mip_core::views::training::{self, TrainingView};
use mip_core::views::{Page, ViewState};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DashboardApi>,
    pub explain: ExplainHandle,
    pub mode: ExplainMode,
    pub glossary: Arc<GlossaryStore>,
    pub settings: Arc<Settings>,
    pub status: watch::Receiver<StatusBanner>,
    pub live: watch::Receiver<LiveHeader>,
    pub pages: Arc<Pages>,
}

/// Last good snapshot of each backend-fed view. Suggestions are cached unfiltered.
#[derive(Debug, Default)]
pub struct Pages {
    pub suggestions: Page<SuggestionsView>,
    pub today: Page<TodayView>,
    pub training: Page<TrainingView>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/views/status", get(get_status))
        .route("/views/live", get(get_live))
        .route("/views/suggestions", get(get_suggestions))
        .route("/views/suggestions/evidence", get(get_evidence))
        .route("/views/today", get(get_today))
        .route("/views/training", get(get_training))
        .route("/glossary/:key", get(get_glossary))
        .route("/explain", get(get_explain))
        .route("/explain/context", put(put_explain_context))
        .route("/explain/open", post(open_explain))
        .route("/explain/close", post(close_explain))
        .route("/explain/sections/:id", post(explain_section))
        .route("/explain-mode", get(get_explain_mode).put(put_explain_mode))
        .with_state(state)
}

/// Handler failure. Backend fetch failures surface as 502 carrying the status text.
#[derive(Debug)]
pub enum ApiError {
    Fetch(FetchError),
    /// A page refresh failed and there is no earlier snapshot to fall back on.
    NoSnapshot(String),
    NotFound(String),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Fetch(err) => {
                tracing::warn!(error = %err, "backend fetch failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            Self::NoSnapshot(error) => {
                tracing::warn!(%error, "view unavailable");
                (StatusCode::BAD_GATEWAY, error)
            }
            Self::NotFound(what) => (StatusCode::NOT_FOUND, what),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatusView {
    #[serde(flatten)]
    banner: StatusBanner,
    headline: String,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusView> {
    let banner = state.status.borrow().clone();
    Json(StatusView {
        headline: banner.headline().to_string(),
        banner,
    })
}

#[derive(Debug, Serialize)]
struct LiveView {
    #[serde(flatten)]
    header: LiveHeader,
    updated: String,
    last_run_age: String,
    last_brief_age: String,
}

async fn get_live(State(state): State<AppState>) -> Json<LiveView> {
    let header = state.live.borrow().clone();
    let now = Utc::now();
    let metrics = header.metrics.as_ref();
    let last_run_age = timestamps::age_of(
        metrics
            .and_then(|m| m.last_run.as_ref())
            .and_then(|r| r.finished_at.as_deref().or(r.started_at.as_deref())),
        now,
    );
    let last_brief_age = timestamps::age_of(
        metrics
            .and_then(|m| m.last_brief.as_ref())
            .and_then(|b| b.created_at.as_deref()),
        now,
    );
    let updated = header
        .seconds_since_update
        .map(timestamps::age_label)
        .unwrap_or_else(|| mip_core::format::PLACEHOLDER.to_string());

    Json(LiveView {
        header,
        updated,
        last_run_age,
        last_brief_age,
    })
}

/// Refreshes `page` and returns its state. A refresh superseded by a concurrent request
/// waits for that request's result instead.
async fn refreshed<T, F>(page: &Page<T>, fetch: F) -> ViewState<T>
where
    T: Clone,
    F: Future<Output = Result<T, FetchError>>,
{
    if !page.refresh(fetch).await {
        let mut rx = page.subscribe();
        if let Ok(state) = rx.wait_for(|s| !s.loading).await {
            return state.clone();
        };
    }
    page.state()
}

fn page_response<T>(state: ViewState<T>) -> Result<Json<ViewState<T>>, ApiError> {
    if state.data.is_none() {
        let error = state
            .error
            .unwrap_or_else(|| "view has not loaded yet".to_string());
        return Err(ApiError::NoSnapshot(error));
    }
    Ok(Json(state))
}

async fn get_suggestions(
    State(state): State<AppState>,
    Query(filter): Query<SuggestionFilter>,
) -> Result<Json<ViewState<SuggestionsView>>, ApiError> {
    let api = state.api.as_ref();
    let page = refreshed(
        &state.pages.suggestions,
        suggestions_view::load_suggestions(api, SuggestionFilter::default()),
    )
    .await;
    page_response(page.map(|view| view.with_filter(filter)))
}

async fn get_evidence(
    State(state): State<AppState>,
    Query(selection): Query<EvidenceSelection>,
) -> Result<Json<suggestions_view::EvidenceView>, ApiError> {
    let label = format!(
        "{}|{}|{}",
        selection.market_type, selection.symbol, selection.pattern_id
    );
    suggestions_view::load_evidence(
        state.api.as_ref(),
        selection,
        state.settings.distribution_limit,
        state.settings.histogram_bins,
    )
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("no current candidate for {label}")))
}

#[derive(Debug, Default, Deserialize)]
struct TodayQuery {
    #[serde(default)]
    portfolio_id: Option<String>,
}

async fn get_today(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<ViewState<TodayView>>, ApiError> {
    let portfolio_id = query
        .portfolio_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .or_else(|| state.settings.portfolio_id.clone());
    let mut page = refreshed(
        &state.pages.today,
        today::load_today(state.api.as_ref(), portfolio_id.as_deref()),
    )
    .await;
    // A snapshot for another portfolio is not a fallback for this one.
    if page.data.as_ref().is_some_and(|v| v.portfolio_id != portfolio_id) {
        page.data = None;
        page.updated_at = None;
    }
    page_response(page)
}

async fn get_training(
    State(state): State<AppState>,
) -> Result<Json<ViewState<TrainingView>>, ApiError> {
    let page = refreshed(
        &state.pages.training,
        training::load_training(state.api.as_ref()),
    )
    .await;
    page_response(page)
}

#[derive(Debug, Default, Deserialize)]
struct GlossaryQuery {
    #[serde(default)]
    variant: TooltipVariant,
}

async fn get_glossary(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GlossaryQuery>,
) -> Response {
    match resolve_tooltip(&state.mode, &state.glossary, &key, query.variant) {
        Some(tooltip) => Json(tooltip).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn get_explain(State(state): State<AppState>) -> Response {
    match explain::drawer_view(&state.explain, &state.mode, &state.glossary) {
        Some(drawer) => Json(drawer).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn put_explain_context(
    State(state): State<AppState>,
    Json(patch): Json<ExplainContextPatch>,
) -> Json<ExplainCenter> {
    state.explain.set_context(patch);
    Json(state.explain.snapshot())
}

async fn open_explain(State(state): State<AppState>) -> Json<ExplainCenter> {
    state.explain.open();
    Json(state.explain.snapshot())
}

async fn close_explain(State(state): State<AppState>) -> Json<ExplainCenter> {
    state.explain.close();
    Json(state.explain.snapshot())
}

async fn explain_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExplainCenter>, ApiError> {
    let context = sections::section_context(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown section {id}")))?;
    state.explain.activate(context);
    Ok(Json(state.explain.snapshot()))
}

#[derive(Debug, Serialize, Deserialize)]
struct ExplainModeBody {
    enabled: bool,
}

async fn get_explain_mode(State(state): State<AppState>) -> Json<ExplainModeBody> {
    Json(ExplainModeBody {
        enabled: state.mode.is_enabled(),
    })
}

async fn put_explain_mode(
    State(state): State<AppState>,
    Json(body): Json<ExplainModeBody>,
) -> Json<ExplainModeBody> {
    state.mode.set(body.enabled);
    tracing::info!(enabled = body.enabled, "explain mode changed");
    Json(ExplainModeBody {
        enabled: state.mode.is_enabled(),
    })
}
