use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::advisor::{Advisor, UnknownAdvisorTag};
use crate::client::{AdvisorClient, HttpAdvisorClient};
use crate::config::AppConfig;
use crate::error::SubmitError;
use crate::render;
use crate::widget::{ChatWidget, WidgetState, WidgetStore};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let registry = config.registry()?;
    for advisor in registry.advisors() {
        info!(
            name: "advisor.configured",
            advisor = %advisor,
            style = ?registry.style(),
            endpoint = %registry.endpoint(advisor).map(|u| u.to_string()).unwrap_or_default(),
            "Advisor configured"
        );
    }

    let client: Arc<dyn AdvisorClient> =
        Arc::new(HttpAdvisorClient::new(registry, config.client_timeout())?);

    let state = AppState {
        widgets: WidgetStore::new(client, config.widget_idle_timeout()),
        view: Arc::new(config.view()),
        config: Arc::clone(&config),
    };

    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/widgets/{id}", get(show_widget).delete(unmount_widget))
        .route("/widgets/{id}/ask", post(ask))
        .route("/widgets/{id}/excerpts/close", post(close_excerpt))
        .route("/widgets/{id}/excerpts/{index}", get(open_excerpt))
        .route("/api/widgets/{id}", get(api_get_widget))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Handler errors mapped to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("widget not found")]
    WidgetNotFound,
    #[error("excerpt not found")]
    ExcerptNotFound,
    #[error(transparent)]
    BadAdvisor(#[from] UnknownAdvisorTag),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::WidgetNotFound | Self::ExcerptNotFound => StatusCode::NOT_FOUND,
            Self::BadAdvisor(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

fn widget(state: &AppState, id: &str) -> Result<ChatWidget, ServerError> {
    state.widgets.get(id).ok_or(ServerError::WidgetNotFound)
}

/// htmx requests swap `#results` only; everything else gets the full page.
fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|value| value.as_bytes() == b"true")
}

fn render_widget(state: &AppState, widget: &ChatWidget, snapshot: &WidgetState, fragment: bool) -> Html<String> {
    if fragment {
        Html(render::results(&state.view, widget.id(), snapshot))
    } else {
        Html(render::page(&state.view, widget.id(), snapshot, &widget.advisors()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Mount a fresh widget.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let widget = state.widgets.mount();
    info!(name: "widget.mounted", widget_id = %widget.id(), "Widget mounted");
    render_widget(&state, &widget, &widget.snapshot(), false)
}

/// GET /widgets/:id - Re-render a mounted widget.
async fn show_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ServerError> {
    let widget = widget(&state, &id)?;
    Ok(render_widget(&state, &widget, &widget.snapshot(), false))
}

/// Form body for a question.
#[derive(Debug, Deserialize)]
struct AskForm {
    #[serde(default)]
    query: String,
    /// Absent when only one advisor is offered.
    #[serde(default)]
    advisor: Option<String>,
}

/// POST /widgets/:id/ask - Submit a question.
async fn ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Result<Response, ServerError> {
    let widget = widget(&state, &id)?;
    let advisor = match form.advisor.as_deref().map(str::trim) {
        Some(tag) if !tag.is_empty() => tag.parse::<Advisor>()?,
        _ => widget.snapshot().advisor,
    };
    let fragment = is_htmx(&headers);

    match widget.submit(form.query.clone(), advisor).await {
        Ok(snapshot) => Ok(render_widget(&state, &widget, &snapshot, fragment).into_response()),
        Err(SubmitError::EmptyQuery) => {
            widget.select_advisor(advisor);
            let snapshot = widget.edit_query(form.query);
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                render_widget(&state, &widget, &snapshot, fragment),
            )
                .into_response())
        }
    }
}

/// GET /widgets/:id/excerpts/:index - Open an excerpt overlay.
async fn open_excerpt(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    headers: HeaderMap,
) -> Result<Html<String>, ServerError> {
    let widget = widget(&state, &id)?;
    widget
        .select_excerpt(index)
        .ok_or(ServerError::ExcerptNotFound)?;
    Ok(render_widget(&state, &widget, &widget.snapshot(), is_htmx(&headers)))
}

/// POST /widgets/:id/excerpts/close - Dismiss the overlay.
async fn close_excerpt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Html<String>, ServerError> {
    let widget = widget(&state, &id)?;
    let snapshot = widget.close_excerpt();
    Ok(render_widget(&state, &widget, &snapshot, is_htmx(&headers)))
}

/// DELETE /widgets/:id - Unmount a widget.
async fn unmount_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.widgets.unmount(&id) {
        info!(name: "widget.unmounted", widget_id = %id, "Widget unmounted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::WidgetNotFound)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Widget DTO for API responses.
#[derive(Debug, Serialize)]
struct WidgetDto {
    id: String,
    #[serde(flatten)]
    state: WidgetState,
}

/// GET /api/widgets/:id - Snapshot of widget state.
async fn api_get_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetDto>, ServerError> {
    let widget = widget(&state, &id)?;
    Ok(Json(WidgetDto {
        id: widget.id().to_string(),
        state: widget.snapshot(),
    }))
}
