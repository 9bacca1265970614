//! HTTP admin API.
//!
//! Routes live under `/api/admin`. Every handler runs its gateway call on the
//! blocking pool, since the gateway does synchronous filesystem work. Errors
//! render as `{ "error": message }` with the status from
//! [`AdminError::status`].

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fable_store::model::Scene;
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::events::{ClientId, ClientRegistry};
use crate::gateway::{ManifestPatch, NewScene, StoryGateway};
use crate::AdminError;

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<StoryGateway>,
    pub events: Arc<ClientRegistry>,
}

impl AppState {
    /// `events` should be the registry the gateway publishes to.
    pub fn new(gateway: StoryGateway, events: Arc<ClientRegistry>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            events,
        }
    }

    /// Run `op` against the gateway on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T, AdminError>
    where
        F: FnOnce(&StoryGateway) -> Result<T, AdminError> + Send + 'static,
        T: Send + 'static,
    {
        let gateway = Arc::clone(&self.gateway);
        tokio::task::spawn_blocking(move || op(&gateway))
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?
    }
}

// =============================================================================
// ERRORS
// =============================================================================

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "admin request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "admin request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for AdminError {
    fn from(rejection: JsonRejection) -> Self {
        AdminError::Validation(rejection.body_text())
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Deserialize)]
pub struct LayoutQuery {
    /// Comma-separated ids of collapsed nodes.
    pub collapsed: Option<String>,
}

impl LayoutQuery {
    fn collapsed_ids(&self) -> Vec<String> {
        self.collapsed
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    pub after: String,
}

// =============================================================================
// STORY HANDLERS
// =============================================================================

/// GET /stories - List characters
async fn api_list_stories(State(state): State<AppState>) -> Result<Response, AdminError> {
    let list = state.run(|g| g.list_characters()).await?;
    Ok(Json(list).into_response())
}

/// POST /stories/:id - Create a character
async fn api_create_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AdminError> {
    let summary = state.run(move |g| g.create_character(&id)).await?;
    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

/// GET /stories/:id - Manifest and scenes
async fn api_get_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AdminError> {
    let story = state.run(move |g| g.get_story(&id)).await?;
    Ok(Json(story).into_response())
}

/// PUT /stories/:id/manifest - Merge manifest fields
async fn api_update_manifest(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ManifestPatch>, JsonRejection>,
) -> Result<Response, AdminError> {
    let Json(patch) = body?;
    let manifest = state.run(move |g| g.update_manifest(&id, patch)).await?;
    Ok(Json(manifest).into_response())
}

/// POST /stories/:id/normalize-names - Move scenes to canonical paths
async fn api_normalize_names(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AdminError> {
    let report = state.run(move |g| g.normalize_names(&id)).await?;
    Ok(Json(report).into_response())
}

/// GET /stories/:id/layout?collapsed=a,b - Tree layout
async fn api_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LayoutQuery>,
) -> Result<Response, AdminError> {
    let collapsed = query.collapsed_ids();
    let layout = state.run(move |g| g.layout(&id, &collapsed)).await?;
    Ok(Json(layout).into_response())
}

/// GET /stories/:id/search?q= - Scene search
async fn api_search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AdminError> {
    let hits = state.run(move |g| g.search(&id, &query.q)).await?;
    Ok(Json(hits).into_response())
}

/// GET /stories/:id/suggest-id?after= - Next id after a scene
async fn api_suggest_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SuggestQuery>,
) -> Result<Response, AdminError> {
    let suggested = state.run(move |g| g.suggest_id(&id, &query.after)).await?;
    Ok(Json(serde_json::json!({ "suggested": suggested })).into_response())
}

// =============================================================================
// SCENE HANDLERS
// =============================================================================

/// POST /stories/:id/scenes - Create a scene
async fn api_create_scene(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NewScene>, JsonRejection>,
) -> Result<Response, AdminError> {
    let Json(request) = body?;
    let entry = state.run(move |g| g.create_scene(&id, request)).await?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

/// GET /stories/:id/scenes/*path - Read a scene
async fn api_read_scene(
    State(state): State<AppState>,
    Path((id, file_path)): Path<(String, String)>,
) -> Result<Response, AdminError> {
    let entry = state.run(move |g| g.read_scene(&id, &file_path)).await?;
    Ok(Json(entry).into_response())
}

/// PUT /stories/:id/scenes/*path - Overwrite a scene
async fn api_update_scene(
    State(state): State<AppState>,
    Path((id, file_path)): Path<(String, String)>,
    body: Result<Json<Scene>, JsonRejection>,
) -> Result<Response, AdminError> {
    let Json(scene) = body?;
    let entry = state
        .run(move |g| g.update_scene(&id, &file_path, scene))
        .await?;
    Ok(Json(entry).into_response())
}

/// DELETE /stories/:id/scenes/*path - Delete a scene
async fn api_delete_scene(
    State(state): State<AppState>,
    Path((id, file_path)): Path<(String, String)>,
) -> Result<Response, AdminError> {
    let deleted = state.run(move |g| g.delete_scene(&id, &file_path)).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })).into_response())
}

// =============================================================================
// EVENTS
// =============================================================================

/// Unregisters its subscriber when the SSE stream is dropped.
struct Subscription {
    registry: Arc<ClientRegistry>,
    id: ClientId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// GET /events - Server-sent change events
async fn api_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.events.add();
    let subscription = Subscription {
        registry: Arc::clone(&state.events),
        id,
    };

    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _alive = &subscription;
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event(event.name()).data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// =============================================================================
// ROUTER
// =============================================================================

/// All admin routes, nested under `/api/admin`.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/stories", get(api_list_stories))
        .route("/stories/:id", get(api_get_story).post(api_create_story))
        .route("/stories/:id/manifest", put(api_update_manifest))
        .route("/stories/:id/scenes", post(api_create_scene))
        .route(
            "/stories/:id/scenes/*path",
            get(api_read_scene)
                .put(api_update_scene)
                .delete(api_delete_scene),
        )
        .route("/stories/:id/normalize-names", post(api_normalize_names))
        .route("/stories/:id/layout", get(api_layout))
        .route("/stories/:id/search", get(api_search))
        .route("/stories/:id/suggest-id", get(api_suggest_id))
        .route("/events", get(api_events))
        .with_state(state);

    Router::new().nest("/api/admin", admin_routes)
}
