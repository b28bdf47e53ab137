//! Route table and handlers for the Keepsake API.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use keepsake_engine::present::{context_view, digest_view, Shape};
use keepsake_types::config::WakeTuning;
use keepsake_types::error::KeepsakeError;
use keepsake_types::observation::{
    AgentId, EmotionVector, NewObservation, ObservationId, ObservationKind, ObservationPatch,
};
use keepsake_types::retrieval::WakeRequest;
use keepsake_types::store::RecordStore;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    /// The record store behind the retrieval pipeline.
    pub store: Arc<dyn RecordStore>,
    /// The standing-document store.
    pub docs: keepsake_store::DocStore,
    /// Retrieval tuning, fixed at process start.
    pub tuning: WakeTuning,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/agents/{agent}/wake", get(wake))
        .route(
            "/api/agents/{agent}/observations",
            post(create_observation).get(list_observations),
        )
        .route("/api/agents/{agent}/superseded", get(list_superseded))
        .route(
            "/api/observations/{id}",
            get(get_observation)
                .patch(patch_observation)
                .delete(delete_observation),
        )
        .route("/api/observations/{id}/pin", post(pin_observation))
        .route("/api/observations/{id}/supersede", post(supersede_observation))
        .route(
            "/api/agents/{agent}/docs/{key}",
            get(get_doc).put(put_doc).delete(delete_doc),
        )
        .route("/api/agents/{agent}/docs", get(list_docs))
        .with_state(state)
}

/// Handler-level error: a Keepsake error plus its HTTP mapping.
struct ApiError(KeepsakeError);

impl From<KeepsakeError> for ApiError {
    fn from(err: KeepsakeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            KeepsakeError::Validation(_) | KeepsakeError::Serialization(_) => {
                (StatusCode::BAD_REQUEST, "validation".to_string())
            }
            KeepsakeError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found".to_string()),
            KeepsakeError::Supersession(e) => (StatusCode::CONFLICT, e.code().to_string()),
            KeepsakeError::Storage(_)
            | KeepsakeError::Config(_)
            | KeepsakeError::Io(_)
            | KeepsakeError::Internal(_) => {
                tracing::error!(error = %self.0, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal".to_string())
            }
        };
        let body = Json(json!({ "code": code, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn not_found(what: &str) -> ApiError {
    ApiError(KeepsakeError::NotFound(what.to_string()))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct WakeParams {
    limit: Option<usize>,
    hot: Option<bool>,
    explain: Option<bool>,
    lens: Option<String>,
    shape: Option<String>,
}

async fn wake(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Query(params): Query<WakeParams>,
) -> ApiResult<Response> {
    let request = WakeRequest {
        agent_id: AgentId::from(agent),
        limit: params.limit,
        hot: params.hot.unwrap_or(true),
        explain: params.explain.unwrap_or(false),
        lens: params.lens,
    };
    let result = keepsake_engine::wake(state.store.as_ref(), &state.tuning, &request, Utc::now())?;
    let shape = params.shape.as_deref().map(Shape::parse).unwrap_or_default();
    Ok(match shape {
        Shape::Full => Json(result).into_response(),
        Shape::Context => Json(context_view(&result)).into_response(),
        Shape::Digest => Json(digest_view(&result)).into_response(),
    })
}

/// Creation payload; the agent comes from the path.
#[derive(Debug, Deserialize)]
struct CreateObservationBody {
    author: String,
    #[serde(default)]
    perspective: String,
    #[serde(default)]
    kind: ObservationKind,
    content: String,
    #[serde(default)]
    salience: i64,
    #[serde(default)]
    emotions: EmotionVector,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    source_platform: Option<String>,
    #[serde(default)]
    source_ref: Option<String>,
}

async fn create_observation(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Json(body): Json<CreateObservationBody>,
) -> ApiResult<Response> {
    let new = NewObservation {
        agent_id: AgentId::from(agent),
        author: body.author,
        perspective: body.perspective,
        kind: body.kind,
        content: body.content,
        salience: body.salience,
        emotions: body.emotions,
        pinned: body.pinned,
        source_platform: body.source_platform,
        source_ref: body.source_ref,
    };
    new.validate()?;
    let obs = new.into_observation(Utc::now());
    state.store.insert(&obs)?;
    tracing::info!(agent = %obs.agent_id, id = %obs.id, "observation created");
    Ok((StatusCode::CREATED, Json(obs)).into_response())
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_observations(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    let rows = state
        .store
        .recent_for_agent(&agent, params.limit.unwrap_or(50))?;
    Ok(Json(rows).into_response())
}

async fn list_superseded(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    let rows = state
        .store
        .superseded_for_agent(&agent, params.limit.unwrap_or(50))?;
    Ok(Json(rows).into_response())
}

async fn get_observation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = ObservationId::parse(&id)?;
    let obs = state.store.get(&id)?.ok_or_else(|| not_found("observation"))?;
    Ok(Json(obs).into_response())
}

async fn patch_observation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ObservationPatch>,
) -> ApiResult<Response> {
    let id = ObservationId::parse(&id)?;
    if patch.is_empty() {
        return Err(KeepsakeError::Validation("patch carries no fields".into()).into());
    }
    patch.validate()?;
    let applied = state
        .store
        .apply_patch(&id, &patch, state.tuning.reinforce_bonus, Utc::now())?;
    if !applied {
        return Err(not_found("observation"));
    }
    let obs = state.store.get(&id)?.ok_or_else(|| not_found("observation"))?;
    Ok(Json(obs).into_response())
}

#[derive(Debug, Deserialize)]
struct PinBody {
    pinned: bool,
}

async fn pin_observation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PinBody>,
) -> ApiResult<Response> {
    let id = ObservationId::parse(&id)?;
    if !state.store.set_pinned(&id, body.pinned, Utc::now())? {
        return Err(not_found("observation"));
    }
    Ok(Json(json!({ "id": id, "pinned": body.pinned })).into_response())
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    hard: Option<bool>,
}

async fn delete_observation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Response> {
    let id = ObservationId::parse(&id)?;
    let removed = if params.hard.unwrap_or(false) {
        state.store.hard_delete(&id)?
    } else {
        state.store.soft_delete(&id, Utc::now())?
    };
    if !removed {
        return Err(not_found("observation"));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct SupersedeBody {
    superseding_id: String,
}

async fn supersede_observation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SupersedeBody>,
) -> ApiResult<Response> {
    let target = ObservationId::parse(&id)?;
    let superseding = ObservationId::parse(&body.superseding_id)?;
    keepsake_engine::supersede(state.store.as_ref(), &target, &superseding, Utc::now())?;
    Ok(Json(json!({
        "target": target,
        "superseded_by": superseding,
        "status": "superseded",
    }))
    .into_response())
}

async fn get_doc(
    State(state): State<Arc<AppState>>,
    Path((agent, key)): Path<(String, String)>,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    let doc = state
        .docs
        .get(&agent, &key)?
        .ok_or_else(|| not_found("doc"))?;
    Ok(Json(doc).into_response())
}

async fn put_doc(
    State(state): State<Arc<AppState>>,
    Path((agent, key)): Path<(String, String)>,
    body: String,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    state.docs.put(&agent, &key, &body, Utc::now())?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_doc(
    State(state): State<Arc<AppState>>,
    Path((agent, key)): Path<(String, String)>,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    if !state.docs.delete(&agent, &key)? {
        return Err(not_found("doc"));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_docs(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
) -> ApiResult<Response> {
    let agent = AgentId::parse(&agent)?;
    Ok(Json(state.docs.list(&agent)?).into_response())
}
