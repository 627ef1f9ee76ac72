//! HTTP routes.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Liveness |
//! | POST | `/api/repos` | Create repository |
//! | GET | `/api/repos/{owner}/{name}` | Repository info |
//! | DELETE | `/api/repos/{owner}/{name}` | Delete repository and its data |
//! | POST | `/api/repos/{owner}/{name}/rename` | Rename repository |
//! | GET | `/api/repos/{owner}/{name}/branches` | List branches |
//! | GET | `/api/repos/{owner}/{name}/tree` | List a directory |
//! | GET | `/api/repos/{owner}/{name}/blob` | Read a file |
//! | GET | `/api/repos/{owner}/{name}/commits` | Commit history |
//! | GET | `/api/repos/{owner}/{name}/commits/{oid}/diff` | Commit diff |

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::access::{authorize_read, requester};
use crate::cache_headers::{add_cache_headers, CacheControl};
use crate::models::{
    CommitsQuery, ContentQuery, CreateRepoRequest, HealthResponse, RenameRequest,
};
use crate::services;
use crate::{AppState, WebError};

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Repository lifecycle
        .route("/api/repos", post(create_repo))
        .route("/api/repos/{owner}/{name}", get(get_repo).delete(delete_repo))
        .route("/api/repos/{owner}/{name}/rename", post(rename_repo))
        // Read services
        .route("/api/repos/{owner}/{name}/branches", get(list_branches))
        .route("/api/repos/{owner}/{name}/tree", get(read_tree))
        .route("/api/repos/{owner}/{name}/blob", get(read_blob))
        .route("/api/repos/{owner}/{name}/commits", get(list_commits))
        .route("/api/repos/{owner}/{name}/commits/{oid}/diff", get(commit_diff))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cached(body: impl IntoResponse, cache_control: CacheControl) -> Response {
    let mut response = body.into_response();
    add_cache_headers(&mut response, cache_control);
    response
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_repo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRepoRequest>,
) -> Result<impl IntoResponse, WebError> {
    let repo = format!("{}/{}", request.owner, request.name);
    let view = services::create_repository(&state, requester(&headers), request)
        .await
        .map_err(|err| err.logged(&repo, ""))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_repo(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let view = services::repository_info(&state.open(&record), &record)
        .await
        .map_err(|err| err.logged(&record.full_name(), ""))?;
    Ok(cached(Json(view), CacheControl::for_listing(record.visibility)))
}

async fn delete_repo(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, WebError> {
    services::delete_repository(&state, requester(&headers), &owner, &name)
        .await
        .map_err(|err| err.logged(&format!("{}/{}", owner, name), ""))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rename_repo(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<RenameRequest>,
) -> Result<impl IntoResponse, WebError> {
    let view = services::rename_repository(&state, requester(&headers), &owner, &name, &request.name)
        .await
        .map_err(|err| err.logged(&format!("{}/{}", owner, name), ""))?;
    Ok(Json(view))
}

async fn list_branches(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let body = services::list_branches(&state.open(&record), &record).await;
    Ok(cached(Json(body), CacheControl::for_listing(record.visibility)))
}

async fn read_tree(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<ContentQuery>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let body = services::read_tree(&state.open(&record), &record, &query)
        .await
        .map_err(|err| err.logged(&record.full_name(), query.path.as_deref().unwrap_or("")))?;
    let cache_control = match query.commit {
        Some(_) => CacheControl::for_commit_addressed(record.visibility),
        None => CacheControl::for_listing(record.visibility),
    };
    Ok(cached(Json(body), cache_control))
}

async fn read_blob(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<ContentQuery>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let body = services::read_blob(&state.open(&record), &record, &query)
        .await
        .map_err(|err| err.logged(&record.full_name(), query.path.as_deref().unwrap_or("")))?;
    let cache_control = match query.commit {
        Some(_) => CacheControl::for_commit_addressed(record.visibility),
        None => CacheControl::for_blob(record.visibility),
    };
    Ok(cached(Json(body), cache_control))
}

async fn list_commits(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<CommitsQuery>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let body = services::list_commits(&state.open(&record), &record, &query)
        .await
        .map_err(|err| err.logged(&record.full_name(), ""))?;
    Ok(cached(Json(body), CacheControl::for_listing(record.visibility)))
}

async fn commit_diff(
    State(state): State<AppState>,
    Path((owner, name, oid)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let record = authorize_read(&state.registry, &owner, &name, requester(&headers))?;
    let body = services::commit_diff(&state.open(&record), &oid)
        .await
        .map_err(|err| err.logged(&record.full_name(), ""))?;
    Ok(cached(Json(body), CacheControl::for_commit_addressed(record.visibility)))
}
