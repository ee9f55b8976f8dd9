//! Axum route handlers for the Resume API.
//!
//! Each handler checks out its own pooled connection and hands it to a
//! [`ResumeStore`] for exactly one store call. The connection is returned to
//! the pool when it drops, on the error path as well.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::resume::{CreateResumeRequest, Resume, ResumePatch};
use crate::resumes::store::ResumeStore;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

/// GET /resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Resume>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let rows = ResumeStore::new(&mut conn).list().await?;
    Ok(Json(rows.into_iter().map(Resume::from).collect()))
}

/// GET /resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resume>, AppError> {
    let mut conn = state.db.acquire().await?;
    let row = ResumeStore::new(&mut conn).get(&id).await?;
    Ok(Json(row.into()))
}

/// POST /resumes
///
/// Missing or empty fields take their defaults; a missing id is generated
/// from the current time. Non-string ids and names are stored as text.
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(request): Json<CreateResumeRequest>,
) -> Result<Json<Resume>, AppError> {
    let new = request.into_new_resume(Utc::now());

    let mut conn = state.db.acquire().await?;
    let row = ResumeStore::new(&mut conn).create(new).await?;
    Ok(Json(row.into()))
}

/// PUT /resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ResumePatch>,
) -> Result<Json<Resume>, AppError> {
    let mut conn = state.db.acquire().await?;
    let row = ResumeStore::new(&mut conn).update(&id, patch).await?;
    Ok(Json(row.into()))
}

/// DELETE /resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let mut conn = state.db.acquire().await?;
    ResumeStore::new(&mut conn).delete(&id).await?;
    Ok(Json(DeleteResponse { ok: true }))
}
