use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{current_user, origin_address, require_roles};
use super::validation;
use super::{AccountResponse, ApiError, ApiResponse, AppState, SubmitDrawRequest};
use crate::db::Role;
use crate::entities::security_events;
use crate::services::{DrawView, RoundOutcome};

/// POST /admin/master-draw — author the reference selection for the next
/// round, replacing any not-yet-played master.
pub async fn create_master_draw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<SubmitDrawRequest>,
) -> Result<Json<ApiResponse<DrawView>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::Admin], &origin).await?;

    let numbers = validation::validate_draw_numbers(&payload.numbers)?;

    let draw = state.lottery().create_master(&user, numbers).await?;

    Ok(Json(ApiResponse::success(draw)))
}

/// GET /admin/master-draw
pub async fn get_master_draw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<DrawView>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::Admin], &origin).await?;

    let draw = state
        .lottery()
        .current_master()
        .await?
        .ok_or_else(|| ApiError::NotFound("No master draw has been created".to_string()))?;

    Ok(Json(ApiResponse::success(draw)))
}

/// POST /admin/round/resolve — play the round: compare all entries against
/// the master draw and close it.
pub async fn resolve_round(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<RoundOutcome>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::Admin], &origin).await?;

    let outcome = state.lottery().resolve_round().await?;

    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::Admin], &origin).await?;

    let users = state
        .store()
        .list_users()
        .await?
        .into_iter()
        .map(AccountResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(users)))
}

#[derive(Debug, Deserialize)]
pub struct SecurityEventsQuery {
    pub limit: Option<u64>,
}

/// GET /admin/security-events — the audit log, most recent first.
pub async fn list_security_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Query(query): Query<SecurityEventsQuery>,
) -> Result<Json<ApiResponse<Vec<security_events::Model>>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::Admin], &origin).await?;

    let limit = query.limit.unwrap_or(100).min(1000);
    let events = state.store().recent_security_events(limit).await?;

    Ok(Json(ApiResponse::success(events)))
}
