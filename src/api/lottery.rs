use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{current_user, origin_address, require_roles};
use super::validation;
use super::{ApiError, ApiResponse, AppState, ClearPlayedResponse, SubmitDrawRequest};
use crate::db::Role;
use crate::services::DrawView;

/// POST /lottery/draws
pub async fn submit_draw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<SubmitDrawRequest>,
) -> Result<Json<ApiResponse<DrawView>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::User], &origin).await?;

    let numbers = validation::validate_draw_numbers(&payload.numbers)?;

    let draw = state.lottery().submit(&user, numbers).await?;

    Ok(Json(ApiResponse::success(draw)))
}

/// GET /lottery/draws — draws not yet entered into a round.
pub async fn list_playable(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<Vec<DrawView>>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::User], &origin).await?;

    let draws = state.lottery().playable(&user).await?;

    Ok(Json(ApiResponse::success(draws)))
}

/// GET /lottery/results — played draws. An empty list means no round has
/// been resolved for this user's entries yet.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<Vec<DrawView>>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::User], &origin).await?;

    let draws = state.lottery().results(&user).await?;

    Ok(Json(ApiResponse::success(draws)))
}

/// DELETE /lottery/draws/played — bulk, irreversible, owner-scoped.
pub async fn clear_played(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<ClearPlayedResponse>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);
    require_roles(&state, &user, &[Role::User], &origin).await?;

    let deleted = state.lottery().clear_played(&user).await?;

    Ok(Json(ApiResponse::success(ClearPlayedResponse { deleted })))
}
