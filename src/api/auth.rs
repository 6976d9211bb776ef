use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::attempts::FailedAttempts;
use super::validation;
use super::{
    ApiError, ApiResponse, AppState, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, RegisterResponse,
};
use crate::db::{Role, User};
use crate::services::{Registration, SecurityAction};

const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware for the protected routes: a request without a
/// logged-in session is refused before it reaches any handler. Role checks
/// are a separate, later concern ([`require_roles`]).
pub async fn require_auth(session: Session, request: Request, next: Next) -> impl IntoResponse {
    match session.get::<i32>(SESSION_USER_KEY).await {
        Ok(Some(_)) => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error("Not authenticated")),
        )
            .into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Best-effort client address for audit records. Proxy-forwarded headers
/// first, "unknown" when nothing is available.
#[must_use]
pub fn origin_address(headers: &HeaderMap) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(header)
            && let Ok(value) = value.to_str()
            && let Some(first) = value.split(',').next()
            && !first.trim().is_empty()
        {
            return first.trim().to_string();
        }
    }

    "unknown".to_string()
}

/// Load the authenticated user for this request. The identity is passed
/// explicitly to everything downstream; no handler reads ambient state.
pub async fn current_user(state: &AppState, session: &Session) -> Result<User, ApiError> {
    let user_id = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::AuthenticationError("Not authenticated".to_string()))?;

    state
        .store()
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::AuthenticationError("Not authenticated".to_string()))
}

/// Role gate. A mismatch is recorded as a security event with the actor's
/// identity and origin before the 403 is returned.
pub async fn require_roles(
    state: &AppState,
    user: &User,
    allowed: &[Role],
    origin: &str,
) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    state
        .audit()
        .record_user(SecurityAction::InvalidAccess, user, origin)
        .await;

    Err(ApiError::forbidden(
        "You do not have access to this resource",
    ))
}

const fn post_login_destination(role: Role) -> &'static str {
    match role {
        Role::User => "/lottery",
        Role::Admin => "/admin",
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?.to_string();
    validation::validate_name("firstname", &payload.firstname)?;
    validation::validate_name("lastname", &payload.lastname)?;
    validation::validate_phone(&payload.phone)?;
    validation::validate_password(&payload.password)?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::validation("Both password fields must be equal"));
    }

    let origin = origin_address(&headers);

    let registered = state
        .auth()
        .register(
            Registration {
                email,
                firstname: payload.firstname,
                lastname: payload.lastname,
                phone: payload.phone,
                password: payload.password,
            },
            &origin,
        )
        .await?;

    Ok(Json(ApiResponse::success(RegisterResponse {
        email: registered.user.email,
        totp_seed: registered.totp_seed,
    })))
}

/// POST /auth/login
///
/// The login state machine: LOCK_CHECK -> CREDENTIAL_LOOKUP -> VERIFY ->
/// SUCCESS | FAIL. A locked session is refused here, before any credential
/// is examined; the service handles lookup and verification.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() || payload.totp_code.is_empty() {
        return Err(ApiError::validation(
            "Email, password and verification code are required",
        ));
    }

    let origin = origin_address(&headers);
    let max_attempts = state.config().read().await.security.max_login_attempts;
    let attempts = FailedAttempts::new(&session);

    // LOCK_CHECK: refused without touching credentials
    if attempts.is_locked(max_attempts).await? {
        state
            .audit()
            .record_email(SecurityAction::BlockedLogin, &payload.email, &origin)
            .await;
        return Err(locked_out());
    }

    match state
        .auth()
        .verify_login(&payload.email, &payload.password, &payload.totp_code, &origin)
        .await
    {
        Ok(user) => {
            attempts.reset().await?;

            // fresh session id for the authenticated session
            session
                .cycle_id()
                .await
                .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
            session
                .insert(SESSION_USER_KEY, user.id)
                .await
                .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

            Ok(Json(ApiResponse::success(LoginResponse {
                email: user.email.clone(),
                role: user.role.as_str().to_string(),
                redirect_to: post_login_destination(user.role).to_string(),
            })))
        }
        Err(crate::services::AuthError::InvalidCredentials) => {
            let count = attempts.record_failure().await?;

            if count >= max_attempts {
                Err(locked_out())
            } else {
                let remaining = max_attempts - count;
                Err(ApiError::AuthenticationError(format!(
                    "Please check your login details and try again, \
                     {remaining} login attempts remaining"
                )))
            }
        }
        Err(other) => Err(other.into()),
    }
}

fn locked_out() -> ApiError {
    ApiError::LockoutError(
        "Number of incorrect login attempts exceeded. \
         Use POST /api/auth/reset to reset and try again"
            .to_string(),
    )
}

/// POST /auth/reset — the explicit attempt-counter reset action.
pub async fn reset_attempts(
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    FailedAttempts::new(&session).reset().await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Login attempts reset".to_string(),
    })))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);

    require_roles(&state, &user, &[Role::User, Role::Admin], &origin).await?;

    state
        .audit()
        .record_user(SecurityAction::Logout, &user, &origin)
        .await;

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /auth/account
pub async fn account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<super::AccountResponse>>, ApiError> {
    let user = current_user(&state, &session).await?;
    let origin = origin_address(&headers);

    require_roles(&state, &user, &[Role::User, Role::Admin], &origin).await?;

    Ok(Json(ApiResponse::success(user.into())))
}
