use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, LotteryService, SecurityAudit};
use crate::state::SharedState;

mod admin;
mod attempts;
pub mod auth;
mod error;
mod lottery;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    auth: AuthService,

    lottery: LotteryService,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn audit(&self) -> &SecurityAudit {
        &self.shared.audit
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[must_use]
    pub fn lottery(&self) -> &LotteryService {
        &self.lottery
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    let security = shared.config.read().await.security.clone();

    let auth = AuthService::new(shared.store.clone(), security, shared.audit.clone());
    let lottery = LotteryService::new(shared.store.clone());

    Ok(Arc::new(AppState {
        shared,
        auth,
        lottery,
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_minutes,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/account", get(auth::account))
        .route("/lottery/draws", post(lottery::submit_draw))
        .route("/lottery/draws", get(lottery::list_playable))
        .route("/lottery/results", get(lottery::list_results))
        .route("/lottery/draws/played", delete(lottery::clear_played))
        .route("/admin/master-draw", post(admin::create_master_draw))
        .route("/admin/master-draw", get(admin::get_master_draw))
        .route("/admin/round/resolve", post(admin::resolve_round))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/security-events", get(admin::list_security_events))
        .route_layer(middleware::from_fn(auth::require_auth));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/reset", post(auth::reset_attempts))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
