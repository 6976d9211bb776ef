//! Security audit log.
//!
//! Every security-relevant event becomes a structured row in the
//! `security_events` table and a mirrored `tracing` line. The service is
//! injected through application state; nothing here is process-global.
//! Secrets (passwords, TOTP seeds or codes, draw numbers, keys) must never
//! reach this module.

use tracing::{error, warn};

use crate::db::{Store, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityAction {
    Registration,
    Login,
    InvalidLogin,
    BlockedLogin,
    InvalidAccess,
    Logout,
}

impl SecurityAction {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Registration => "user registration",
            Self::Login => "log in",
            Self::InvalidLogin => "invalid login attempt",
            Self::BlockedLogin => "blocked login attempt",
            Self::InvalidAccess => "invalid access attempt",
            Self::Logout => "log out",
        }
    }
}

#[derive(Clone)]
pub struct SecurityAudit {
    store: Store,
}

impl SecurityAudit {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record an event attributed to a known user.
    pub async fn record_user(&self, action: SecurityAction, user: &User, origin: &str) {
        self.record(
            action,
            Some(user.id),
            Some(user.email.as_str()),
            Some(user.role.as_str()),
            origin,
        )
        .await;
    }

    /// Record an event where only a claimed email is known (failed logins).
    pub async fn record_email(&self, action: SecurityAction, email: &str, origin: &str) {
        self.record(action, None, Some(email), None, origin).await;
    }

    /// Record an event with no actor at all (blocked attempts never reach
    /// credential lookup).
    pub async fn record_anonymous(&self, action: SecurityAction, origin: &str) {
        self.record(action, None, None, None, origin).await;
    }

    async fn record(
        &self,
        action: SecurityAction,
        actor_id: Option<i32>,
        actor_email: Option<&str>,
        role: Option<&str>,
        origin: &str,
    ) {
        warn!(
            category = "SECURITY",
            actor_id,
            actor_email,
            role,
            origin,
            "{}",
            action.message()
        );

        // A failed audit insert must not fail the guarded operation.
        if let Err(e) = self
            .store
            .add_security_event(action.message(), actor_id, actor_email, role, origin)
            .await
        {
            error!("Failed to persist security event: {e}");
        }
    }
}
