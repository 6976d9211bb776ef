//! Domain service for registration and credential verification.
//!
//! The login state machine's LOCK_CHECK lives with the session layer in the
//! API; everything from CREDENTIAL_LOOKUP onwards happens here. Unknown
//! email, wrong password and wrong TOTP code all collapse into
//! [`AuthError::InvalidCredentials`] so responses cannot be used to probe
//! which accounts exist.

use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;
use crate::crypto::{self, CryptoError};
use crate::db::{NewUser, Role, Store, User};
use crate::services::audit::{SecurityAction, SecurityAudit};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address already exists")]
    EmailTaken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<CryptoError> for AuthError {
    fn from(err: CryptoError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Validated registration input (shape checks happen at the API boundary).
pub struct Registration {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub password: String,
}

/// Registration result. `totp_seed` is handed back exactly once so the user
/// can enrol an authenticator; it is never retrievable afterwards.
pub struct RegisteredUser {
    pub user: User,
    pub totp_seed: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Store,
    security: SecurityConfig,
    audit: SecurityAudit,
}

impl AuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig, audit: SecurityAudit) -> Self {
        Self {
            store,
            security,
            audit,
        }
    }

    /// Create a new account with role `user`. The password hash, TOTP seed
    /// and draw key are generated here, once; seed and key never change for
    /// the lifetime of the account.
    pub async fn register(
        &self,
        registration: Registration,
        origin: &str,
    ) -> Result<RegisteredUser, AuthError> {
        if self.store.email_exists(&registration.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let security = self.security.clone();
        let password = registration.password;
        let password_hash = task::spawn_blocking(move || crypto::hash_password(&password, &security))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task panicked: {e}")))??;

        let totp_seed = crypto::generate_totp_seed();
        let draw_key = crypto::generate_draw_key();

        let user = self
            .store
            .create_user(NewUser {
                email: registration.email,
                firstname: registration.firstname,
                lastname: registration.lastname,
                phone: registration.phone,
                password_hash,
                role: Role::User,
                totp_seed: totp_seed.clone(),
                draw_key: draw_key.to_vec(),
            })
            .await?;

        self.audit
            .record_user(SecurityAction::Registration, &user, origin)
            .await;

        Ok(RegisteredUser { user, totp_seed })
    }

    /// CREDENTIAL_LOOKUP and VERIFY. On success the login timestamps are
    /// shifted (last <- current, current <- now) and the event is audited;
    /// on failure the attempt is audited with the claimed email and origin,
    /// never the password.
    pub async fn verify_login(
        &self,
        email: &str,
        password: &str,
        totp_code: &str,
        origin: &str,
    ) -> Result<User, AuthError> {
        let Some(parts) = self.store.get_auth_parts(email).await? else {
            self.audit
                .record_email(SecurityAction::InvalidLogin, email, origin)
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = self
            .store
            .user_repo()
            .verify_password(parts.password_hash, password.to_string())
            .await?;

        let totp_ok = password_ok && crypto::verify_totp(&parts.totp_seed, totp_code)?;

        if !(password_ok && totp_ok) {
            self.audit
                .record_email(SecurityAction::InvalidLogin, email, origin)
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.store.record_login(parts.user.id).await?;

        self.audit
            .record_user(SecurityAction::Login, &user, origin)
            .await;

        Ok(user)
    }
}
